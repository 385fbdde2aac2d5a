//! Transport seams
//!
//! The bridge never talks to the streaming network directly. Inbound marker
//! subscriptions and outbound stream publishing both go through these
//! traits, so the same bridge runs against the in-memory transport in tests
//! and against a network transport in production.

use crate::{ContractError, MarkerSample, OutputChannelKey, StreamInfo};

/// Subscription to one external marker stream
///
/// # Example
///
/// ```ignore
/// let mut inlet = transport.subscribe_markers("PsychoPyMarkers", None);
/// if inlet.is_connected() {
///     for sample in inlet.flush() {
///         println!("{:?} @ {}", sample.channels, sample.timestamp);
///     }
/// }
/// ```
pub trait MarkerInlet: Send {
    /// Stream name this inlet is bound to
    fn name(&self) -> &str;

    /// Publisher source id, when the subscription is pinned to one
    fn source_id(&self) -> Option<&str>;

    /// Whether a matching publisher is currently connected
    fn is_connected(&self) -> bool;

    /// Take every buffered sample, in arrival order
    ///
    /// Returns an empty vector when nothing arrived since the last call.
    fn flush(&mut self) -> Vec<MarkerSample>;
}

/// Publishing handle for output streams
pub trait StreamPublisher: Send {
    /// Create an output stream
    ///
    /// # Errors
    /// Returns an open error when the transport cannot create the stream
    fn add_stream(&mut self, info: &StreamInfo) -> Result<(), ContractError>;

    /// Tear down an output stream, returns whether it existed
    fn remove_stream(&mut self, key: &OutputChannelKey) -> bool;

    /// Push one sample (one value per entry of `values`) to a stream
    ///
    /// # Errors
    /// Returns an error when the stream does not exist or the send fails
    fn push_sample(
        &mut self,
        key: &OutputChannelKey,
        channel_type: &str,
        values: &[f32],
    ) -> Result<(), ContractError>;

    /// Number of live streams
    fn stream_count(&self) -> usize;
}

/// Factory for subscriptions and publishing handles
pub trait StreamTransport: Send + Sync {
    /// Open a marker subscription bound to `name`, and to `source_id` when given
    fn subscribe_markers(&self, name: &str, source_id: Option<&str>) -> Box<dyn MarkerInlet>;

    /// Create a fresh publishing handle with no streams
    fn create_publisher(&self) -> Box<dyn StreamPublisher>;
}
