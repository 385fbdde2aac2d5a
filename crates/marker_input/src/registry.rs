//! MarkerInputRegistry - ordered list of marker subscriptions

use std::sync::Arc;

use contracts::{MarkerInlet, MarkerInputSpec, MarkerSample, MarkerStreamSummary, SourceId};
use tracing::{debug, info, instrument, trace};

use crate::metrics::MarkerMetrics;

/// One accepted marker-input subscription
pub struct MarkerStreamInfo {
    /// Marker stream name, never empty
    pub name: String,
    /// Publisher source id the subscription is pinned to
    pub source_id: Option<SourceId>,
    /// Receiving end
    pub receiver: Box<dyn MarkerInlet>,
    /// Samples drained over the subscription's lifetime
    pub rx_count: u64,
}

impl MarkerStreamInfo {
    fn summary(&self) -> MarkerStreamSummary {
        MarkerStreamSummary {
            name: self.name.clone(),
            source_id: self.source_id.as_ref().map(|id| id.to_string()),
            rx_count: self.rx_count,
            connected: self.receiver.is_connected(),
        }
    }
}

/// A sample taken from one subscription during a drain
#[derive(Debug, Clone, PartialEq)]
pub struct DrainedMarker {
    pub stream: String,
    pub sample: MarkerSample,
}

/// Marker Input Registry
///
/// Append-only; the same stream may be subscribed more than once.
#[derive(Default)]
pub struct MarkerInputRegistry {
    streams: Vec<MarkerStreamInfo>,
    metrics: Arc<MarkerMetrics>,
}

impl MarkerInputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subscription for an accepted marker-input document
    pub fn subscribe(&mut self, spec: MarkerInputSpec, receiver: Box<dyn MarkerInlet>) {
        info!(
            stream = %spec.name,
            source_id = ?spec.source_id,
            index = self.streams.len(),
            "marker input registered"
        );
        self.streams.push(MarkerStreamInfo {
            name: spec.name,
            source_id: spec.source_id.map(SourceId::from),
            receiver,
            rx_count: 0,
        });
    }

    /// Number of subscriptions
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Snapshot of every subscription, in registration order
    pub fn marker_stream_info(&self) -> Vec<MarkerStreamSummary> {
        self.streams.iter().map(MarkerStreamInfo::summary).collect()
    }

    /// Drain every connected subscription in registration order
    ///
    /// Disconnected subscriptions are skipped without draining, so their
    /// buffered samples stay queued.
    #[instrument(name = "marker_drain", skip(self), fields(streams = self.streams.len()))]
    pub fn drain(&mut self) -> Vec<DrainedMarker> {
        let mut drained = Vec::new();
        for stream in &mut self.streams {
            if !stream.receiver.is_connected() {
                trace!(stream = %stream.name, "skipping disconnected marker stream");
                self.metrics.record_skipped();
                continue;
            }
            let samples = stream.receiver.flush();
            if samples.is_empty() {
                continue;
            }
            let n = samples.len() as u64;
            stream.rx_count += n;
            self.metrics.record_received(n);
            debug!(stream = %stream.name, samples = n, rx_count = stream.rx_count, "markers drained");
            drained.extend(samples.into_iter().map(|sample| DrainedMarker {
                stream: stream.name.clone(),
                sample,
            }));
        }
        drained
    }

    /// Tear down every subscription
    pub fn clear(&mut self) {
        let n = self.streams.len();
        self.streams.clear();
        info!(cleared = n, "marker inputs cleared");
    }

    pub fn metrics(&self) -> &Arc<MarkerMetrics> {
        &self.metrics
    }
}
