//! # Marker Input
//!
//! Marker stream subscription module.
//!
//! Responsibilities:
//! - Hold one subscription per accepted marker-input document
//! - Drain buffered marker samples from connected subscriptions
//! - Provide an in-memory marker hub, a mock marker source and a UDP
//!   receiver feeding the hub
//!
//! ## Usage Example
//!
//! ```
//! use contracts::{MarkerInputSpec, MarkerSample};
//! use marker_input::{MarkerInputRegistry, MemoryMarkerHub};
//!
//! let hub = MemoryMarkerHub::new();
//! let mut registry = MarkerInputRegistry::new();
//! registry.subscribe(
//!     MarkerInputSpec { name: "Markers".into(), source_id: None },
//!     Box::new(hub.subscribe("Markers", None)),
//! );
//!
//! let outlet = hub.open_outlet("Markers", "stim-pc");
//! outlet.push(MarkerSample::new(12.5, 0.0, vec!["start".into()]));
//!
//! let drained = registry.drain();
//! assert_eq!(drained.len(), 1);
//! assert_eq!(registry.marker_stream_info()[0].rx_count, 1);
//! ```

mod error;
mod memory;
mod metrics;
mod mock;
mod registry;
mod udp;

// Re-exports
pub use contracts::{MarkerInlet, MarkerSample, MarkerStreamSummary};
pub use error::{MarkerInputError, Result};
pub use memory::{MarkerOutlet, MemoryInlet, MemoryMarkerHub};
pub use metrics::{MarkerMetrics, MetricsSnapshot};
pub use mock::{MockMarkerConfig, MockMarkerSource};
pub use registry::{DrainedMarker, MarkerInputRegistry, MarkerStreamInfo};
pub use udp::{MarkerDatagram, UdpMarkerReceiver};
