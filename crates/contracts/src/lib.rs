//! # Contracts
//!
//! Frozen interface contracts shared by every bridge crate: data model,
//! error taxonomy and the transport seams.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Marker samples carry the publisher's clock (seconds, f64) plus a
//!   transport-estimated correction into the local clock domain
//! - The bridge's own clock is abstracted by [`Clock`] so ticks are testable

mod bridge_config;
mod clock;
mod error;
mod marker;
mod source_id;
mod stream;
mod tick;
mod transport;

pub use bridge_config::*;
pub use clock::{Clock, ManualClock};
pub use error::*;
pub use marker::*;
pub use source_id::SourceId;
pub use stream::*;
pub use tick::TickSummary;
pub use transport::{MarkerInlet, StreamPublisher, StreamTransport};
