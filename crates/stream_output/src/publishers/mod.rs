//! Publisher implementations
//!
//! Contains MemoryPublisher, LogPublisher and UdpPublisher.

mod log;
mod memory;
mod udp;

pub use self::log::LogPublisher;
pub use self::memory::{MemoryPublisher, PublishedSample};
pub use self::udp::UdpPublisher;
