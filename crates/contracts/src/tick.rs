//! TickSummary - Bridge Driver per-tick report

use serde::Serialize;

/// What one driver tick produced
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickSummary {
    /// Marker samples drained across all subscriptions
    pub markers_drained: usize,

    /// Packets emitted (three per marker sample)
    pub packets_emitted: usize,

    /// Packet number of the last emitted packet
    pub last_packet_number: Option<u16>,

    /// Subscriptions that were connected during the tick
    pub connected_streams: usize,

    /// Subscriptions registered during the tick
    pub total_streams: usize,

    /// Wall time spent in the tick (milliseconds)
    pub duration_ms: f64,
}
