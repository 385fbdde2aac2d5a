//! Run statistics.

use std::time::Duration;

use observability::BridgeMetricsAggregator;

/// Statistics from a bridge run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Driver ticks executed
    pub ticks: u64,

    /// Marker samples drained
    pub markers: u64,

    /// Packets emitted
    pub packets: u64,

    /// Packets the sink refused
    pub sink_errors: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Marker subscriptions registered
    pub marker_streams: usize,

    /// Output sources registered
    pub output_sources: usize,

    /// Per-tick aggregation
    pub metrics: BridgeMetricsAggregator,
}

impl RunStats {
    /// Packets per second
    pub fn packet_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.packets as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Bridge Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {}", self.ticks);
        println!("   ├─ Marker samples: {}", self.markers);
        println!("   ├─ Packets emitted: {}", self.packets);
        println!("   ├─ Packets/s: {:.2}", self.packet_rate());
        println!("   ├─ Sink errors: {}", self.sink_errors);
        println!("   ├─ Marker streams: {}", self.marker_streams);
        println!("   └─ Output sources: {}", self.output_sources);

        println!("\n{}", self.metrics.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_rate() {
        let stats = RunStats {
            packets: 300,
            duration: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(stats.packet_rate(), 150.0);
        assert_eq!(RunStats::default().packet_rate(), 0.0);
    }
}
