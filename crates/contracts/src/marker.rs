//! MarkerSample - marker inlet output
//!
//! One event received from an external marker stream.

use serde::{Deserialize, Serialize};

/// Marker sample
///
/// Marker streams carry string channels; most publishers send a single
/// channel holding the event label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSample {
    /// Timestamp in the publisher's clock domain (seconds)
    pub timestamp: f64,

    /// Offset from the publisher's clock into the local clock (seconds)
    #[serde(default)]
    pub time_correction: f64,

    /// Sample channels, in publisher order
    pub channels: Vec<String>,
}

impl MarkerSample {
    pub fn new(timestamp: f64, time_correction: f64, channels: Vec<String>) -> Self {
        Self {
            timestamp,
            time_correction,
            channels,
        }
    }

    /// Timestamp mapped into the local clock domain
    #[inline]
    pub fn corrected_timestamp(&self) -> f64 {
        self.timestamp + self.time_correction
    }
}

/// Accepted marker-input document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerInputSpec {
    /// Marker stream name, never empty
    pub name: String,

    /// Publisher source id; `None` binds by name only
    pub source_id: Option<String>,
}

/// Snapshot of one marker subscription (for diagnostics)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerStreamSummary {
    pub name: String,
    pub source_id: Option<String>,
    pub rx_count: u64,
    pub connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrected_timestamp() {
        let sample = MarkerSample::new(100.25, -0.5, vec!["stim".into()]);
        assert_eq!(sample.corrected_timestamp(), 99.75);
    }

    #[test]
    fn test_time_correction_defaults_to_zero() {
        let sample: MarkerSample =
            serde_json::from_str(r#"{"timestamp": 4.0, "channels": ["a", "b"]}"#).unwrap();
        assert_eq!(sample.time_correction, 0.0);
        assert_eq!(sample.channels.len(), 2);
    }
}
