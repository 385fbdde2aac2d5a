//! SystemClock - monotonic local clock plus local wall-clock strings

use std::time::Instant;

use chrono::Local;
use contracts::Clock;

/// Clock backed by [`Instant`] and the local time zone
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn local_clock(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn elapsed_millis(&self) -> u32 {
        // Wraps after ~49 days, like the device's millisecond counter
        self.start.elapsed().as_millis() as u32
    }

    fn wall_clock_string(&self, format: &str) -> String {
        Local::now().format(format).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packet_codec::TIMESTAMP_STRING_FORMAT;

    #[test]
    fn test_local_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.local_clock();
        let b = clock.local_clock();
        assert!(b >= a);
    }

    #[test]
    fn test_wall_clock_format() {
        let text = SystemClock::new().wall_clock_string(TIMESTAMP_STRING_FORMAT);
        // 2024-05-01_13-45-09-123456
        assert_eq!(text.len(), 26);
        assert_eq!(&text[10..11], "_");
        assert!(text[20..].chars().all(|c| c.is_ascii_digit()));
    }
}
