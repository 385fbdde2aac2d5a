//! Clock - the bridge's local time source

use std::sync::atomic::{AtomicU64, Ordering};

/// Local clock used when correlating marker timestamps
pub trait Clock: Send + Sync {
    /// Monotonic local clock, seconds
    fn local_clock(&self) -> f64;

    /// Milliseconds since the bridge started (packet header timestamp)
    fn elapsed_millis(&self) -> u32;

    /// Wall-clock time rendered in the given strftime format
    fn wall_clock_string(&self, format: &str) -> String;
}

/// Clock driven by hand, for tests and replays
///
/// Each call to [`Clock::local_clock`] returns the current value and then
/// advances it by `step`, so consecutive reads are distinguishable.
#[derive(Debug)]
pub struct ManualClock {
    now_bits: AtomicU64,
    step: f64,
    wall_clock: String,
}

impl ManualClock {
    pub fn new(start: f64, step: f64) -> Self {
        Self {
            now_bits: AtomicU64::new(start.to_bits()),
            step,
            wall_clock: "2024-01-01_00-00-00-000000".to_string(),
        }
    }

    /// Fixed wall-clock string returned regardless of format
    pub fn with_wall_clock(mut self, wall_clock: impl Into<String>) -> Self {
        self.wall_clock = wall_clock.into();
        self
    }

    /// Current value without advancing
    pub fn peek(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn local_clock(&self) -> f64 {
        let step = self.step;
        let prev = self
            .now_bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some((f64::from_bits(bits) + step).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f64::from_bits(prev)
    }

    fn elapsed_millis(&self) -> u32 {
        (self.peek() * 1000.0) as u32
    }

    fn wall_clock_string(&self, _format: &str) -> String {
        self.wall_clock.clone()
    }
}
