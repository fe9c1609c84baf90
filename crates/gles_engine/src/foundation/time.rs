//! Frame clocks and timing utilities
//!
//! The update pass is driven by a [`Clock`] that reports the milliseconds elapsed
//! since the previous frame. [`SystemClock`] reads the monotonic system timer;
//! [`FixedStepClock`] returns a constant step for deterministic simulation and tests.

use std::time::{Duration, Instant};

/// Source of per-frame elapsed time
pub trait Clock: Send {
    /// Milliseconds since the previous call (zero on the first call)
    fn elapsed_ms(&mut self) -> u64;
}

/// Monotonic wall clock
pub struct SystemClock {
    last_frame: Option<Instant>,
    total_ms: u64,
    frame_count: u64,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Create a clock; the first reading is zero
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_frame: None,
            total_ms: 0,
            frame_count: 0,
        }
    }

    /// Total milliseconds reported so far
    #[must_use]
    pub const fn total_ms(&self) -> u64 {
        self.total_ms
    }

    /// Number of readings taken
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Clock for SystemClock {
    fn elapsed_ms(&mut self) -> u64 {
        let now = Instant::now();
        let elapsed = self
            .last_frame
            .map_or(0, |last| u64::try_from(now.duration_since(last).as_millis()).unwrap_or(u64::MAX));
        self.last_frame = Some(now);
        self.total_ms = self.total_ms.saturating_add(elapsed);
        self.frame_count += 1;
        elapsed
    }
}

/// Clock that advances by the same step every frame
#[derive(Debug, Clone, Copy)]
pub struct FixedStepClock {
    step_ms: u64,
}

impl FixedStepClock {
    /// Create a clock reporting `step_ms` per frame
    #[must_use]
    pub const fn new(step_ms: u64) -> Self {
        Self { step_ms }
    }
}

impl Clock for FixedStepClock {
    fn elapsed_ms(&mut self) -> u64 {
        self.step_ms
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    #[must_use]
    pub const fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    #[must_use]
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Reset the stopwatch to zero
    pub fn reset(&mut self) {
        self.start_time = None;
        self.elapsed = Duration::ZERO;
    }

    /// Get the elapsed time
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed + self.start_time.map_or(Duration::ZERO, |start| start.elapsed())
    }

    /// Check if the stopwatch is currently running
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.start_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_first_reading_is_zero() {
        let mut clock = SystemClock::new();
        assert_eq!(clock.elapsed_ms(), 0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.elapsed_ms() >= 5);
        assert_eq!(clock.frame_count(), 2);
        assert!(clock.total_ms() >= 5);
    }

    #[test]
    fn test_fixed_step_clock() {
        let mut clock = FixedStepClock::new(16);
        assert_eq!(clock.elapsed_ms(), 16);
        assert_eq!(clock.elapsed_ms(), 16);
    }

    #[test]
    fn test_stopwatch_accumulates() {
        let mut stopwatch = Stopwatch::start_new();
        assert!(stopwatch.is_running());
        std::thread::sleep(Duration::from_millis(2));
        stopwatch.stop();
        let first = stopwatch.elapsed();
        assert!(first >= Duration::from_millis(2));
        assert!(!stopwatch.is_running());
        stopwatch.reset();
        assert_eq!(stopwatch.elapsed(), Duration::ZERO);
    }
}
