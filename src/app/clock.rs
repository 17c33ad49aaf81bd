// src/app/clock.rs
//! Fixed-rate frame pacing.

use std::thread;
use std::time::{Duration, Instant};

/// Wake-up is scheduled this much before the frame deadline to absorb
/// scheduler latency.
const WAKE_AHEAD: Duration = Duration::from_micros(100);

/// Sleeps until the end of the current frame period.
///
/// Call [`FrameClock::begin`] at the top of a frame and [`FrameClock::wait`]
/// once the frame is drawn. A frame that overruns its period does not sleep.
#[derive(Debug, Clone)]
pub struct FrameClock {
    period: Duration,
    frame_start: Instant,
}

impl FrameClock {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            frame_start: Instant::now(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
    }

    /// Mark the start of a frame.
    pub fn begin(&mut self) {
        self.frame_start = Instant::now();
    }

    /// Time left until the frame's wake-up point.
    pub fn remaining(&self) -> Duration {
        let deadline = self.frame_start + self.period.saturating_sub(WAKE_AHEAD);
        deadline.saturating_duration_since(Instant::now())
    }

    /// Sleep until the wake-up point and return how long we slept.
    pub fn wait(&self) -> Duration {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            thread::sleep(remaining);
        }
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_reaches_frame_end() {
        let period = Duration::from_millis(20);
        let mut clock = FrameClock::new(period);
        clock.begin();
        let start = Instant::now();
        clock.wait();
        assert!(start.elapsed() >= period - WAKE_AHEAD - Duration::from_millis(1));
    }

    #[test]
    fn test_overrun_frame_does_not_sleep() {
        let mut clock = FrameClock::new(Duration::from_millis(1));
        clock.begin();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.wait(), Duration::ZERO);
    }

    #[test]
    fn test_period_shorter_than_wake_ahead() {
        let mut clock = FrameClock::new(Duration::from_micros(50));
        clock.begin();
        assert_eq!(clock.remaining(), Duration::ZERO);
    }
}
