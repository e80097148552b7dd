use std::time::Instant;

use crate::input::FrameInput;

/// Everything one frame needs from the outside world, assembled at the frame
/// boundary and passed down explicitly - no global mutable state.
#[derive(Debug, Clone)]
pub struct FrameContext {
    pub number: u64,
    pub time: f32,
    pub delta: f32,
    pub input: FrameInput,
}

/// Produces a `FrameContext` per loop iteration and tracks wall-clock time
pub struct FrameClock {
    frame_number: u64,
    start: Instant,
    last: Instant,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            frame_number: 0,
            start: now,
            last: now,
        }
    }

    pub fn tick(&mut self, input: FrameInput) -> FrameContext {
        let now = Instant::now();
        let context = FrameContext {
            number: self.frame_number,
            time: now.duration_since(self.start).as_secs_f32(),
            delta: now.duration_since(self.last).as_secs_f32(),
            input,
        };
        self.frame_number += 1;
        self.last = now;
        context
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates timings and prints an average every fixed interval, matching
/// the reference ms/frame and ms/draw reporting cadence.
pub struct IntervalStats {
    label: &'static str,
    interval: f32,
    accumulated: f32,
    samples: u32,
}

impl IntervalStats {
    pub fn new(label: &'static str, interval: f32) -> Self {
        Self {
            label,
            interval,
            accumulated: 0.0,
            samples: 0,
        }
    }

    /// Records one sample in seconds; returns the average in milliseconds
    /// when an interval elapses.
    pub fn add(&mut self, seconds: f32) -> Option<f32> {
        self.accumulated += seconds;
        self.samples += 1;

        if self.accumulated >= self.interval {
            let average_ms = self.accumulated * 1000.0 / self.samples as f32;
            self.accumulated = 0.0;
            self.samples = 0;
            Some(average_ms)
        } else {
            None
        }
    }

    pub fn report(&mut self, seconds: f32) {
        if let Some(average_ms) = self.add(seconds) {
            println!("{:.6} {}", average_ms, self.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_numbers_are_sequential() {
        let mut clock = FrameClock::new();
        let a = clock.tick(FrameInput::default());
        let b = clock.tick(FrameInput::default());
        assert_eq!(a.number, 0);
        assert_eq!(b.number, 1);
        assert!(b.time >= a.time);
    }

    #[test]
    fn interval_stats_average_over_samples() {
        let mut stats = IntervalStats::new("ms/frame", 1.0);
        assert_eq!(stats.add(0.25), None);
        assert_eq!(stats.add(0.25), None);
        let average = stats.add(0.5).unwrap();
        // 1.0s over 3 frames
        assert!((average - 1000.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn interval_stats_reset_after_reporting() {
        let mut stats = IntervalStats::new("ms/frame", 0.1);
        assert!(stats.add(0.2).is_some());
        assert_eq!(stats.add(0.05), None);
    }
}
