//! Frame timing for the cooperative host loop.
//!
//! The host runs everything on one thread, one frame per tick. `FrameClock`
//! measures the wall-clock delta between frames and feeds it to effect
//! timers and spawn timers. A long stall (debugger pause, window drag, a slow
//! disk) is capped to `max_frame_dt` so timers never jump by minutes at once.
//!
//! `Clock` abstracts "now" so that budget checks in the scanner can run
//! against a `ManualClock` in tests instead of real sleeps.

use std::cell::Cell;
use std::time::{Duration, Instant};

const FRAME_SAMPLE_COUNT: usize = 60;

/// Source of monotonic time.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock for tests.
///
/// `advance` moves time explicitly. `set_auto_advance` makes every `now()`
/// read move time forward by a fixed step, which models work that takes time
/// without sleeping the test thread.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
    auto_advance: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
            auto_advance: Cell::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set_auto_advance(&self, step: Duration) {
        self.auto_advance.set(step);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let current = self.now.get();
        self.now.set(current + self.auto_advance.get());
        current
    }
}

pub struct FrameClock {
    /// Upper bound for a single frame delta, in seconds.
    pub max_frame_dt: f64,
    pub frame_count: u64,
    pub total_time: f64,
    /// Delta of the current frame in seconds (already capped).
    pub dt: f64,
    last_instant: Option<Instant>,

    dt_samples: [f64; FRAME_SAMPLE_COUNT],
    dt_sample_index: usize,
    pub smoothed_frame_time_ms: f64,
}

impl FrameClock {
    pub fn new(max_frame_dt: f64) -> Self {
        Self {
            max_frame_dt,
            frame_count: 0,
            total_time: 0.0,
            dt: 0.0,
            last_instant: None,
            dt_samples: [0.0; FRAME_SAMPLE_COUNT],
            dt_sample_index: 0,
            smoothed_frame_time_ms: 0.0,
        }
    }

    /// Start a new frame and return its delta in seconds. The very first
    /// frame has a zero delta.
    pub fn begin_frame(&mut self, clock: &impl Clock) -> f64 {
        let now = clock.now();
        let mut dt = match self.last_instant {
            Some(last) => now.saturating_duration_since(last).as_secs_f64(),
            None => 0.0,
        };
        self.last_instant = Some(now);

        if dt > self.max_frame_dt {
            log::warn!(
                "Frame took {:.1}ms, capping delta to {:.1}ms",
                dt * 1000.0,
                self.max_frame_dt * 1000.0
            );
            dt = self.max_frame_dt;
        }

        self.dt = dt;
        self.total_time += dt;
        self.frame_count += 1;

        self.dt_samples[self.dt_sample_index] = dt;
        self.dt_sample_index = (self.dt_sample_index + 1) % FRAME_SAMPLE_COUNT;
        let sampled = (self.frame_count as usize).min(FRAME_SAMPLE_COUNT);
        let avg_dt: f64 = self.dt_samples.iter().sum::<f64>() / sampled as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;

        dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(0.25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_has_zero_delta() {
        let clock = ManualClock::new();
        let mut frames = FrameClock::new(0.25);
        assert_eq!(frames.begin_frame(&clock), 0.0);
        assert_eq!(frames.frame_count, 1);
    }

    #[test]
    fn delta_tracks_clock_advance() {
        let clock = ManualClock::new();
        let mut frames = FrameClock::new(0.25);
        frames.begin_frame(&clock);
        clock.advance(Duration::from_millis(16));
        let dt = frames.begin_frame(&clock);
        assert!((dt - 0.016).abs() < 1e-9);
        assert!((frames.total_time - 0.016).abs() < 1e-9);
    }

    #[test]
    fn long_stall_is_capped() {
        let clock = ManualClock::new();
        let mut frames = FrameClock::new(0.25);
        frames.begin_frame(&clock);
        clock.advance(Duration::from_secs(30));
        assert_eq!(frames.begin_frame(&clock), 0.25);
    }

    #[test]
    fn smoothed_frame_time_averages_recent_frames() {
        let clock = ManualClock::new();
        let mut frames = FrameClock::new(0.25);
        frames.begin_frame(&clock);
        for _ in 0..9 {
            clock.advance(Duration::from_millis(20));
            frames.begin_frame(&clock);
        }
        // 10 samples: one zero delta and nine 20ms deltas.
        assert!((frames.smoothed_frame_time_ms - 18.0).abs() < 1e-6);
    }

    #[test]
    fn manual_clock_auto_advances_per_read() {
        let clock = ManualClock::new();
        clock.set_auto_advance(Duration::from_millis(2));
        let a = clock.now();
        let b = clock.now();
        assert_eq!(b.duration_since(a), Duration::from_millis(2));
    }
}
