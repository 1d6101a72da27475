//! Animation clock driving the per-frame `render` call.
//!
//! Reports milliseconds since start (the renderer's time input) and the
//! frame delta used to advance the orbiting camera. Large gaps, such as a
//! window drag or a debugger pause, are clamped so animation resumes smoothly.

use std::time::Instant;
use tracing::warn;

/// Simulated frame length for headless rendering: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Maximum frame time counted toward the animation.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// One frame's timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Seconds since the previous frame, clamped to [`MAX_FRAME_TIME`].
    pub dt: f64,
    /// Animation time since start, in milliseconds.
    pub elapsed_ms: f64,
    /// Zero-based index of this frame.
    pub frame: u64,
}

pub struct FrameClock {
    previous_time: Instant,
    elapsed: f64,
    frame_count: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            previous_time: Instant::now(),
            elapsed: 0.0,
            frame_count: 0,
        }
    }

    /// Measure wall-clock time since the last tick and advance by it.
    pub fn tick(&mut self) -> FrameTick {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.advance(frame_time)
    }

    /// Advance by an explicit frame time in seconds.
    pub fn advance(&mut self, frame_time: f64) -> FrameTick {
        let mut dt = frame_time.max(0.0);
        if dt > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                dt * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            dt = MAX_FRAME_TIME;
        }
        self.elapsed += dt;
        let tick = FrameTick {
            dt,
            elapsed_ms: self.elapsed * 1000.0,
            frame: self.frame_count,
        };
        self.frame_count += 1;
        tick
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Animation time in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates_milliseconds() {
        let mut clock = FrameClock::new();
        clock.advance(0.125);
        let tick = clock.advance(0.25);
        assert!((tick.elapsed_ms - 375.0).abs() < 1e-9, "elapsed {}", tick.elapsed_ms);
        assert_eq!(tick.frame, 1);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn test_large_gap_is_clamped() {
        let mut clock = FrameClock::new();
        let tick = clock.advance(5.0);
        assert_eq!(tick.dt, MAX_FRAME_TIME);
        assert!((clock.elapsed() - MAX_FRAME_TIME).abs() < 1e-12);
    }

    #[test]
    fn test_negative_time_is_ignored() {
        let mut clock = FrameClock::new();
        let tick = clock.advance(-1.0);
        assert_eq!(tick.dt, 0.0);
        assert_eq!(tick.elapsed_ms, 0.0);
    }

    #[test]
    fn test_sixty_fixed_frames_make_one_second() {
        let mut clock = FrameClock::new();
        let mut last = clock.advance(FIXED_DT);
        for _ in 1..60 {
            last = clock.advance(FIXED_DT);
        }
        assert!((last.elapsed_ms - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_wall_clock_tick_is_monotonic() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert!(b.elapsed_ms >= a.elapsed_ms);
    }
}
