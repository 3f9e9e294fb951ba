//! Frame timing for the render loop.

use std::time::{Duration, Instant};

/// Tracks wall-clock time across frames.
///
/// The renderer polls [`Timer::delta_secs`] once per redraw to advance
/// animation; the delta is measured between consecutive calls.
#[derive(Debug)]
pub struct Timer {
    started: Instant,
    previous_frame: Instant,
    frame_index: u64,
}

impl Timer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            previous_frame: now,
            frame_index: 0,
        }
    }

    /// Time since the previous call, advancing the reference point.
    pub fn delta(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now.duration_since(self.previous_frame);
        self.previous_frame = now;
        self.frame_index += 1;
        delta
    }

    /// Seconds since the previous call, advancing the reference point.
    pub fn delta_secs(&mut self) -> f32 {
        self.delta().as_secs_f32()
    }

    /// Total time since the timer was constructed or last restarted.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of completed delta measurements.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Rewind both the start point and the delta reference to now.
    pub fn restart(&mut self) {
        let now = Instant::now();
        self.started = now;
        self.previous_frame = now;
        self.frame_index = 0;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_counts_frames() {
        let mut timer = Timer::new();
        assert_eq!(timer.frame_index(), 0);
        timer.delta();
        timer.delta();
        assert_eq!(timer.frame_index(), 2);
    }

    #[test]
    fn test_restart_clears_frame_index() {
        let mut timer = Timer::new();
        timer.delta();
        timer.restart();
        assert_eq!(timer.frame_index(), 0);
        assert!(timer.elapsed() < Duration::from_secs(1));
    }
}
