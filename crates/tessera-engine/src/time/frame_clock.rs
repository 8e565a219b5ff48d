use std::time::{Duration, Instant};

/// Timing of one frame.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped seconds since the previous tick.
    pub dt: f32,
    /// Sum of all clamped deltas; drives animation.
    pub elapsed: f32,
    pub frame_index: u64,
}

/// Per-window frame clock.
///
/// Deltas are clamped to `[min_dt, max_dt]` so a debugger pause or a minimized window
/// does not produce a huge animation step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f32,
    frame_index: u64,
    min_dt: Duration,
    max_dt: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(min_dt: Duration, max_dt: Duration) -> Self {
        debug_assert!(min_dt <= max_dt);
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            frame_index: 0,
            min_dt,
            max_dt,
        }
    }

    /// Restarts delta measurement without touching `elapsed`.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = self.advance(now.saturating_duration_since(self.last));
        self.last = now;
        dt
    }

    fn advance(&mut self, raw: Duration) -> FrameTime {
        let dt = raw.clamp(self.min_dt, self.max_dt).as_secs_f32();
        self.elapsed += dt;
        let time = FrameTime {
            dt,
            elapsed: self.elapsed,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
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
    fn deltas_are_clamped_and_accumulated() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(1), Duration::from_millis(100));
        let a = clock.advance(Duration::ZERO);
        let b = clock.advance(Duration::from_secs(5));

        assert_eq!(a.dt, 0.001);
        assert_eq!(b.dt, 0.1);
        assert!((b.elapsed - 0.101).abs() < 1e-6);
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
    }
}
