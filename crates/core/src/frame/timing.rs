//! Frame timing anchors

use std::time::{Duration, Instant};

/// Time since an anchor instant
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    anchor: Instant,
}

impl Stopwatch {
    pub fn started_at(anchor: Instant) -> Self {
        Self { anchor }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.anchor)
    }

    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        self.elapsed(now).as_millis() as u64
    }

    /// Move the anchor to `now`
    pub fn reset(&mut self, now: Instant) {
        self.anchor = now;
    }

    /// Elapsed milliseconds as a float, then reset
    pub fn lap_ms(&mut self, now: Instant) -> f32 {
        let dt = self.elapsed(now).as_secs_f32() * 1000.0;
        self.reset(now);
        dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_and_lap() {
        let start = Instant::now();
        let mut watch = Stopwatch::started_at(start);

        let later = start + Duration::from_millis(16);
        assert_eq!(watch.elapsed_ms(later), 16);

        let dt = watch.lap_ms(later);
        assert!((dt - 16.0).abs() < 1e-3);
        assert_eq!(watch.elapsed_ms(later), 0);
    }

    #[test]
    fn test_clock_going_backwards_saturates() {
        let start = Instant::now() + Duration::from_secs(1);
        let watch = Stopwatch::started_at(start);
        assert_eq!(watch.elapsed_ms(start - Duration::from_millis(500)), 0);
    }
}
