use std::time::Duration;

use rand::Rng;

pub const DEFAULT_BACKOFF_SECONDS: f64 = 2.0;
pub const DEFAULT_DELAY_RESET: usize = 3;
pub const MAX_BACKOFF_SECONDS: f64 = 3600.0;

/// Delay between sweep candidates. Grows as `2 * current + jitter`, capped at
/// `MAX_BACKOFF_SECONDS`, and falls back to the base on every
/// `delay_reset`-th iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    base: f64,
    delay_reset: usize,
    current: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_BACKOFF_SECONDS, DEFAULT_DELAY_RESET)
    }
}

impl Backoff {
    pub fn new(base_seconds: f64, delay_reset: usize) -> Self {
        let base = if base_seconds.is_finite() {
            base_seconds.clamp(0.0, MAX_BACKOFF_SECONDS)
        } else {
            DEFAULT_BACKOFF_SECONDS
        };
        Self {
            base,
            delay_reset: delay_reset.max(1),
            current: base,
        }
    }

    pub fn current_seconds(&self) -> f64 {
        self.current
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.current)
    }

    /// `iteration` counts completed candidates starting at 1; `jitter` is
    /// expected in `[0, 1)`.
    pub fn advance(&mut self, iteration: usize, jitter: f64) {
        if iteration % self.delay_reset == 0 {
            self.current = self.base;
        } else {
            self.current = (2.0 * self.current + jitter).min(MAX_BACKOFF_SECONDS);
        }
    }

    pub fn advance_with<R: Rng>(&mut self, iteration: usize, rng: &mut R) {
        let jitter = rng.gen_range(0.0..1.0);
        self.advance(iteration, jitter);
    }
}
