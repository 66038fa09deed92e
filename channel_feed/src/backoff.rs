//! Exponential retry delays with jitter.
//!
//! An opt-in alternative to the fixed retry delay. The delay for attempt
//! `n` is `min(base * factor^n, max)`, scaled by a factor drawn from
//! `[1 - jitter, 1 + jitter]`.

use core::time::Duration;

/// Growing retry delays, reset after a healthy poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
    attempt: u32,
    seed: u64,
}

impl Backoff {
    /// Create a backoff.
    ///
    /// `factor` is raised to at least `1.0` and `jitter` is clamped to
    /// `0.0..=1.0`. NaN counts as the lower bound for both.
    #[must_use]
    pub fn new(base: Duration, max: Duration, factor: f64, jitter: f64) -> Self {
        Self {
            base,
            max,
            factor: factor.max(1.0),
            jitter: if jitter.is_nan() { 0.0 } else { jitter.clamp(0.0, 1.0) },
            attempt: 0,
            seed: 0x9e37_79b9_7f4a_7c15,
        }
    }

    /// Use a different jitter sequence, e.g. one per client.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed | 1;
        self
    }

    /// Delay before the next retry. Advances the attempt counter.
    #[must_use]
    pub fn next_delay(&mut self) -> Duration {
        let exponent = i32::try_from(self.attempt).unwrap_or(i32::MAX);
        let grown = self.base.as_secs_f64() * self.factor.powi(exponent);
        let capped = Duration::try_from_secs_f64(grown.min(self.max.as_secs_f64()))
            .map_or(self.max, |d| d.min(self.max));

        self.attempt = self.attempt.saturating_add(1);

        if self.jitter == 0.0 {
            return capped;
        }

        let spread = 1.0 - self.jitter + self.unit_random() * 2.0 * self.jitter;
        Duration::try_from_secs_f64(capped.as_secs_f64() * spread).unwrap_or(self.max)
    }

    /// Forget past failures.
    pub const fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of delays handed out since the last reset.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// xorshift64 step mapped to `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    fn unit_random(&mut self) -> f64 {
        let mut x = self.seed;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.seed = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl Default for Backoff {
    /// 1 second base, doubling, capped at 30 seconds, ±10% jitter.
    fn default() -> Self {
        Self::new(
            Duration::from_millis(crate::DEFAULT_RETRY_DELAY_MS),
            Duration::from_secs(30),
            2.0,
            0.1,
        )
    }
}
