//! Reconnection backoff
//!
//! The connection core never retries on its own. The loop driving the bridge
//! uses [`Backoff`] to space out `reconnect()` attempts after a dead connection.

use rand::Rng;
use std::time::Duration;

/// Exponent cap so the delay computation cannot overflow
const MAX_EXPONENT: u32 = 10;

/// Exponential reconnect backoff with jitter
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Number of failed attempts since the last success
    attempts: u32,
    /// Delay before the first retry
    base_delay: Duration,
    /// Upper bound for any delay
    max_delay: Duration,
    /// Fraction of the delay added as random jitter
    jitter: f64,
}

impl Backoff {
    /// Create a new backoff with 10% jitter
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: 0,
            base_delay,
            max_delay,
            jitter: 0.1,
        }
    }

    /// Set the jitter fraction, clamped to `0.0..=1.0`
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the next attempt without jitter: base * 2^attempts, capped at max
    pub fn current_delay(&self) -> Duration {
        let factor = 2u32.pow(self.attempts.min(MAX_EXPONENT));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Record a failed attempt and return how long to wait before the next one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay();
        self.attempts = self.attempts.saturating_add(1);

        if self.jitter == 0.0 || delay.is_zero() {
            return delay;
        }

        let spread = delay.mul_f64(self.jitter);
        let extra = rand::thread_rng().gen_range(Duration::ZERO..=spread);
        (delay + extra).min(self.max_delay)
    }

    /// Reset after a successful connection
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
