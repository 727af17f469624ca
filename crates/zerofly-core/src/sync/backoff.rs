use std::time::Duration;

/// Exponential backoff for the read path.
///
/// `delay = min(base * 2^attempt, max)`, without jitter, so the sequence of
/// delays is non-decreasing.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    /// Failures recorded since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay for the current failure, then advance.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.peek();
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Delay `next_delay` would return, without advancing.
    pub fn peek(&self) -> Duration {
        // Exponent clamped; the cap applies long before.
        let factor = 2_u32.saturating_pow(self.attempt.min(31));
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
