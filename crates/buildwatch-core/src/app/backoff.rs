//! Reconnect backoff for the listener.

use std::time::Duration;

/// Delay before resuming after consecutive transient source errors.
///
/// Exponential: `base_delay * multiplier^(failures - 1)`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub base_delay: Duration,

    pub multiplier: f64,

    /// Upper bound so a long outage is still polled regularly.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    /// No waiting at all (tests, replay).
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// # Arguments
    /// * `failures` - consecutive failures so far (1-indexed).
    ///
    /// With the default policy:
    /// - failure 1: 1s
    /// - failure 2: 2s
    /// - failure 3: 4s
    /// - failure 7 and later: 60s
    pub fn next_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}
