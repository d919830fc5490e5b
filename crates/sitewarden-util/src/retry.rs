//! Retry policy with exponential backoff

use std::time::Duration;

use crate::WardenError;

/// Bounded exponential backoff used for persistence writes.
///
/// Attempt 1 runs immediately; attempt `n > 1` waits
/// `initial_backoff * multiplier^(n-2)`, capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        multiplier: f64,
        max_backoff: Duration,
    ) -> Result<Self, WardenError> {
        if max_attempts == 0 {
            return Err(WardenError::InvalidRetryPolicy(
                "max_attempts must be at least 1".into(),
            ));
        }
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(WardenError::InvalidRetryPolicy(format!(
                "multiplier must be >= 1.0, got {multiplier}"
            )));
        }
        if max_backoff < initial_backoff {
            return Err(WardenError::InvalidRetryPolicy(
                "max_backoff must not be smaller than initial_backoff".into(),
            ));
        }

        Ok(Self {
            max_attempts,
            initial_backoff,
            multiplier,
            max_backoff,
        })
    }

    /// Delay to wait before the given attempt (1-based).
    ///
    /// Returns `None` once attempts are exhausted.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        if attempt == 1 {
            return Some(Duration::ZERO);
        }

        let exponent = (attempt - 2).min(30) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_backoff.as_secs_f64());
        Some(Duration::from_secs_f64(capped))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_exponentially_and_cap() {
        let policy = RetryPolicy::new(
            6,
            Duration::from_millis(100),
            2.0,
            Duration::from_millis(500),
        )
        .unwrap();

        assert_eq!(policy.delay_before(1), Some(Duration::ZERO));
        assert_eq!(policy.delay_before(2), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_before(3), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_before(4), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_before(5), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_before(6), Some(Duration::from_millis(500)));
        assert_eq!(policy.delay_before(7), None);
    }

    #[test]
    fn single_attempt_policy_never_waits() {
        let policy = RetryPolicy::new(1, Duration::ZERO, 1.0, Duration::ZERO).unwrap();
        assert_eq!(policy.delay_before(1), Some(Duration::ZERO));
        assert_eq!(policy.delay_before(2), None);
    }

    #[test]
    fn rejects_invalid_policies() {
        assert!(RetryPolicy::new(0, Duration::ZERO, 2.0, Duration::ZERO).is_err());
        assert!(RetryPolicy::new(3, Duration::ZERO, 0.5, Duration::ZERO).is_err());
        assert!(
            RetryPolicy::new(3, Duration::from_secs(2), 2.0, Duration::from_secs(1)).is_err()
        );
    }
}
