//! Reconnect backoff policy.

use std::time::Duration;

use chatline_core::config::ReconnectConfig;

/// Capped exponential backoff: `base * 2^attempt`, never above `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base: Duration,
    max_delay: Duration,
    jitter_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(2_000), Duration::from_millis(8_000))
    }
}

impl BackoffPolicy {
    /// Create a policy without jitter.
    pub fn new(base: Duration, max_delay: Duration) -> Self {
        Self {
            base,
            max_delay,
            jitter_factor: 0.0,
        }
    }

    /// Build a policy from the `[reconnect]` config section.
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(config.base_delay(), config.max_delay()).with_jitter(config.jitter_factor)
    }

    /// Shave up to `factor` of each sampled delay off at random.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delay before reconnect attempt number `attempt` (0-indexed).
    ///
    /// Pure and total: saturates instead of overflowing for large attempts.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max_delay)
    }

    /// Delay actually used for scheduling.
    ///
    /// Equal to [`delay`](Self::delay) unless jitter is configured, in which
    /// case it lies in `[delay * (1 - jitter), delay]`.
    pub fn sample(&self, attempt: u32) -> Duration {
        let delay = self.delay(attempt);
        if self.jitter_factor == 0.0 {
            return delay;
        }
        let shave = rand::random::<f64>() * self.jitter_factor;
        delay.mul_f64(1.0 - shave)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delay_sequence() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(2_000));
        assert_eq!(policy.delay(1), Duration::from_millis(4_000));
        assert_eq!(policy.delay(2), Duration::from_millis(8_000));
        assert_eq!(policy.delay(3), Duration::from_millis(8_000));
    }

    #[test]
    fn test_delay_is_capped_and_monotonic() {
        let policy = BackoffPolicy::default();
        let mut previous = Duration::ZERO;
        for attempt in 0..200 {
            let delay = policy.delay(attempt);
            assert!(delay <= policy.max_delay());
            assert!(delay >= previous);
            previous = delay;
        }
        assert_eq!(policy.delay(u32::MAX), Duration::from_millis(8_000));
    }

    #[test]
    fn test_custom_policy() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
        assert_eq!(policy.delay(4), Duration::from_secs(1));
    }

    #[test]
    fn test_sample_without_jitter_matches_delay() {
        let policy = BackoffPolicy::default();
        for attempt in 0..5 {
            assert_eq!(policy.sample(attempt), policy.delay(attempt));
        }
    }

    #[test]
    fn test_sample_with_jitter_stays_in_range() {
        let policy = BackoffPolicy::default().with_jitter(0.5);
        for _ in 0..100 {
            let sampled = policy.sample(5);
            assert!(sampled <= Duration::from_millis(8_000));
            assert!(sampled >= Duration::from_millis(4_000));
        }
    }

    #[test]
    fn test_from_config() {
        let config = ReconnectConfig {
            base_delay_ms: 500,
            max_delay_ms: 1_500,
            jitter_factor: 0.0,
            ..ReconnectConfig::default()
        };
        let policy = BackoffPolicy::from_config(&config);
        assert_eq!(policy.delay(0), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1_500));
    }
}
