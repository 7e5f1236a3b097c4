//! Redelivery policy configuration

use std::time::Duration;

/// Redelivery schedule applied to every endpoint of a provisioned bus.
///
/// A message is attempted once, then redelivered up to `attempts` more
/// times with a fixed or exponentially growing delay between attempts.
/// After the schedule is exhausted the message moves to the endpoint's
/// dead-letter path.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Number of redelivery attempts after the initial failure.
    pub attempts: u32,
    /// Delay before the first redelivery.
    pub initial_interval: Duration,
    /// Multiplier applied to the delay for each further redelivery.
    pub backoff_coefficient: f64,
    /// Upper bound on any single delay.
    pub maximum_interval: Duration,
}

impl Default for RetryPolicy {
    /// Three redeliveries at a fixed five-second interval.
    fn default() -> Self {
        Self::interval(3, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// Fixed-interval schedule: `attempts` redeliveries, `interval` apart.
    pub fn interval(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts,
            initial_interval: interval,
            backoff_coefficient: 1.0,
            maximum_interval: interval,
        }
    }

    /// Exponential schedule starting at `initial_interval` and growing by
    /// `backoff_coefficient` per redelivery, capped at `maximum_interval`.
    pub fn exponential(
        attempts: u32,
        initial_interval: Duration,
        backoff_coefficient: f64,
        maximum_interval: Duration,
    ) -> Self {
        Self { attempts, initial_interval, backoff_coefficient, maximum_interval }
    }

    /// No redeliveries: the first failure dead-letters the message.
    pub fn none() -> Self {
        Self::interval(0, Duration::ZERO)
    }

    /// Delay before the given redelivery (1-based).
    pub fn delay_for(&self, redelivery: u32) -> Duration {
        let exponent = redelivery.saturating_sub(1);
        let seconds =
            self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent as i32);
        Duration::from_secs_f64(seconds).min(self.maximum_interval)
    }

    /// The full redelivery delay schedule.
    pub fn delays(&self) -> Vec<Duration> {
        (1..=self.attempts).map(|redelivery| self.delay_for(redelivery)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_three_redeliveries_five_seconds_apart() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delays(), vec![Duration::from_secs(5); 3]);
    }

    #[test]
    fn override_replaces_the_default_entirely() {
        let policy = RetryPolicy::interval(5, Duration::from_secs(1));
        assert_eq!(policy.delays(), vec![Duration::from_secs(1); 5]);
    }

    #[test]
    fn exponential_delays_grow_and_are_capped() {
        let policy = RetryPolicy::exponential(
            4,
            Duration::from_secs(1),
            2.0,
            Duration::from_secs(3),
        );
        assert_eq!(
            policy.delays(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(3),
            ]
        );
    }

    #[test]
    fn none_dead_letters_immediately() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.attempts, 0);
        assert!(policy.delays().is_empty());
    }
}
