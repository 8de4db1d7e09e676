//! Retry policy and the per-call attempt state machine.
//!
//! A call is a sequence of physical attempts. After each failed attempt the
//! [`RetryState`] decides the [`Transition`]: wait and try again, or give up
//! with the error. Delays grow geometrically and are capped.

use crate::ApiError;
use rand::Rng;
use std::time::Duration;

/// Backoff configuration shared by every call of a client.
///
/// # Examples
///
/// ```
/// use sitework_api::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default();
///
/// // 1s, 2s, 4s, 8s, then capped at 10s
/// assert_eq!(config.delay_for_retry(1), Duration::from_secs(1));
/// assert_eq!(config.delay_for_retry(3), Duration::from_secs(4));
/// assert_eq!(config.delay_for_retry(5), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after each retry.
    pub backoff_multiplier: f64,
    /// Scale each delay by a random factor in `[0.5, 1.0]`.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// A config that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Returns the delay before the given retry.
    ///
    /// `retry` is 1-indexed: `1` is the first retry. Without jitter the delay
    /// is `min(initial_delay * backoff_multiplier^(retry - 1), max_delay)`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.max(0.0).powi(exponent);
        let millis = self.initial_delay.as_secs_f64() * 1000.0 * factor;
        let max_millis = self.max_delay.as_secs_f64() * 1000.0;

        // NaN and infinity both collapse to the cap
        let capped = if millis.is_finite() {
            millis.min(max_millis)
        } else {
            max_millis
        };
        let delay = Duration::from_millis(capped.max(0.0).round() as u64);

        if self.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..=1.0);
            delay.mul_f64(jitter_factor)
        } else {
            delay
        }
    }
}

/// Returns `true` if a failure with this status may succeed on another attempt.
///
/// `0` (transport failure or timeout) and `500..=599` are retryable. Every
/// other status is not; a 401 is handled by refresh-and-replay instead.
pub fn is_retryable_status(status_code: u16) -> bool {
    status_code == crate::error::TRANSPORT_STATUS || (500..=599).contains(&status_code)
}

/// What the driver loop does after an attempt.
#[derive(Debug)]
pub enum Transition<T> {
    /// The attempt succeeded; the call is done.
    Success(T),
    /// Sleep for the delay, then make another attempt.
    RetryAfter {
        delay: Duration,
        error: ApiError,
    },
    /// The call failed with this error.
    Fail(ApiError),
}

/// Attempt bookkeeping for one logical call.
#[derive(Debug)]
pub struct RetryState {
    config: RetryConfig,
    budget: u32,
    attempts: usize,
}

impl RetryState {
    /// Starts a call. With `disable_retry` the budget is zero.
    pub fn new(config: RetryConfig, disable_retry: bool) -> Self {
        let budget = if disable_retry { 0 } else { config.max_retries };
        Self {
            config,
            budget,
            attempts: 0,
        }
    }

    /// Physical attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Records the outcome of one attempt and decides what happens next.
    pub fn transition<T>(&mut self, outcome: Result<T, ApiError>) -> Transition<T> {
        self.attempts += 1;
        match outcome {
            Ok(value) => Transition::Success(value),
            Err(error) => {
                let retries_used = (self.attempts - 1) as u32;
                if error.is_retryable() && retries_used < self.budget {
                    Transition::RetryAfter {
                        delay: self.config.delay_for_retry(retries_used + 1),
                        error,
                    }
                } else {
                    Transition::Fail(error)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail(status: u16) -> Result<(), ApiError> {
        Err(ApiError::new(status, "failed", None))
    }

    #[test]
    fn test_exponential_backoff_delays() {
        let config = RetryConfig::default()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(10))
            .with_max_retries(5);

        assert_eq!(config.delay_for_retry(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_retry(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_retry(3), Duration::from_millis(400));
        assert_eq!(config.delay_for_retry(4), Duration::from_millis(800));
        assert_eq!(config.delay_for_retry(5), Duration::from_millis(1600));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_retry(4), Duration::from_millis(8000));
        assert_eq!(config.delay_for_retry(5), Duration::from_millis(10_000));
        assert_eq!(config.delay_for_retry(60), Duration::from_millis(10_000));
        assert_eq!(config.delay_for_retry(u32::MAX), Duration::from_millis(10_000));
    }

    #[test]
    fn test_custom_multiplier() {
        let config = RetryConfig::default()
            .with_initial_delay(Duration::from_millis(500))
            .with_backoff_multiplier(3.0);
        assert_eq!(config.delay_for_retry(1), Duration::from_millis(500));
        assert_eq!(config.delay_for_retry(2), Duration::from_millis(1500));
        assert_eq!(config.delay_for_retry(3), Duration::from_millis(4500));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig::default().with_jitter(true);
        for _ in 0..50 {
            let delay = config.delay_for_retry(2);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(2000));
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(0));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(502));
        assert!(is_retryable_status(599));
        for status in [400, 401, 403, 404, 409, 415, 422, 429] {
            assert!(!is_retryable_status(status), "{status} must not retry");
        }
    }

    #[test]
    fn test_transitions_exhaust_budget() {
        let mut state = RetryState::new(RetryConfig::default(), false);

        for expected in [1000, 2000, 4000] {
            match state.transition(fail(503)) {
                Transition::RetryAfter { delay, .. } => {
                    assert_eq!(delay, Duration::from_millis(expected))
                }
                other => panic!("Expected RetryAfter, got {:?}", other),
            }
        }
        match state.transition(fail(503)) {
            Transition::Fail(error) => assert_eq!(error.status_code(), 503),
            other => panic!("Expected Fail, got {:?}", other),
        }
        assert_eq!(state.attempts(), 4);
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let mut state = RetryState::new(RetryConfig::default(), false);
        assert!(matches!(state.transition(fail(422)), Transition::Fail(_)));
        assert_eq!(state.attempts(), 1);
    }

    #[test]
    fn test_disable_retry() {
        let mut state = RetryState::new(RetryConfig::default(), true);
        assert!(matches!(state.transition(fail(500)), Transition::Fail(_)));
    }

    #[test]
    fn test_success_after_retry() {
        let mut state = RetryState::new(RetryConfig::default(), false);
        assert!(matches!(
            state.transition(fail(0)),
            Transition::RetryAfter { .. }
        ));
        assert!(matches!(state.transition(Ok(7)), Transition::Success(7)));
        assert_eq!(state.attempts(), 2);
    }
}
