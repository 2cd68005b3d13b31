//! Retry with exponential backoff and jitter
//!
//! [`with_retry`] retries any failure; [`RetryExecutor::with_policy`] lets a
//! [`RetryPolicy`] stop early on errors that will not go away by themselves.
//! Either way the operation runs at most `max_attempts` times, strictly one
//! attempt after another, and the caller gets back the last error unchanged.
//!
//! Delay before the retry that follows failed attempt `k` (1-based):
//! `min(base_delay * backoff_factor^(k-1), max_delay)` plus jitter.
//! Backoff sleeps are plain tokio timers and are not cancellable; dropping the
//! returned future is the only way to abandon a pending retry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ErrorClassification;

/// Invalid retry configuration
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid retry configuration: {message}")]
pub struct RetryConfigError {
    pub message: String,
}

/// Observability hook invoked before each backoff sleep
pub type RetryHook = Arc<dyn Fn(u32, &dyn fmt::Display) + Send + Sync>;

/// Jitter added on top of the computed backoff delay
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jitter {
    /// No jitter
    None,
    /// Adds `delay * factor * U[0, 1)`
    Proportional(f64),
}

impl Default for Jitter {
    fn default() -> Self {
        Self::Proportional(0.1)
    }
}

impl Jitter {
    /// Apply jitter to the calculated delay
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            Jitter::None => delay,
            Jitter::Proportional(factor) => {
                let sample: f64 = rand::thread_rng().gen();
                delay + delay.mul_f64(factor.max(0.0) * sample)
            }
        }
    }
}

/// Retry configuration, constructed per call
#[derive(Clone)]
pub struct RetryOptions {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Cap applied before jitter
    pub max_delay: Duration,
    /// Multiplier applied per subsequent attempt
    pub backoff_factor: f64,
    /// Randomisation added to each delay
    pub jitter: Jitter,
    on_retry: Option<RetryHook>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_factor: 2.0,
            jitter: Jitter::default(),
            on_retry: None,
        }
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_factor", &self.backoff_factor)
            .field("jitter", &self.jitter)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

impl RetryOptions {
    /// Create a configuration builder
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::default()
    }

    /// Profile for full searches: 3 attempts, 1s base, 10s cap
    pub fn search() -> Self {
        Self::default()
    }

    /// Responsive profile for autocomplete: 2 attempts, 500ms base, 5s cap
    pub fn suggestions() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(5000),
            ..Self::default()
        }
    }

    /// Short profile for local lock contention: 3 attempts, 50ms base, 500ms cap
    pub fn storage() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            ..Self::default()
        }
    }

    /// Attach an `on_retry(attempt, error)` hook
    ///
    /// The hook is side-effect only and runs before each backoff sleep.
    pub fn on_retry<F>(mut self, hook: F) -> Self
    where
        F: Fn(u32, &dyn fmt::Display) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(hook));
        self
    }

    /// Backoff delay (before jitter) after failed attempt `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms = self.base_delay.as_millis() as f64 * self.backoff_factor.powi(exponent);
        let capped = delay_ms.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.max_attempts == 0 {
            return Err(RetryConfigError {
                message: "max_attempts must be greater than 0".to_string(),
            });
        }
        if self.backoff_factor <= 0.0 || !self.backoff_factor.is_finite() {
            return Err(RetryConfigError {
                message: "backoff_factor must be a positive number".to_string(),
            });
        }
        if self.base_delay > self.max_delay {
            return Err(RetryConfigError {
                message: "base_delay must not exceed max_delay".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for RetryOptions with fluent API
#[derive(Debug, Default)]
pub struct RetryOptionsBuilder {
    options: RetryOptions,
}

impl RetryOptionsBuilder {
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.options.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.options.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.options.max_delay = delay;
        self
    }

    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.options.backoff_factor = factor;
        self
    }

    pub fn no_jitter(mut self) -> Self {
        self.options.jitter = Jitter::None;
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.options.jitter = jitter;
        self
    }

    pub fn build(self) -> Result<RetryOptions, RetryConfigError> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Decide what to do after failed attempt `attempt` (1-based)
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry the operation with a custom delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Outcome of a retry execution including result and summary statistics
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
    /// Delays actually slept, in order
    pub delays: Vec<Duration>,
    /// True when the policy ended the sequence before attempts ran out
    pub stopped_by_policy: bool,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }

    /// Sum of all backoff delays
    pub fn total_delay(&self) -> Duration {
        self.delays.iter().sum()
    }
}

/// The main retry executor
pub struct RetryExecutor<P> {
    options: RetryOptions,
    policy: P,
}

impl RetryExecutor<policies::AlwaysRetry> {
    /// Executor that retries every failure
    pub fn new(options: RetryOptions) -> Self {
        Self { options, policy: policies::AlwaysRetry }
    }
}

impl<P> RetryExecutor<P> {
    /// Executor that consults `policy` before each retry
    pub fn with_policy(options: RetryOptions, policy: P) -> Self {
        Self { options, policy }
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.options.max_attempts.max(1);
        let mut delays = Vec::new();
        let mut attempt = 1;

        loop {
            debug!("Executing operation (attempt {}/{})", attempt, max_attempts);

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded after {} retries", attempt - 1);
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                        delays,
                        stopped_by_policy: false,
                    };
                }
                Err(error) => error,
            };

            if attempt >= max_attempts {
                warn!(attempts = attempt, error = %error, "All retry attempts exhausted");
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                    delays,
                    stopped_by_policy: false,
                };
            }

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(attempt, error = %error, "Retry policy determined not to retry");
                    return RetryOutcome {
                        result: Err(error),
                        attempts: attempt,
                        delays,
                        stopped_by_policy: true,
                    };
                }
                RetryDecision::Retry => {
                    self.options.jitter.apply(self.options.delay_for_attempt(attempt))
                }
                RetryDecision::RetryAfter(custom) => custom,
            };

            if let Some(hook) = &self.options.on_retry {
                hook(attempt, &error);
            }

            warn!(attempt, ?delay, error = %error, "Operation failed, retrying");
            tokio::time::sleep(delay).await;
            delays.push(delay);
            attempt += 1;
        }
    }
}

/// Retry `operation` on every failure according to `options`
pub async fn with_retry<F, Fut, T, E>(options: RetryOptions, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    RetryExecutor::new(options).execute(operation).await
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::*;

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Retries errors that classify themselves as retryable
    ///
    /// Honours [`ErrorClassification::retry_after`] when the error carries a
    /// server-suggested delay.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ClassifiedRetry;

    impl<E: ErrorClassification> RetryPolicy<E> for ClassifiedRetry {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if !error.is_retryable() {
                return RetryDecision::Stop;
            }
            match error.retry_after() {
                Some(delay) => RetryDecision::RetryAfter(delay),
                None => RetryDecision::Retry,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for retry backoff, policies, and attempt limits.

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::policies::*;
    use super::*;
    use crate::error::ErrorSeverity;

    #[derive(Debug)]
    struct Flaky {
        retryable: bool,
    }

    impl fmt::Display for Flaky {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "flaky(retryable={})", self.retryable)
        }
    }

    impl ErrorClassification for Flaky {
        fn is_retryable(&self) -> bool {
            self.retryable
        }

        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Warning
        }
    }

    fn fast_options(max_attempts: u32) -> RetryOptions {
        RetryOptions::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(1000))
            .no_jitter()
            .build()
            .unwrap()
    }

    #[test]
    fn test_delay_for_attempt_is_exponential_and_capped() {
        let options = RetryOptions { jitter: Jitter::None, ..RetryOptions::search() };

        assert_eq!(options.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(options.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(options.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(options.delay_for_attempt(5), Duration::from_millis(10_000));
        assert_eq!(options.delay_for_attempt(40), Duration::from_millis(10_000));
    }

    #[test]
    fn test_proportional_jitter_bounds() {
        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let jittered = Jitter::Proportional(0.1).apply(base);
            assert!(jittered >= base);
            assert!(jittered < Duration::from_millis(1100));
        }
        assert_eq!(Jitter::None.apply(base), base);
    }

    #[test]
    fn test_profiles() {
        let search = RetryOptions::search();
        assert_eq!(search.max_attempts, 3);
        assert_eq!(search.base_delay, Duration::from_millis(1000));
        assert_eq!(search.max_delay, Duration::from_millis(10_000));

        let suggestions = RetryOptions::suggestions();
        assert_eq!(suggestions.max_attempts, 2);
        assert_eq!(suggestions.base_delay, Duration::from_millis(500));
        assert_eq!(suggestions.max_delay, Duration::from_millis(5000));

        let storage = RetryOptions::storage();
        assert_eq!(storage.max_attempts, 3);
        assert_eq!(storage.base_delay, Duration::from_millis(50));
        assert!(storage.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(RetryOptions::builder().max_attempts(0).build().is_err());
        assert!(RetryOptions::builder().backoff_factor(0.0).build().is_err());
        assert!(RetryOptions::builder()
            .base_delay(Duration::from_secs(20))
            .max_delay(Duration::from_secs(1))
            .build()
            .is_err());
        assert!(RetryOptions::builder().build().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success_does_not_sleep() {
        let calls = AtomicU32::new(0);
        let outcome = RetryExecutor::new(fast_options(3))
            .execute_with_outcome(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Flaky>("success")
            })
            .await;

        assert_eq!(outcome.result.unwrap(), "success");
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.delays.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_once_then_succeed_calls_hook_once() {
        let calls = AtomicU32::new(0);
        let hook_calls = Arc::new(Mutex::new(Vec::new()));
        let hook_record = Arc::clone(&hook_calls);
        let options = fast_options(3).on_retry(move |attempt, error| {
            hook_record.lock().unwrap().push((attempt, error.to_string()));
        });

        let result = with_retry(options, || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Flaky { retryable: true })
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            hook_calls.lock().unwrap().as_slice(),
            &[(1, "flaky(retryable=true)".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_returns_last_error_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let outcome = RetryExecutor::new(fast_options(3))
            .execute_with_outcome(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(format!("failure #{}", n + 1))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.result.unwrap_err(), "failure #3");
        assert_eq!(outcome.delays, vec![Duration::from_millis(100), Duration::from_millis(200)]);
        assert!(outcome.delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_classified_policy_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let outcome = RetryExecutor::with_policy(fast_options(3), ClassifiedRetry)
            .execute_with_outcome(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Flaky { retryable: false })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(outcome.stopped_by_policy);
        assert!(!outcome.result.unwrap_err().retryable);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classified_policy_retries_transient_error() {
        let calls = AtomicU32::new(0);
        let result = RetryExecutor::with_policy(fast_options(3), ClassifiedRetry)
            .execute(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(Flaky { retryable: true })
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let options = RetryOptions { max_attempts: 0, ..fast_options(1) };
        let _ = with_retry(options, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("x")
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
