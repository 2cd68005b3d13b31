//! Resilience patterns for calls to unreliable backends
//!
//! - **Rate limiting**: fixed-window admission control keyed by identifier
//! - **Retry**: bounded attempts with exponential backoff and jitter
//! - **Clock**: time abstraction so both can be tested without sleeping
//!
//! Everything here is generic over the caller's error type. Retry decisions
//! go through [`RetryPolicy`]; [`ClassifiedRetry`] delegates to
//! [`crate::error::ErrorClassification`].

pub mod clock;
pub mod rate_limiter;
pub mod retry;

pub use clock::{Clock, MockClock, SystemClock};
pub use rate_limiter::{
    FixedWindowRateLimiter, RateLimitEntry, RateLimiterConfig, RateLimiterConfigBuilder,
};
pub use retry::policies::{AlwaysRetry, ClassifiedRetry};
pub use retry::{
    with_retry, Jitter, RetryConfigError, RetryDecision, RetryExecutor, RetryHook, RetryOptions,
    RetryOptionsBuilder, RetryOutcome, RetryPolicy,
};
