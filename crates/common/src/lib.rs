//! Modular common utilities shared across AMFE crates.
//!
//! Nothing in this crate knows about failure modes: it provides the generic
//! building blocks (error classification, clocks, rate limiting, retry, TTL
//! caching, embedded SQLite storage) that the domain-specific crates compose.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification
//! - `runtime`: async infrastructure (cache, resilience)
//! - `platform`: platform integrations (SQLite storage)
//! - `observability`: tracing (pulled in by `runtime`)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod cache;
#[cfg(feature = "runtime")]
pub mod resilience;

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod storage;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use cache::TtlCell;
#[cfg(feature = "runtime")]
pub use resilience::{
    with_retry, ClassifiedRetry, Clock, FixedWindowRateLimiter, Jitter, MockClock,
    RateLimiterConfig, RetryDecision, RetryExecutor, RetryOptions, RetryOutcome, RetryPolicy,
    SystemClock,
};
#[cfg(feature = "platform")]
pub use storage::{SqliteConnection, SqlitePool, SqlitePoolConfig, StorageError, StorageResult};
