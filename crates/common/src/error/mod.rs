//! Error classification shared by AMFE crates
//!
//! Error types stay local to the module that raises them. What is shared is
//! the vocabulary for deciding what to do with one:
//!
//! - **`ErrorClassification`**: whether an error is worth retrying, how severe
//!   it is, and whether it carries a server-suggested delay. The retry
//!   executor consults it through [`crate::resilience::ClassifiedRetry`].
//! - **`ErrorSeverity`**: a single ordered severity scale for logging.
//!
//! ```rust,ignore
//! impl ErrorClassification for StoreError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, Self::Busy)
//!     }
//!
//!     fn severity(&self) -> ErrorSeverity {
//!         ErrorSeverity::Warning
//!     }
//! }
//! ```

use std::fmt;
use std::time::Duration;

/// Trait for classifying errors by their characteristics
///
/// Implemented by error types that flow through the retry executor so that
/// retry decisions are made on meaning, not on transport details.
pub trait ErrorClassification {
    /// Whether another attempt may succeed
    ///
    /// Retryable errors are transient: lock contention, timeouts, dropped
    /// connections.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
