//! Error types used throughout the AMFE client
//!
//! Transport failures arrive as [`RemoteFailure`], a closed set of shapes the
//! backend can produce. [`RemoteFailure::classify`] maps each shape onto the
//! taxonomy that drives retry and fallback, so nothing downstream inspects
//! status codes or backend error codes directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{NOT_FOUND_CODE, TIMEOUT_CODE};
use crate::impl_domain_status_conversions;

/// Main error type for AMFE operations
///
/// Remote and storage variants display a short, user-safe message; their
/// technical detail stays in the carried [`RemoteFailure`] or detail string
/// and in logs. Configuration and internal variants display their detail, so
/// use [`AmfeError::user_message`] for anything shown to a person.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum AmfeError {
    #[error("Rate limit exceeded. Please wait before searching again.")]
    RateLimitExceeded { remaining: u32, reset_at: DateTime<Utc> },

    /// Retryable backend failure; `context` is the user-facing summary
    #[error("{context}")]
    TransientRemote { context: String, failure: RemoteFailure },

    /// Backend rejected the request; retrying will not help
    #[error("{context}")]
    PermanentRemote { context: String, failure: RemoteFailure },

    #[error("Search temporarily unavailable. Please try again.")]
    SearchUnavailable,

    /// Local store could not be opened or read; the string is the cause
    #[error("Offline storage is not available.")]
    StorageUnavailable(String),

    /// Local store rejected a write; the string is the cause
    #[error("Failed to save offline data.")]
    StorageWrite(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for AMFE operations
pub type Result<T> = std::result::Result<T, AmfeError>;

impl AmfeError {
    /// Wrap a backend failure under a user-facing summary, choosing the
    /// variant from the failure's classification
    pub fn remote(context: impl Into<String>, failure: RemoteFailure) -> Self {
        let context = context.into();
        match failure.classify() {
            RemoteErrorClass::Transient => Self::TransientRemote { context, failure },
            RemoteErrorClass::Permanent | RemoteErrorClass::NotFound => {
                Self::PermanentRemote { context, failure }
            }
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientRemote { .. } | Self::RateLimitExceeded { .. })
    }

    /// Short message suitable for showing to a person
    pub fn user_message(&self) -> String {
        match self {
            Self::StorageWrite(_) => "Offline storage is not available.".to_string(),
            Self::Internal(_) => "Something went wrong. Please try again.".to_string(),
            other => other.to_string(),
        }
    }

    /// Technical cause of a storage failure, for logs
    pub fn storage_detail(&self) -> Option<&str> {
        match self {
            Self::StorageUnavailable(detail) | Self::StorageWrite(detail) => Some(detail),
            _ => None,
        }
    }

    /// Underlying backend failure, if any
    pub fn remote_failure(&self) -> Option<&RemoteFailure> {
        match self {
            Self::TransientRemote { failure, .. } | Self::PermanentRemote { failure, .. } => {
                Some(failure)
            }
            _ => None,
        }
    }
}

/// Failure reported by the remote table backend
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteFailure {
    /// Request never produced a response (DNS, connect, reset, timeout)
    #[error("network failure: {message}")]
    Network { message: String },

    /// HTTP error status, with the backend's error body when it sent one
    #[error("HTTP {status}: {message}")]
    Status { status: u16, code: Option<String>, message: String },

    /// Backend error code without a meaningful status
    #[error("backend error {code}: {message}")]
    Code { code: String, message: String },

    /// Anything else, including undecodable responses
    #[error("{message}")]
    Message { message: String },
}

impl RemoteFailure {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network { message: message.into() }
    }

    pub fn status(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self::Status { status, code, message: message.into() }
    }

    pub fn code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Code { code: code.into(), message: message.into() }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self::Message { message: message.into() }
    }

    /// Backend error code, wherever it was carried
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Status { code, .. } => code.as_deref(),
            Self::Code { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Map the transport shape onto the retry/fallback taxonomy
    ///
    /// - network failures, 5xx, 429 and the backend timeout code are transient
    /// - the "no rows" code is not-found
    /// - everything else is permanent
    pub fn classify(&self) -> RemoteErrorClass {
        match self.error_code() {
            Some(NOT_FOUND_CODE) => return RemoteErrorClass::NotFound,
            Some(TIMEOUT_CODE) => return RemoteErrorClass::Transient,
            _ => {}
        }
        match self {
            Self::Network { .. } => RemoteErrorClass::Transient,
            Self::Status { status, .. } if *status >= 500 || *status == 429 => {
                RemoteErrorClass::Transient
            }
            _ => RemoteErrorClass::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.classify() == RemoteErrorClass::Transient
    }

    pub fn is_not_found(&self) -> bool {
        self.classify() == RemoteErrorClass::NotFound
    }
}

/// Classification of a [`RemoteFailure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorClass {
    Transient,
    Permanent,
    NotFound,
}

impl_domain_status_conversions!(RemoteErrorClass {
    Transient => "transient",
    Permanent => "permanent",
    NotFound => "not_found",
});
