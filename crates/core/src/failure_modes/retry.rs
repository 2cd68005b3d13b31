//! Retry wiring for remote table calls

use std::time::Duration;

use amfe_common::resilience::{RetryDecision, RetryOptions, RetryPolicy};
use amfe_domain::{RemoteErrorClass, RemoteFailure, RetryProfile};

/// Retries transient backend failures and stops on everything else
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteFailurePolicy;

impl RetryPolicy<RemoteFailure> for RemoteFailurePolicy {
    fn should_retry(&self, error: &RemoteFailure, _attempt: u32) -> RetryDecision {
        match error.classify() {
            RemoteErrorClass::Transient => RetryDecision::Retry,
            RemoteErrorClass::Permanent | RemoteErrorClass::NotFound => RetryDecision::Stop,
        }
    }
}

/// Build executor options from a configured profile
pub fn retry_options(profile: &RetryProfile) -> RetryOptions {
    let mut options = RetryOptions::default();
    options.max_attempts = profile.max_attempts;
    options.base_delay = Duration::from_millis(profile.base_delay_ms);
    options.max_delay = Duration::from_millis(profile.max_delay_ms);
    options.backoff_factor = profile.backoff_factor;
    options
}
