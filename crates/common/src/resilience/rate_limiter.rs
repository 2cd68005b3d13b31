//! Fixed-window rate limiting keyed by caller-chosen identifiers
//!
//! Each identifier owns a counter and a window deadline. The first request
//! (or the first one after the deadline passed) opens a new window; requests
//! inside an open window are admitted until `max_requests` is reached.
//! Windows reset abruptly, so bursts at window edges are possible.
//!
//! Entries are created and reset lazily. There is no background sweep; the
//! map grows with the number of distinct identifiers seen.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;
use tracing::debug;

use super::{Clock, SystemClock};

/// Configuration for the fixed-window rate limiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Requests admitted per identifier per window
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { max_requests: 10, window: Duration::from_millis(1000) }
    }
}

impl RateLimiterConfig {
    /// Create a new configuration builder
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_requests == 0 {
            return Err("max_requests must be greater than 0".to_string());
        }
        if self.window.is_zero() {
            return Err("window must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Builder for RateLimiterConfig
#[derive(Debug, Default)]
pub struct RateLimiterConfigBuilder {
    config: RateLimiterConfig,
}

impl RateLimiterConfigBuilder {
    pub fn new() -> Self {
        Self { config: RateLimiterConfig::default() }
    }

    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.config.max_requests = max_requests;
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.config.window = window;
        self
    }

    pub fn build(self) -> Result<RateLimiterConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Per-identifier window state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: Instant,
}

/// Fixed-window request admission control
///
/// # Examples
///
/// ```rust
/// use amfe_common::resilience::FixedWindowRateLimiter;
///
/// let limiter = FixedWindowRateLimiter::default();
/// assert!(limiter.is_allowed("search-{}"));
/// assert_eq!(limiter.remaining_requests("search-{}"), 9);
/// ```
pub struct FixedWindowRateLimiter<C: Clock = SystemClock> {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimitEntry>>>,
    clock: Arc<C>,
}

impl<C: Clock> FixedWindowRateLimiter<C> {
    /// Create a new limiter with a custom clock
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> Result<Self, String> {
        config.validate()?;
        Ok(Self { config, entries: Arc::new(Mutex::new(HashMap::new())), clock: Arc::new(clock) })
    }

    /// Admit or reject one request for `identifier`
    ///
    /// A rejected request does not consume from the window.
    pub fn is_allowed(&self, identifier: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get_mut(identifier) {
            if now <= entry.reset_time {
                if entry.count >= self.config.max_requests {
                    debug!(identifier, count = entry.count, "Rate limit exceeded");
                    return false;
                }
                entry.count += 1;
                return true;
            }
        }

        // First request or window expired
        entries.insert(
            identifier.to_string(),
            RateLimitEntry { count: 1, reset_time: now + self.config.window },
        );
        true
    }

    /// Requests still admissible in the current window; never negative
    pub fn remaining_requests(&self, identifier: &str) -> u32 {
        let now = self.clock.now();
        match self.entries.lock().get(identifier) {
            Some(entry) if now <= entry.reset_time => {
                self.config.max_requests.saturating_sub(entry.count)
            }
            _ => self.config.max_requests,
        }
    }

    /// Instant at which the identifier's window resets
    ///
    /// Unknown identifiers report `now + window`. Expired entries report their
    /// stale deadline until the next `is_allowed` replaces them.
    pub fn reset_time(&self, identifier: &str) -> Instant {
        match self.entries.lock().get(identifier) {
            Some(entry) => entry.reset_time,
            None => self.clock.now() + self.config.window,
        }
    }

    /// Wall-clock version of [`Self::reset_time`] for display
    pub fn reset_at(&self, identifier: &str) -> SystemTime {
        self.clock.to_system_time(self.reset_time(identifier))
    }

    /// Drop all window state
    pub fn reset(&self) {
        self.entries.lock().clear();
    }

    /// Number of identifiers currently tracked
    pub fn tracked_identifiers(&self) -> usize {
        self.entries.lock().len()
    }

    /// Limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

impl FixedWindowRateLimiter<SystemClock> {
    /// Create a new limiter with system clock
    pub fn new(config: RateLimiterConfig) -> Result<Self, String> {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for FixedWindowRateLimiter<SystemClock> {
    fn default() -> Self {
        Self {
            config: RateLimiterConfig::default(),
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock: Arc::new(SystemClock),
        }
    }
}

impl<C: Clock> Clone for FixedWindowRateLimiter<C> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            entries: Arc::clone(&self.entries),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<C: Clock> std::fmt::Debug for FixedWindowRateLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowRateLimiter")
            .field("config", &self.config)
            .field("tracked_identifiers", &self.tracked_identifiers())
            .finish()
    }
}
