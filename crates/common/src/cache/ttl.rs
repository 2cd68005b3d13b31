//! Single-slot cache with time-to-live expiry
//!
//! A [`TtlCell`] holds at most one value together with the instant it was
//! stored. The value is considered fresh while `now - stored_at < ttl`; after
//! that reads miss but the stale value stays in place until overwritten or
//! invalidated. Clones share the same slot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::resilience::{Clock, SystemClock};

#[derive(Debug)]
struct Slot<V> {
    value: V,
    stored_at: Instant,
}

/// Thread-safe TTL cell
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use amfe_common::cache::TtlCell;
///
/// let cell: TtlCell<Vec<u32>> = TtlCell::new(Duration::from_secs(300));
/// assert!(cell.get().is_none());
///
/// cell.set(vec![1, 2, 3]);
/// assert_eq!(cell.get(), Some(vec![1, 2, 3]));
///
/// cell.invalidate();
/// assert!(!cell.is_valid());
/// ```
pub struct TtlCell<V, C: Clock = SystemClock> {
    slot: Arc<Mutex<Option<Slot<V>>>>,
    ttl: Duration,
    clock: Arc<C>,
}

impl<V: Clone> TtlCell<V, SystemClock> {
    /// Create an empty cell using the system clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<V: Clone, C: Clock> TtlCell<V, C> {
    /// Create an empty cell with a custom clock
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self::with_shared_clock(ttl, Arc::new(clock))
    }

    /// Create an empty cell sharing a clock with other components
    pub fn with_shared_clock(ttl: Duration, clock: Arc<C>) -> Self {
        Self { slot: Arc::new(Mutex::new(None)), ttl, clock }
    }

    /// Fresh value, if any
    pub fn get(&self) -> Option<V> {
        let now = self.clock.now();
        let slot = self.slot.lock();
        slot.as_ref()
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Store `value`, restarting the TTL
    pub fn set(&self, value: V) {
        let stored_at = self.clock.now();
        *self.slot.lock() = Some(Slot { value, stored_at });
    }

    /// Drop the stored value
    pub fn invalidate(&self) {
        if self.slot.lock().take().is_some() {
            debug!("TTL cache invalidated");
        }
    }

    /// Whether a fresh value is present; does not count as an access
    pub fn is_valid(&self) -> bool {
        let now = self.clock.now();
        self.slot
            .lock()
            .as_ref()
            .is_some_and(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl<V, C: Clock> Clone for TtlCell<V, C> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            ttl: self.ttl,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V, C: Clock> std::fmt::Debug for TtlCell<V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCell")
            .field("ttl", &self.ttl)
            .field("occupied", &self.slot.lock().is_some())
            .finish()
    }
}
