//! Failure-mode service - orchestration around the remote and local ports
//!
//! Full searches go: rate limit check, then the local store when offline,
//! otherwise the remote table under retry. A successful remote search
//! replaces the local copy as a side effect; a failed one falls back to the
//! local store if connectivity dropped in the meantime.
//!
//! Autocomplete never fails: every error degrades to local results or an
//! empty list. Auxiliary reads go through a five-minute in-memory cache of the
//! full library and report failures as short user-safe messages.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use amfe_common::cache::TtlCell;
use amfe_common::resilience::{
    Clock, FixedWindowRateLimiter, RateLimiterConfig, RetryExecutor, RetryOptions, SystemClock,
};
use amfe_domain::constants::{
    AUTOCOMPLETE_RATE_LIMIT_PREFIX, DEFAULT_CACHE_TTL_SECS, SEARCH_RATE_LIMIT_PREFIX,
};
use amfe_domain::{
    AmfeError, Config, FailureMode, FailureModeSearchParams, FailureModeStats, NewFailureMode,
    OfflineInfo, Result,
};
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::ports::{FailureModeTable, LocalRecordStore};
use super::query::{FailureModeOrder, FailureModeQuery};
use super::retry::{retry_options, RemoteFailurePolicy};
use super::search::distinct_sorted_categories;
use crate::connectivity::OnlineDetector;

/// Tunables for [`FailureModeService`]
#[derive(Debug, Clone)]
pub struct FailureModeServiceConfig {
    pub rate_limit: RateLimiterConfig,
    pub cache_ttl: Duration,
    pub search_retry: RetryOptions,
    pub suggestion_retry: RetryOptions,
}

impl Default for FailureModeServiceConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimiterConfig::default(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            search_retry: RetryOptions::search(),
            suggestion_retry: RetryOptions::suggestions(),
        }
    }
}

impl FailureModeServiceConfig {
    /// Derive service tunables from application configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            rate_limit: RateLimiterConfig {
                max_requests: config.rate_limit.max_requests,
                window: Duration::from_millis(config.rate_limit.window_ms),
            },
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            search_retry: retry_options(&config.retry.search),
            suggestion_retry: retry_options(&config.retry.suggestions),
        }
    }
}

/// Resilient access to the failure-mode library
pub struct FailureModeService<C: Clock = SystemClock> {
    remote: Arc<dyn FailureModeTable>,
    local: Option<Arc<dyn LocalRecordStore>>,
    detector: Arc<OnlineDetector>,
    limiter: FixedWindowRateLimiter<C>,
    cache: TtlCell<Vec<FailureMode>, C>,
    search_retry: RetryOptions,
    suggestion_retry: RetryOptions,
}

impl FailureModeService<SystemClock> {
    /// Create a service on the system clock
    pub fn new(
        remote: Arc<dyn FailureModeTable>,
        detector: Arc<OnlineDetector>,
        config: FailureModeServiceConfig,
    ) -> Result<Self> {
        Self::with_clock(remote, detector, config, SystemClock)
    }
}

impl<C: Clock + Clone> FailureModeService<C> {
    /// Create a service whose rate limiter and cache read `clock`
    pub fn with_clock(
        remote: Arc<dyn FailureModeTable>,
        detector: Arc<OnlineDetector>,
        config: FailureModeServiceConfig,
        clock: C,
    ) -> Result<Self> {
        config.search_retry.validate().map_err(|e| AmfeError::Config(e.to_string()))?;
        config.suggestion_retry.validate().map_err(|e| AmfeError::Config(e.to_string()))?;
        let limiter =
            FixedWindowRateLimiter::with_clock(config.rate_limit, clock.clone()).map_err(AmfeError::Config)?;

        Ok(Self {
            remote,
            local: None,
            detector,
            limiter,
            cache: TtlCell::with_clock(config.cache_ttl, clock),
            search_retry: config.search_retry,
            suggestion_retry: config.suggestion_retry,
        })
    }

    /// Attach a persistent local store for offline fallback
    pub fn with_local_store(mut self, store: Arc<dyn LocalRecordStore>) -> Self {
        self.local = Some(store);
        self
    }

    /// Connectivity state shared with the service
    pub fn detector(&self) -> &Arc<OnlineDetector> {
        &self.detector
    }

    /// Rate limiter guarding searches and autocomplete
    pub fn rate_limiter(&self) -> &FixedWindowRateLimiter<C> {
        &self.limiter
    }

    /* ---------------------------------------------------------------------- */
    /* Search */
    /* ---------------------------------------------------------------------- */

    /// Search the library with optional text, category and paging
    ///
    /// # Errors
    /// - `RateLimitExceeded` when the identical search ran too often
    /// - `SearchUnavailable` when transient failures exhausted all retries and
    ///   no offline fallback applied
    /// - `PermanentRemote` when the backend rejected the query
    /// - storage errors when offline and the local store fails
    #[instrument(skip(self), fields(search = ?params.search, category = ?params.category))]
    pub async fn search_failure_modes(
        &self,
        params: &FailureModeSearchParams,
    ) -> Result<Vec<FailureMode>> {
        let identifier = format!(
            "{}{}",
            SEARCH_RATE_LIMIT_PREFIX,
            serde_json::to_string(params).unwrap_or_default()
        );
        self.check_rate_limit(&identifier)?;

        if let Some(local) = self.offline_store() {
            info!("Using offline storage for failure modes search");
            return local.search_failure_modes(params).await;
        }

        let query = FailureModeQuery::from_search_params(params);
        let result = RetryExecutor::with_policy(self.search_retry.clone(), RemoteFailurePolicy)
            .execute(|| self.remote.select(&query))
            .await;

        match result {
            Ok(records) => {
                self.persist_opportunistically(&records).await;
                Ok(records)
            }
            Err(failure) => {
                if let Some(local) = self.offline_store() {
                    info!("Online search failed, falling back to offline storage");
                    match local.search_failure_modes(params).await {
                        Ok(records) => return Ok(records),
                        Err(offline_err) => {
                            error!(error = %offline_err, detail = offline_err.storage_detail(), "Offline fallback also failed");
                        }
                    }
                }

                if failure.is_transient() {
                    error!(error = %failure, "Search failed after retries");
                    Err(AmfeError::SearchUnavailable)
                } else {
                    error!(error = %failure, "Error in search_failure_modes");
                    Err(AmfeError::remote("Failed to search failure modes", failure))
                }
            }
        }
    }

    /// Autocomplete suggestions for `query`
    ///
    /// A blank query returns the first `limit` records of a full search.
    /// Never fails; errors degrade to local results or an empty list.
    #[instrument(skip(self))]
    pub async fn get_failure_mode_suggestions(&self, query: &str, limit: usize) -> Vec<FailureMode> {
        let result = if query.trim().is_empty() {
            self.search_failure_modes(&FailureModeSearchParams::default().with_limit(limit)).await
        } else {
            self.remote_suggestions(query, limit).await
        };

        match result {
            Ok(records) => records,
            Err(err) => {
                if let Some(local) = self.local_store() {
                    debug!("Autocomplete falling back to offline storage");
                    let params = FailureModeSearchParams::default().with_search(query).with_limit(limit);
                    match local.search_failure_modes(&params).await {
                        Ok(records) => return records,
                        Err(offline_err) => {
                            error!(error = %offline_err, detail = offline_err.storage_detail(), "Offline autocomplete fallback failed");
                        }
                    }
                }
                error!(error = %err, "Error in get_failure_mode_suggestions");
                Vec::new()
            }
        }
    }

    async fn remote_suggestions(&self, query: &str, limit: usize) -> Result<Vec<FailureMode>> {
        let identifier = format!("{}{}", AUTOCOMPLETE_RATE_LIMIT_PREFIX, query);
        if !self.limiter.is_allowed(&identifier) {
            if let Some(local) = self.local_store() {
                debug!("Autocomplete rate limited, serving from offline storage");
                let params = FailureModeSearchParams::default().with_search(query).with_limit(limit);
                return local.search_failure_modes(&params).await;
            }
        }

        let remote_query = FailureModeQuery::default()
            .with_pattern(query)
            .ordered_by(FailureModeOrder::Mode)
            .with_limit(limit);
        RetryExecutor::with_policy(self.suggestion_retry.clone(), RemoteFailurePolicy)
            .execute(|| self.remote.select(&remote_query))
            .await
            .map_err(|failure| AmfeError::remote("Failed to fetch suggestions", failure))
    }

    /* ---------------------------------------------------------------------- */
    /* Auxiliary reads */
    /* ---------------------------------------------------------------------- */

    /// Records in `category`, ordered by mode
    pub async fn get_failure_modes_by_category(&self, category: &str) -> Result<Vec<FailureMode>> {
        if let Some(cached) = self.cache.get() {
            return Ok(cached.into_iter().filter(|fm| fm.category == category).collect());
        }

        let query = FailureModeQuery::default()
            .with_category(category)
            .ordered_by(FailureModeOrder::Mode);
        self.remote.select(&query).await.map_err(|failure| {
            error!(error = %failure, category, "Error fetching failure modes by category");
            AmfeError::remote("Failed to fetch failure modes by category", failure)
        })
    }

    /// Sorted distinct categories
    pub async fn get_failure_mode_categories(&self) -> Result<Vec<String>> {
        if let Some(cached) = self.cache.get() {
            return Ok(distinct_sorted_categories(cached.iter().map(|fm| fm.category.as_str())));
        }

        let categories = self.remote.select_categories().await.map_err(|failure| {
            error!(error = %failure, "Error fetching failure mode categories");
            AmfeError::remote("Failed to fetch failure mode categories", failure)
        })?;
        Ok(distinct_sorted_categories(categories.iter().map(String::as_str)))
    }

    /// One record by id; `None` when it does not exist
    pub async fn get_failure_mode_by_id(&self, id: &str) -> Result<Option<FailureMode>> {
        if let Some(found) = self.cache.get().and_then(|cached| cached.into_iter().find(|fm| fm.id == id)) {
            return Ok(Some(found));
        }

        match self.remote.select_by_id(id).await {
            Ok(record) => Ok(Some(record)),
            Err(failure) if failure.is_not_found() => Ok(None),
            Err(failure) => {
                error!(error = %failure, id, "Error fetching failure mode by ID");
                Err(AmfeError::remote("Failed to fetch failure mode", failure))
            }
        }
    }

    /// The whole library ordered by category then mode; refreshes the cache
    pub async fn get_all_failure_modes(&self) -> Result<Vec<FailureMode>> {
        fetch_all_into_cache(self.remote.as_ref(), &self.cache).await
    }

    /// Records carrying at least one of `tags`
    pub async fn get_failure_modes_by_tags(&self, tags: &[String]) -> Result<Vec<FailureMode>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let query = FailureModeQuery::default().with_any_tags(tags.to_vec());
        self.remote.select(&query).await.map_err(|failure| {
            error!(error = %failure, ?tags, "Error fetching failure modes by tags");
            AmfeError::remote("Failed to fetch failure modes by tags", failure)
        })
    }

    /// Insert a user-defined failure mode tagged `Custom`
    #[instrument(skip(self, record), fields(category = %record.category, mode = %record.mode))]
    pub async fn add_custom_failure_mode(&self, record: &NewFailureMode) -> Result<FailureMode> {
        let inserted = self.remote.insert(&record.tagged_custom()).await.map_err(|failure| {
            error!(error = %failure, "Error adding custom failure mode");
            AmfeError::remote("Failed to add custom failure mode", failure)
        })?;

        self.invalidate_cache();
        info!(id = %inserted.id, "Custom failure mode added");
        Ok(inserted)
    }

    /// Drop the in-memory copy of the library
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Counts over the whole library
    pub async fn get_failure_mode_stats(&self) -> Result<FailureModeStats> {
        let modes = self.get_all_failure_modes().await?;
        let categories = self.get_failure_mode_categories().await?;

        let mut modes_by_category = BTreeMap::new();
        for mode in &modes {
            *modes_by_category.entry(mode.category.clone()).or_insert(0) += 1;
        }

        Ok(FailureModeStats {
            total_modes: modes.len(),
            total_categories: categories.len(),
            modes_by_category,
        })
    }

    /* ---------------------------------------------------------------------- */
    /* Offline support */
    /* ---------------------------------------------------------------------- */

    /// Open the local store, warm the cache and schedule a local refresh for
    /// when connectivity is available
    ///
    /// Failures are logged, never returned. The returned handle belongs to
    /// the scheduled refresh; abort it to cancel.
    #[instrument(skip(self))]
    pub async fn preload_failure_modes(&self) -> Option<JoinHandle<()>> {
        if let Some(local) = self.local_store() {
            if let Err(err) = local.init().await {
                warn!(error = %err, "Failed to preload failure modes");
                return None;
            }
        }

        if !self.cache.is_valid() {
            if let Err(err) = self.get_all_failure_modes().await {
                warn!(error = %err, "Failed to preload failure modes");
                return None;
            }
        }

        let local = Arc::clone(self.local_store()?);
        let remote = Arc::clone(&self.remote);
        let cache = self.cache.clone();
        Some(self.detector.sync_when_online(move || async move {
            let modes = fetch_all_into_cache(remote.as_ref(), &cache).await?;
            local.store_failure_modes(&modes).await
        }))
    }

    /// Offline and able to serve from the local store
    pub fn is_offline_mode(&self) -> bool {
        self.offline_store().is_some()
    }

    /// Local store status for display
    pub async fn get_offline_info(&self) -> OfflineInfo {
        let Some(local) = self.local_store() else {
            return OfflineInfo::unsupported();
        };
        let enabled = !self.detector.is_online();

        let snapshot: Result<(usize, Option<DateTime<Utc>>)> = async {
            local.init().await?;
            let count = local.count().await?;
            let last_sync = local.last_sync().await?;
            Ok((count, last_sync))
        }
        .await;

        match snapshot {
            Ok((count, last_sync)) => OfflineInfo {
                supported: true,
                enabled,
                cached_count: Some(count),
                last_sync,
            },
            Err(err) => {
                warn!(error = %err, detail = err.storage_detail(), "Failed to get offline info");
                OfflineInfo::unavailable()
            }
        }
    }

    /* ---------------------------------------------------------------------- */
    /* Helpers */
    /* ---------------------------------------------------------------------- */

    fn check_rate_limit(&self, identifier: &str) -> Result<()> {
        if self.limiter.is_allowed(identifier) {
            return Ok(());
        }
        let remaining = self.limiter.remaining_requests(identifier);
        let reset_at: DateTime<Utc> = self.limiter.reset_at(identifier).into();
        warn!(identifier, remaining, %reset_at, "Rate limit exceeded");
        Err(AmfeError::RateLimitExceeded { remaining, reset_at })
    }

    /// Local store, if attached and usable on this platform
    fn local_store(&self) -> Option<&Arc<dyn LocalRecordStore>> {
        self.local.as_ref().filter(|store| store.is_supported())
    }

    /// Local store, only while offline
    fn offline_store(&self) -> Option<&Arc<dyn LocalRecordStore>> {
        if self.detector.is_online() {
            None
        } else {
            self.local_store()
        }
    }

    async fn persist_opportunistically(&self, records: &[FailureMode]) {
        if let Some(local) = self.local_store() {
            if let Err(err) = local.store_failure_modes(records).await {
                warn!(error = %err, detail = err.storage_detail(), "Failed to cache results offline");
            }
        }
    }
}

async fn fetch_all_into_cache<C: Clock>(
    remote: &dyn FailureModeTable,
    cache: &TtlCell<Vec<FailureMode>, C>,
) -> Result<Vec<FailureMode>> {
    if let Some(cached) = cache.get() {
        return Ok(cached);
    }

    let records = remote.select(&FailureModeQuery::default()).await.map_err(|failure| {
        error!(error = %failure, "Error fetching all failure modes");
        AmfeError::remote("Failed to fetch failure modes", failure)
    })?;
    cache.set(records.clone());
    Ok(records)
}
