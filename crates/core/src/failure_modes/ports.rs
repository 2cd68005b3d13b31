//! Port interfaces for the failure-mode library
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use amfe_domain::{FailureMode, FailureModeSearchParams, NewFailureMode, RemoteFailure, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::query::FailureModeQuery;
use super::search::{apply_search_params, distinct_sorted_categories};

/// Result of a remote table call
pub type RemoteResult<T> = std::result::Result<T, RemoteFailure>;

/// Remote failure-mode table
///
/// Implementations report failures as [`RemoteFailure`] without deciding
/// whether they are retryable; classification happens in the service.
#[async_trait]
pub trait FailureModeTable: Send + Sync {
    /// Rows matching `query`, in the requested order
    async fn select(&self, query: &FailureModeQuery) -> RemoteResult<Vec<FailureMode>>;

    /// Single row by id; a missing row surfaces as a not-found failure
    async fn select_by_id(&self, id: &str) -> RemoteResult<FailureMode>;

    /// The `category` column of every row, ordered, duplicates included
    async fn select_categories(&self) -> RemoteResult<Vec<String>>;

    /// Insert a row and return it as stored
    async fn insert(&self, record: &NewFailureMode) -> RemoteResult<FailureMode>;
}

/// Persistent local copy of the failure-mode library
///
/// Every operation opens the store on first use. Search and category listing
/// default to loading everything and filtering in memory.
#[async_trait]
pub trait LocalRecordStore: Send + Sync {
    /// Whether this platform can host the store at all
    fn is_supported(&self) -> bool;

    /// Open the store and create its schema; idempotent
    async fn init(&self) -> Result<()>;

    /// Replace the whole stored collection with `records`
    async fn store_failure_modes(&self, records: &[FailureMode]) -> Result<()>;

    /// Every stored record
    async fn get_failure_modes(&self) -> Result<Vec<FailureMode>>;

    /// Filter, sort and page the stored records
    async fn search_failure_modes(
        &self,
        params: &FailureModeSearchParams,
    ) -> Result<Vec<FailureMode>> {
        let records = self.get_failure_modes().await?;
        Ok(apply_search_params(records, params))
    }

    /// Sorted distinct categories of the stored records
    async fn get_failure_mode_categories(&self) -> Result<Vec<String>> {
        let records = self.get_failure_modes().await?;
        Ok(distinct_sorted_categories(records.iter().map(|fm| fm.category.as_str())))
    }

    /// Remove every stored record
    async fn clear_cache(&self) -> Result<()>;

    /// Number of stored records
    async fn count(&self) -> Result<usize> {
        Ok(self.get_failure_modes().await?.len())
    }

    /// When the stored collection was last replaced
    async fn last_sync(&self) -> Result<Option<DateTime<Utc>>>;
}
