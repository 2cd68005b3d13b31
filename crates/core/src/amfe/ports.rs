//! Port interface for the AMFE record tables

use amfe_domain::AmfeRecord;
use async_trait::async_trait;

use crate::failure_modes::ports::RemoteResult;

/// Remote table holding records of type `R`
///
/// Like [`FailureModeTable`](crate::FailureModeTable), implementations
/// report raw [`RemoteFailure`](amfe_domain::RemoteFailure)s and leave
/// classification to the service.
#[async_trait]
pub trait RecordTable<R: AmfeRecord>: Send + Sync {
    /// Rows in `R::ORDER`, limited to children of `parent_id` when given
    async fn list(&self, parent_id: Option<&str>) -> RemoteResult<Vec<R>>;

    /// Single row by id; a missing row surfaces as a not-found failure
    async fn get(&self, id: &str) -> RemoteResult<R>;

    /// Insert a row and return it as stored
    async fn insert(&self, record: &R::New) -> RemoteResult<R>;

    /// Apply `patch` to the row and return it as stored
    ///
    /// Implementations stamp `updated_at`. A missing row surfaces as a
    /// not-found failure.
    async fn update(&self, id: &str, patch: &R::Patch) -> RemoteResult<R>;

    /// Delete the row; deleting a missing row is not an error
    async fn delete(&self, id: &str) -> RemoteResult<()>;
}
