//! AMFE record service
//!
//! Reads are retried on transient backend failures; writes are sent once,
//! since an insert whose response was lost may already have been applied.
//! Failures come back as short user-safe messages with the backend detail
//! logged.

use std::sync::Arc;

use amfe_common::resilience::{RetryExecutor, RetryOptions};
use amfe_domain::{
    Amfe, AmfeError, AmfeItem, AmfeItemPatch, AmfeItemWithActions, AmfePatch, AmfeRecord,
    CompleteAmfe, CorrectiveAction, CorrectiveActionPatch, CorrectiveActionWithEvidence, Evidence,
    EvidencePatch, NewAmfe, NewAmfeItem, NewCorrectiveAction, NewEvidence, Result,
};
use tracing::{debug, error, info, instrument};

use super::ports::RecordTable;
use crate::failure_modes::retry::RemoteFailurePolicy;

/// The four record tables an [`AmfeService`] works against
#[derive(Clone)]
pub struct AmfeTables {
    pub amfes: Arc<dyn RecordTable<Amfe>>,
    pub items: Arc<dyn RecordTable<AmfeItem>>,
    pub actions: Arc<dyn RecordTable<CorrectiveAction>>,
    pub evidence: Arc<dyn RecordTable<Evidence>>,
}

/// CRUD over AMFE analyses, items, corrective actions and evidence
pub struct AmfeService {
    tables: AmfeTables,
    read_retry: RetryOptions,
}

impl AmfeService {
    /// Service retrying reads with the search profile
    pub fn new(tables: AmfeTables) -> Self {
        Self::with_read_retry(tables, RetryOptions::search())
    }

    pub fn with_read_retry(tables: AmfeTables, read_retry: RetryOptions) -> Self {
        Self { tables, read_retry }
    }

    /* ---------------------------------------------------------------------- */
    /* Analyses                                                               */
    /* ---------------------------------------------------------------------- */

    /// Every analysis, most recently updated first
    pub async fn list_amfes(&self) -> Result<Vec<Amfe>> {
        self.list(self.tables.amfes.as_ref(), None).await
    }

    /// One analysis; `None` when it does not exist
    pub async fn get_amfe(&self, id: &str) -> Result<Option<Amfe>> {
        self.get(self.tables.amfes.as_ref(), id).await
    }

    /// Create a draft analysis
    #[instrument(skip(self, record), fields(name = %record.name, amfe_type = %record.amfe_type))]
    pub async fn create_amfe(&self, record: &NewAmfe) -> Result<Amfe> {
        record.validate()?;
        insert(self.tables.amfes.as_ref(), record).await
    }

    pub async fn update_amfe(&self, id: &str, patch: &AmfePatch) -> Result<Amfe> {
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AmfeError::InvalidInput("AMFE name must not be empty".into()));
        }
        update(self.tables.amfes.as_ref(), id, patch).await
    }

    /// Delete an analysis; the backend cascades to its items
    pub async fn delete_amfe(&self, id: &str) -> Result<()> {
        delete(self.tables.amfes.as_ref(), id).await
    }

    /* ---------------------------------------------------------------------- */
    /* Items                                                                  */
    /* ---------------------------------------------------------------------- */

    /// Items of `amfe_id` in creation order
    pub async fn get_amfe_items(&self, amfe_id: &str) -> Result<Vec<AmfeItem>> {
        require_id(amfe_id)?;
        self.list(self.tables.items.as_ref(), Some(amfe_id)).await
    }

    /// Add an item; ratings must lie in 1..=10
    pub async fn create_amfe_item(&self, record: &NewAmfeItem) -> Result<AmfeItem> {
        record.validate()?;
        require_id(&record.amfe_id)?;
        let created = insert(self.tables.items.as_ref(), record).await?;
        debug!(id = %created.id, npr = created.npr, risk = %created.risk_level, "AMFE item rated");
        Ok(created)
    }

    pub async fn update_amfe_item(&self, id: &str, patch: &AmfeItemPatch) -> Result<AmfeItem> {
        patch.validate()?;
        update(self.tables.items.as_ref(), id, patch).await
    }

    pub async fn delete_amfe_item(&self, id: &str) -> Result<()> {
        delete(self.tables.items.as_ref(), id).await
    }

    /* ---------------------------------------------------------------------- */
    /* Corrective actions                                                     */
    /* ---------------------------------------------------------------------- */

    pub async fn get_corrective_actions(&self, amfe_item_id: &str) -> Result<Vec<CorrectiveAction>> {
        require_id(amfe_item_id)?;
        self.list(self.tables.actions.as_ref(), Some(amfe_item_id)).await
    }

    /// Add a pending action to an item
    pub async fn create_corrective_action(
        &self,
        record: &NewCorrectiveAction,
    ) -> Result<CorrectiveAction> {
        require_id(&record.amfe_item_id)?;
        if record.action_text.trim().is_empty() {
            return Err(AmfeError::InvalidInput("action text must not be empty".into()));
        }
        insert(self.tables.actions.as_ref(), record).await
    }

    pub async fn update_corrective_action(
        &self,
        id: &str,
        patch: &CorrectiveActionPatch,
    ) -> Result<CorrectiveAction> {
        update(self.tables.actions.as_ref(), id, patch).await
    }

    pub async fn delete_corrective_action(&self, id: &str) -> Result<()> {
        delete(self.tables.actions.as_ref(), id).await
    }

    /* ---------------------------------------------------------------------- */
    /* Evidence                                                               */
    /* ---------------------------------------------------------------------- */

    pub async fn get_evidence(&self, corrective_action_id: &str) -> Result<Vec<Evidence>> {
        require_id(corrective_action_id)?;
        self.list(self.tables.evidence.as_ref(), Some(corrective_action_id)).await
    }

    /// Record an uploaded file; the uploader is set server-side
    pub async fn create_evidence(&self, record: &NewEvidence) -> Result<Evidence> {
        if record.file_name.trim().is_empty() || record.file_path.trim().is_empty() {
            return Err(AmfeError::InvalidInput("evidence needs a file name and path".into()));
        }
        insert(self.tables.evidence.as_ref(), record).await
    }

    pub async fn update_evidence(&self, id: &str, patch: &EvidencePatch) -> Result<Evidence> {
        update(self.tables.evidence.as_ref(), id, patch).await
    }

    pub async fn delete_evidence(&self, id: &str) -> Result<()> {
        delete(self.tables.evidence.as_ref(), id).await
    }

    /* ---------------------------------------------------------------------- */
    /* Whole analyses                                                         */
    /* ---------------------------------------------------------------------- */

    /// The analysis with every item, action and piece of evidence
    ///
    /// `None` when the analysis does not exist. Children are fetched level by
    /// level in listing order, so the tree keeps the order each table reports.
    #[instrument(skip(self))]
    pub async fn get_complete_amfe(&self, id: &str) -> Result<Option<CompleteAmfe>> {
        let Some(amfe) = self.get_amfe(id).await? else {
            return Ok(None);
        };

        let items = self.get_amfe_items(&amfe.id).await?;
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let actions = self.get_corrective_actions(&item.id).await?;
            let mut corrective_actions = Vec::with_capacity(actions.len());
            for action in actions {
                let evidence = self.get_evidence(&action.id).await?;
                corrective_actions.push(CorrectiveActionWithEvidence { action, evidence });
            }
            entries.push(AmfeItemWithActions { item, corrective_actions });
        }

        debug!(items = entries.len(), "Loaded complete AMFE");
        Ok(Some(CompleteAmfe { amfe, items: entries }))
    }

    /* ---------------------------------------------------------------------- */
    /* Helpers                                                                */
    /* ---------------------------------------------------------------------- */

    async fn list<R: AmfeRecord>(
        &self,
        table: &dyn RecordTable<R>,
        parent_id: Option<&str>,
    ) -> Result<Vec<R>> {
        RetryExecutor::with_policy(self.read_retry.clone(), RemoteFailurePolicy)
            .execute(|| table.list(parent_id))
            .await
            .map_err(|failure| {
                error!(error = %failure, table = R::TABLE, parent_id, "Error listing records");
                AmfeError::remote(format!("Failed to fetch {} records", R::LABEL), failure)
            })
    }

    async fn get<R: AmfeRecord>(&self, table: &dyn RecordTable<R>, id: &str) -> Result<Option<R>> {
        require_id(id)?;
        match RetryExecutor::with_policy(self.read_retry.clone(), RemoteFailurePolicy)
            .execute(|| table.get(id))
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(failure) if failure.is_not_found() => Ok(None),
            Err(failure) => {
                error!(error = %failure, table = R::TABLE, id, "Error fetching record");
                Err(AmfeError::remote(format!("Failed to fetch {}", R::LABEL), failure))
            }
        }
    }
}

async fn insert<R: AmfeRecord>(table: &dyn RecordTable<R>, record: &R::New) -> Result<R> {
    let created = table.insert(record).await.map_err(|failure| {
        error!(error = %failure, table = R::TABLE, "Error creating record");
        AmfeError::remote(format!("Failed to create {}", R::LABEL), failure)
    })?;
    info!(table = R::TABLE, id = created.id(), "Record created");
    Ok(created)
}

async fn update<R: AmfeRecord>(table: &dyn RecordTable<R>, id: &str, patch: &R::Patch) -> Result<R> {
    require_id(id)?;
    match table.update(id, patch).await {
        Ok(updated) => {
            info!(table = R::TABLE, id, "Record updated");
            Ok(updated)
        }
        Err(failure) if failure.is_not_found() => Err(AmfeError::NotFound(format!("{} {id}", R::LABEL))),
        Err(failure) => {
            error!(error = %failure, table = R::TABLE, id, "Error updating record");
            Err(AmfeError::remote(format!("Failed to update {}", R::LABEL), failure))
        }
    }
}

async fn delete<R: AmfeRecord>(table: &dyn RecordTable<R>, id: &str) -> Result<()> {
    require_id(id)?;
    table.delete(id).await.map_err(|failure| {
        error!(error = %failure, table = R::TABLE, id, "Error deleting record");
        AmfeError::remote(format!("Failed to delete {}", R::LABEL), failure)
    })?;
    info!(table = R::TABLE, id, "Record deleted");
    Ok(())
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(AmfeError::InvalidInput("record id must not be empty".into()));
    }
    Ok(())
}
