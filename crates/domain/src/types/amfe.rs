//! AMFE analyses and the records hanging off them
//!
//! An [`Amfe`] owns [`AmfeItem`]s, each item owns [`CorrectiveAction`]s and
//! each action owns [`Evidence`]. Every record type names its remote table
//! and parent column through [`AmfeRecord`], so one generic table client
//! serves all four.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{
    AMFES_TABLE, AMFE_ITEMS_TABLE, CORRECTIVE_ACTIONS_TABLE, EVIDENCE_TABLE, NPR_HIGH_THRESHOLD,
    NPR_MEDIUM_THRESHOLD,
};
use crate::errors::AmfeError;
use crate::impl_domain_status_conversions;

/// Free-form JSON object attached to every record
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A record type stored in its own remote table
pub trait AmfeRecord: DeserializeOwned + Send + Sync + 'static {
    /// Insert payload; the server assigns id and timestamps
    type New: Serialize + Send + Sync;
    /// Partial update; absent fields are left untouched
    type Patch: Serialize + Send + Sync;

    /// Remote table name
    const TABLE: &'static str;
    /// Column linking a row to its parent, if the record has one
    const PARENT_COLUMN: Option<&'static str>;
    /// PostgREST `order` expression used for listings
    const ORDER: &'static str;
    /// Human-readable name for log lines and messages
    const LABEL: &'static str;

    fn id(&self) -> &str;
}

/// Analysis flavour: design or process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AmfeType {
    Dfmea,
    Pfmea,
}

impl_domain_status_conversions!(AmfeType {
    Dfmea => "DFMEA",
    Pfmea => "PFMEA",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmfeStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Archived,
}

impl_domain_status_conversions!(AmfeStatus {
    Draft => "draft",
    InProgress => "in_progress",
    Completed => "completed",
    Archived => "archived",
});

/// Risk band derived from the risk priority number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl_domain_status_conversions!(RiskLevel {
    Low => "Low",
    Medium => "Medium",
    High => "High",
});

impl RiskLevel {
    /// Band for a risk priority number: 100 and above is high, 50 and above medium
    pub fn from_npr(npr: i32) -> Self {
        if npr >= NPR_HIGH_THRESHOLD {
            Self::High
        } else if npr >= NPR_MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Risk priority number: severity × occurrence × detection
pub fn calculate_npr(severity: i32, occurrence: i32, detection: i32) -> i32 {
    severity.saturating_mul(occurrence).saturating_mul(detection)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl_domain_status_conversions!(ActionStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// A failure mode and effects analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amfe {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub amfe_type: AmfeType,
    pub status: AmfeStatus,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New analyses always start as drafts; the owner is set server-side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAmfe {
    pub name: String,
    #[serde(rename = "type")]
    pub amfe_type: AmfeType,
    #[serde(default)]
    pub status: AmfeStatus,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewAmfe {
    pub fn new(name: impl Into<String>, amfe_type: AmfeType) -> Self {
        Self {
            name: name.into(),
            amfe_type,
            status: AmfeStatus::Draft,
            description: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), AmfeError> {
        if self.name.trim().is_empty() {
            return Err(AmfeError::InvalidInput("AMFE name must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmfePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub amfe_type: Option<AmfeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AmfeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AmfeRecord for Amfe {
    type New = NewAmfe;
    type Patch = AmfePatch;

    const TABLE: &'static str = AMFES_TABLE;
    const PARENT_COLUMN: Option<&'static str> = None;
    const ORDER: &'static str = "updated_at.desc";
    const LABEL: &'static str = "AMFE";

    fn id(&self) -> &str {
        &self.id
    }
}

/// One analysed failure within an AMFE
///
/// `npr` and `risk_level` are computed by the backend from the three ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmfeItem {
    pub id: String,
    pub amfe_id: String,
    pub failure_mode_id: Option<String>,
    pub process_step: Option<String>,
    pub function: Option<String>,
    pub failure_mode: String,
    pub failure_effects: Option<String>,
    pub severity: i32,
    pub occurrence: i32,
    pub detection: i32,
    pub npr: i32,
    pub risk_level: RiskLevel,
    pub current_controls: Option<String>,
    pub recommendations: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAmfeItem {
    pub amfe_id: String,
    pub failure_mode_id: Option<String>,
    pub process_step: Option<String>,
    pub function: Option<String>,
    pub failure_mode: String,
    pub failure_effects: Option<String>,
    pub severity: i32,
    pub occurrence: i32,
    pub detection: i32,
    pub current_controls: Option<String>,
    pub recommendations: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewAmfeItem {
    /// Item for `amfe_id` with the three 1-10 ratings and nothing else filled in
    pub fn new(
        amfe_id: impl Into<String>,
        failure_mode: impl Into<String>,
        (severity, occurrence, detection): (i32, i32, i32),
    ) -> Self {
        Self {
            amfe_id: amfe_id.into(),
            failure_mode_id: None,
            process_step: None,
            function: None,
            failure_mode: failure_mode.into(),
            failure_effects: None,
            severity,
            occurrence,
            detection,
            current_controls: None,
            recommendations: None,
            metadata: Metadata::new(),
        }
    }

    /// Item linked to a library failure mode
    pub fn from_failure_mode(mut self, failure_mode_id: impl Into<String>) -> Self {
        self.failure_mode_id = Some(failure_mode_id.into());
        self
    }

    pub fn npr(&self) -> i32 {
        calculate_npr(self.severity, self.occurrence, self.detection)
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_npr(self.npr())
    }

    pub fn validate(&self) -> Result<(), AmfeError> {
        if self.failure_mode.trim().is_empty() {
            return Err(AmfeError::InvalidInput("failure mode must not be empty".into()));
        }
        validate_ratings(Some(self.severity), Some(self.occurrence), Some(self.detection))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmfeItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_effects: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_controls: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AmfeItemPatch {
    pub fn validate(&self) -> Result<(), AmfeError> {
        validate_ratings(self.severity, self.occurrence, self.detection)
    }
}

impl AmfeRecord for AmfeItem {
    type New = NewAmfeItem;
    type Patch = AmfeItemPatch;

    const TABLE: &'static str = AMFE_ITEMS_TABLE;
    const PARENT_COLUMN: Option<&'static str> = Some("amfe_id");
    const ORDER: &'static str = "created_at.asc";
    const LABEL: &'static str = "AMFE item";

    fn id(&self) -> &str {
        &self.id
    }
}

fn validate_ratings(
    severity: Option<i32>,
    occurrence: Option<i32>,
    detection: Option<i32>,
) -> Result<(), AmfeError> {
    let ratings = [("severity", severity), ("occurrence", occurrence), ("detection", detection)];
    for (name, value) in ratings {
        if let Some(value) = value.filter(|v| !(1..=10).contains(v)) {
            return Err(AmfeError::InvalidInput(format!("{name} must be between 1 and 10, got {value}")));
        }
    }
    Ok(())
}

/// Mitigation planned against an AMFE item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveAction {
    pub id: String,
    pub amfe_item_id: String,
    pub action_text: String,
    pub responsible_party: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: ActionStatus,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
    pub effectiveness: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New actions start pending, with no actual cost or effectiveness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCorrectiveAction {
    pub amfe_item_id: String,
    pub action_text: String,
    pub responsible_party: Option<String>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: ActionStatus,
    pub estimated_cost: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl NewCorrectiveAction {
    pub fn new(amfe_item_id: impl Into<String>, action_text: impl Into<String>) -> Self {
        Self {
            amfe_item_id: amfe_item_id.into(),
            action_text: action_text.into(),
            responsible_party: None,
            due_date: None,
            status: ActionStatus::Pending,
            estimated_cost: None,
            notes: None,
            metadata: Metadata::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveActionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_party: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effectiveness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AmfeRecord for CorrectiveAction {
    type New = NewCorrectiveAction;
    type Patch = CorrectiveActionPatch;

    const TABLE: &'static str = CORRECTIVE_ACTIONS_TABLE;
    const PARENT_COLUMN: Option<&'static str> = Some("amfe_item_id");
    const ORDER: &'static str = "created_at.asc";
    const LABEL: &'static str = "corrective action";

    fn id(&self) -> &str {
        &self.id
    }
}

/// File uploaded as proof that a corrective action was carried out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: String,
    pub corrective_action_id: Option<String>,
    pub file_name: String,
    pub file_path: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub uploaded_by: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvidence {
    pub corrective_action_id: Option<String>,
    pub file_name: String,
    pub file_path: String,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Evidence files are immutable; only the annotation can change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl AmfeRecord for Evidence {
    type New = NewEvidence;
    type Patch = EvidencePatch;

    const TABLE: &'static str = EVIDENCE_TABLE;
    const PARENT_COLUMN: Option<&'static str> = Some("corrective_action_id");
    const ORDER: &'static str = "created_at.asc";
    const LABEL: &'static str = "evidence";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Corrective action together with its evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectiveActionWithEvidence {
    #[serde(flatten)]
    pub action: CorrectiveAction,
    pub evidence: Vec<Evidence>,
}

/// AMFE item together with its corrective actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmfeItemWithActions {
    #[serde(flatten)]
    pub item: AmfeItem,
    pub corrective_actions: Vec<CorrectiveActionWithEvidence>,
}

/// An AMFE with its whole record tree loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteAmfe {
    pub amfe: Amfe,
    pub items: Vec<AmfeItemWithActions>,
}

impl CompleteAmfe {
    /// Item with the highest risk priority number
    pub fn highest_risk_item(&self) -> Option<&AmfeItem> {
        self.items.iter().map(|entry| &entry.item).max_by_key(|item| item.npr)
    }

    /// Corrective actions that are neither completed nor cancelled
    pub fn open_action_count(&self) -> usize {
        self.items
            .iter()
            .flat_map(|entry| &entry.corrective_actions)
            .filter(|entry| {
                matches!(entry.action.status, ActionStatus::Pending | ActionStatus::InProgress)
            })
            .count()
    }
}
