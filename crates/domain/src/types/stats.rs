//! Aggregate views over the failure-mode library

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Library-wide counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureModeStats {
    pub total_modes: usize,
    pub total_categories: usize,
    /// Mode count per category, ordered by category
    pub modes_by_category: BTreeMap<String, usize>,
}

/// State of the persistent local store as shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineInfo {
    /// The platform can host a local store
    pub supported: bool,
    /// Reads are currently served from the local store (offline)
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl OfflineInfo {
    /// No local store on this platform
    pub fn unsupported() -> Self {
        Self::default()
    }

    /// Store exists but could not be read
    pub fn unavailable() -> Self {
        Self { supported: true, ..Self::default() }
    }
}
