//! Failure-mode records as stored in the remote library

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::CUSTOM_TAG;

/// A catalogued way in which a component or process can fail
///
/// Field names match the remote table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMode {
    pub id: String,
    pub category: String,
    pub mode: String,
    #[serde(default)]
    pub common_causes: Vec<String>,
    pub severity_default: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FailureMode {
    /// Case-insensitive substring match on `mode` or any tag
    ///
    /// `needle_lower` must already be lowercased.
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        self.mode.to_lowercase().contains(needle_lower)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle_lower))
    }

    /// Whether the record carries `tag` exactly
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Payload for inserting a failure mode; the server assigns id and timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFailureMode {
    pub category: String,
    pub mode: String,
    #[serde(default)]
    pub common_causes: Vec<String>,
    pub severity_default: i32,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewFailureMode {
    /// Copy with the `Custom` tag appended
    ///
    /// The tag is appended even when already present.
    pub fn tagged_custom(&self) -> Self {
        let mut tags = self.tags.clone();
        tags.push(CUSTOM_TAG.to_string());
        Self { tags, ..self.clone() }
    }
}

/// Optional filters and paging for failure-mode searches
///
/// Serialized as JSON to build rate-limit identifiers, so field order is part
/// of the identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureModeSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl FailureModeSearchParams {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Search text if present and non-empty
    ///
    /// Whitespace is significant: `" "` searches for a space.
    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    /// Category filter if present and non-empty
    pub fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }

    /// Page size; zero counts as absent
    pub fn page_limit(&self) -> Option<usize> {
        self.limit.filter(|l| *l > 0)
    }

    /// Page start; zero counts as absent
    pub fn page_offset(&self) -> Option<usize> {
        self.offset.filter(|o| *o > 0)
    }
}
