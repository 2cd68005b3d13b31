//! Remote query description

use amfe_domain::constants::DEFAULT_PAGE_SIZE;
use amfe_domain::{impl_domain_status_conversions, FailureModeSearchParams};

/// Row ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureModeOrder {
    /// `category` ascending, then `mode` ascending
    #[default]
    CategoryThenMode,
    /// `mode` ascending
    Mode,
}

impl_domain_status_conversions!(FailureModeOrder {
    CategoryThenMode => "category_then_mode",
    Mode => "mode",
});

/// Filters, ordering and paging for a remote select
///
/// `pattern` matches `mode` case-insensitively as a substring OR `tags`
/// containing it exactly. `any_tags` matches rows containing at least one of
/// the tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureModeQuery {
    pub category: Option<String>,
    pub pattern: Option<String>,
    pub any_tags: Vec<String>,
    pub order: FailureModeOrder,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl FailureModeQuery {
    /// Query for a full search
    ///
    /// An offset without a limit pages by [`DEFAULT_PAGE_SIZE`].
    pub fn from_search_params(params: &FailureModeSearchParams) -> Self {
        let offset = params.page_offset();
        let limit = match (params.page_limit(), offset) {
            (Some(limit), _) => Some(limit),
            (None, Some(_)) => Some(DEFAULT_PAGE_SIZE),
            (None, None) => None,
        };
        Self {
            category: params.category_filter().map(str::to_string),
            pattern: params.search_text().map(str::to_string),
            any_tags: Vec::new(),
            order: FailureModeOrder::CategoryThenMode,
            limit,
            offset,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_any_tags(mut self, tags: Vec<String>) -> Self {
        self.any_tags = tags;
        self
    }

    pub fn ordered_by(mut self, order: FailureModeOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
