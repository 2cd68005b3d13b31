//! Application constants
//!
//! Centralized location for domain-level constants.

/// Remote table holding the failure-mode library
pub const FAILURE_MODES_TABLE: &str = "failure_modes";

// AMFE record tables
pub const AMFES_TABLE: &str = "amfes";
pub const AMFE_ITEMS_TABLE: &str = "amfe_items";
pub const CORRECTIVE_ACTIONS_TABLE: &str = "corrective_actions";
pub const EVIDENCE_TABLE: &str = "evidence";

/// Risk priority number at and above which an item is high risk
pub const NPR_HIGH_THRESHOLD: i32 = 100;

/// Risk priority number at and above which an item is medium risk
pub const NPR_MEDIUM_THRESHOLD: i32 = 50;

/// Tag appended to user-created failure modes
pub const CUSTOM_TAG: &str = "Custom";

/// Backend code for "no rows" on single-row reads
pub const NOT_FOUND_CODE: &str = "PGRST116";

/// Backend code for a gateway/statement timeout
pub const TIMEOUT_CODE: &str = "PGRST301";

/// Page size used when an offset is given without a limit
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default number of autocomplete suggestions
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// Time-to-live of the in-memory failure-mode cache
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Prefix of rate-limit identifiers for full searches
pub const SEARCH_RATE_LIMIT_PREFIX: &str = "search-";

/// Prefix of rate-limit identifiers for autocomplete
pub const AUTOCOMPLETE_RATE_LIMIT_PREFIX: &str = "autocomplete-";

// Local store
pub const LOCAL_DB_NAME: &str = "amfeFailureModesDB";
pub const LOCAL_DB_VERSION: i32 = 1;
pub const LOCAL_DB_FILE: &str = "amfeFailureModesDB.sqlite3";
