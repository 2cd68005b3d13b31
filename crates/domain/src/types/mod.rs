//! Domain types and models

pub mod amfe;
pub mod failure_mode;
pub mod stats;

pub use amfe::{
    calculate_npr, ActionStatus, Amfe, AmfeItem, AmfeItemPatch, AmfeItemWithActions, AmfePatch,
    AmfeRecord, AmfeStatus, AmfeType, CompleteAmfe, CorrectiveAction, CorrectiveActionPatch,
    CorrectiveActionWithEvidence, Evidence, EvidencePatch, Metadata, NewAmfe, NewAmfeItem,
    NewCorrectiveAction, NewEvidence, RiskLevel,
};
pub use failure_mode::{FailureMode, FailureModeSearchParams, NewFailureMode};
pub use stats::{FailureModeStats, OfflineInfo};
