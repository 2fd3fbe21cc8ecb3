use derive_more::Display;

use crate::model::student::RosterKey;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Everything the capture workflow can fail with. None of these are fatal
/// to the process; each is local to one session.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum WorkflowError {
    #[display(fmt = "student directory unavailable: {}", _0)]
    DirectoryUnavailable(String),

    #[display(fmt = "auto-seed failed for {}: {}", key, reason)]
    SeedFailed { key: RosterKey, reason: String },

    /// The directory stayed empty after this session already seeded the key.
    #[display(fmt = "student directory returned no students for {} after seeding", _0)]
    EmptyAfterSeed(RosterKey),

    #[display(fmt = "attendance submission failed: {}", _0)]
    SubmissionFailed(String),

    #[display(fmt = "selection incomplete: {} is required", _0)]
    SelectionIncomplete(&'static str),

    #[display(fmt = "{} '{}' is not offered", field, value)]
    NotOffered { field: &'static str, value: String },

    #[display(fmt = "no roster loaded for the current selection")]
    RosterNotLoaded,

    #[display(fmt = "roster {} has no students", _0)]
    EmptyRoster(RosterKey),

    #[display(fmt = "{} already in progress", _0)]
    Busy(&'static str),

    #[display(fmt = "session already submitted")]
    SessionClosed,
}

impl std::error::Error for WorkflowError {}

impl WorkflowError {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::DirectoryUnavailable(_) => "directory_unavailable",
            WorkflowError::SeedFailed { .. } => "seed_failed",
            WorkflowError::EmptyAfterSeed(_) => "directory_empty_after_seed",
            WorkflowError::SubmissionFailed(_) => "submission_failed",
            WorkflowError::SelectionIncomplete(_) => "selection_incomplete",
            WorkflowError::NotOffered { .. } => "not_offered",
            WorkflowError::RosterNotLoaded => "roster_not_loaded",
            WorkflowError::EmptyRoster(_) => "empty_roster",
            WorkflowError::Busy(_) => "busy",
            WorkflowError::SessionClosed => "session_closed",
        }
    }

    /// Failures of an external collaborator; the caller may retry as is.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            WorkflowError::DirectoryUnavailable(_)
                | WorkflowError::SeedFailed { .. }
                | WorkflowError::EmptyAfterSeed(_)
                | WorkflowError::SubmissionFailed(_)
        )
    }
}
