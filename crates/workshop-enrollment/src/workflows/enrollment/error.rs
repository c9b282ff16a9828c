use std::time::Duration;

use super::domain::{DocumentStatus, RequirementId, SlotId};
use super::session::Phase;

/// Typed outcome for every refused enrollment intent. None of these are fatal;
/// the session stays usable after any of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrollmentError {
    #[error("file rejected: {0}")]
    InvalidFile(FileRejection),
    #[error("cannot proceed: {0}")]
    PhaseGuardViolation(GuardFailure),
    #[error("document '{requirement}' cannot move from {from} to {to}")]
    InvalidTransition {
        requirement: RequirementId,
        from: DocumentStatus,
        to: DocumentStatus,
    },
    #[error("submission rejected ({reason_code}): {detail}")]
    SubmissionRejected { reason_code: String, detail: String },
    #[error("submission received no decision within {after:?}")]
    SubmissionTimedOut { after: Duration },
    #[error("unknown document requirement '{0}'")]
    UnknownRequirement(RequirementId),
    #[error("unknown slot '{0}'")]
    UnknownSlot(SlotId),
}

impl EnrollmentError {
    /// Stable machine-readable code for presentation adapters.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidFile(_) => "invalid_file",
            Self::PhaseGuardViolation(_) => "phase_guard_violation",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::SubmissionRejected { .. } => "submission_rejected",
            Self::SubmissionTimedOut { .. } => "submission_timed_out",
            Self::UnknownRequirement(_) => "unknown_requirement",
            Self::UnknownSlot(_) => "unknown_slot",
        }
    }
}

impl From<GuardFailure> for EnrollmentError {
    fn from(value: GuardFailure) -> Self {
        Self::PhaseGuardViolation(value)
    }
}

impl From<FileRejection> for EnrollmentError {
    fn from(value: FileRejection) -> Self {
        Self::InvalidFile(value)
    }
}

/// Unmet precondition of a phase transition or phase-scoped intent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardFailure {
    #[error("only allowed during {expected}, session is at {actual}")]
    WrongPhase { expected: Phase, actual: Phase },
    #[error("no slot has been selected")]
    NoSlotSelected,
    #[error("slot '{0}' has no remaining places")]
    SlotUnavailable(SlotId),
    #[error("a required document is missing, expired or invalid")]
    DocumentsIncomplete,
    #[error("participation terms have not been accepted")]
    TermsNotAccepted,
    #[error("confirmation is the last step")]
    NoFurtherPhase,
    #[error("a submission is still awaiting a decision")]
    SubmissionInFlight,
}

/// Reason a file was refused at attach time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileRejection {
    #[error("media type '{0}' is not accepted (PDF, JPEG or PNG only)")]
    UnsupportedMediaType(String),
    #[error("file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}
