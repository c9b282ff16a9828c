//! Guided workshop enrollment: catalog browsing, the three-step session state
//! machine, document intake, and hand-off to the review desk.

pub mod blueprint;
pub mod catalog;
pub mod documents;
pub mod domain;
pub mod error;
pub mod registrations;
pub mod router;
pub mod service;
pub mod session;
pub mod submission;
pub mod views;

#[cfg(test)]
mod tests;

pub use blueprint::EnrollmentBlueprint;
pub use catalog::{
    filter, price, price_percent, quote, AgeFilter, CatalogError, CatalogProvider,
    CategoryFilter, DepartmentFilter, FilterCriteria, MissingDataPolicy, PriceQuote,
    StaticCatalog, Verdict,
};
pub use documents::{
    screen_file, AttachedFile, DocumentLedger, DocumentRecord, DossierSummary, MediaType,
    MAX_FILE_SIZE,
};
pub use domain::{
    AgeRange, Category, ChildProfile, ContentHandle, DocumentRequirement, DocumentStatus,
    FileDescriptor, Offering, OfferingId, RequirementId, SessionId, Slot, SlotId,
};
pub use error::{EnrollmentError, FileRejection, GuardFailure};
pub use registrations::{RegistrationRecord, RegistrationStatus, TabCounts};
pub use router::enrollment_router;
pub use service::{EnrollmentService, EnrollmentServiceError};
pub use session::{
    CancelledEnrollment, EnrollmentSession, Phase, ReviewVerdict, SubmissionResolution,
};
pub use submission::{
    SubmissionPackage, SubmissionReceipt, SubmissionRejection, SubmissionSink, SubmittedDocument,
};
pub use views::{DocumentView, ProgressStep, SessionView};
