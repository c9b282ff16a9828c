use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::documents::{AttachedFile, DocumentRecord};
use super::domain::{
    Category, ChildProfile, DocumentStatus, OfferingId, RequirementId, SessionId, Slot,
};
use super::error::EnrollmentError;
use super::registrations::RegistrationStatus;

/// Document entry carried by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedDocument {
    pub requirement_id: RequirementId,
    pub name: String,
    pub status: DocumentStatus,
    pub file: AttachedFile,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl SubmittedDocument {
    pub(crate) fn from_record(record: &DocumentRecord) -> Option<Self> {
        let file = record.file.clone()?;
        Some(Self {
            requirement_id: record.requirement.id.clone(),
            name: record.requirement.name.clone(),
            status: record.status,
            file,
            uploaded_at: record.uploaded_at,
        })
    }
}

/// Final snapshot handed to the review desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPackage {
    pub session_id: SessionId,
    pub offering_id: OfferingId,
    pub offering_title: String,
    pub category: Category,
    pub child: ChildProfile,
    pub slot: Slot,
    pub quoted_price: u32,
    pub documents: Vec<SubmittedDocument>,
    pub submitted_at: DateTime<Utc>,
}

/// Acknowledgement returned when the desk accepts a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub registration_id: String,
    pub status: RegistrationStatus,
    pub received_at: DateTime<Utc>,
}

/// Refusal returned by the desk, with a reason code for the guardian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRejection {
    pub reason_code: String,
    pub detail: String,
}

impl SubmissionRejection {
    pub fn new(reason_code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            reason_code: reason_code.into(),
            detail: detail.into(),
        }
    }
}

/// Outbound port receiving finished enrollments for administrative review.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(
        &self,
        package: SubmissionPackage,
    ) -> Result<SubmissionReceipt, SubmissionRejection>;
}

/// Hand a package to the sink, mapping refusals and silence onto enrollment errors.
pub async fn dispatch<S>(
    sink: &S,
    package: SubmissionPackage,
    timeout: Duration,
) -> Result<SubmissionReceipt, EnrollmentError>
where
    S: SubmissionSink + ?Sized,
{
    match tokio::time::timeout(timeout, sink.submit(package)).await {
        Ok(Ok(receipt)) => Ok(receipt),
        Ok(Err(rejection)) => Err(EnrollmentError::SubmissionRejected {
            reason_code: rejection.reason_code,
            detail: rejection.detail,
        }),
        Err(_elapsed) => Err(EnrollmentError::SubmissionTimedOut { after: timeout }),
    }
}
