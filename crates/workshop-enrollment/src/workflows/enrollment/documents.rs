use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    ContentHandle, DocumentRequirement, DocumentStatus, FileDescriptor, RequirementId,
};
use super::error::{EnrollmentError, FileRejection};

/// Largest accepted attachment: 5 MiB.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Accepted attachment formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Pdf,
    Jpeg,
    Png,
}

impl MediaType {
    /// Map a MIME string (parameters allowed) onto an accepted format.
    pub fn from_mime(raw: &str) -> Option<Self> {
        let parsed: mime::Mime = raw.trim().parse().ok()?;
        match parsed.essence_str().to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    pub const fn essence(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// File metadata retained once an attachment passes the intake policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFile {
    pub name: String,
    pub media_type: MediaType,
    pub size: u64,
    pub handle: ContentHandle,
}

/// Apply the format/size policy to an incoming file.
pub fn screen_file(file: &FileDescriptor) -> Result<AttachedFile, FileRejection> {
    let media_type = MediaType::from_mime(&file.media_type)
        .ok_or_else(|| FileRejection::UnsupportedMediaType(file.media_type.clone()))?;

    if file.size > MAX_FILE_SIZE {
        return Err(FileRejection::TooLarge {
            size: file.size,
            limit: MAX_FILE_SIZE,
        });
    }

    Ok(AttachedFile {
        name: file.name.clone(),
        media_type,
        size: file.size,
        handle: file.handle.clone(),
    })
}

/// Session-owned state of one document requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub requirement: DocumentRequirement,
    pub status: DocumentStatus,
    pub file: Option<AttachedFile>,
    pub uploaded_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    fn missing(requirement: DocumentRequirement) -> Self {
        Self {
            requirement,
            status: DocumentStatus::Missing,
            file: None,
            uploaded_at: None,
            expires_at: None,
        }
    }

    fn reset(&mut self) {
        self.status = DocumentStatus::Missing;
        self.file = None;
        self.uploaded_at = None;
        self.expires_at = None;
    }

    pub fn id(&self) -> &RequirementId {
        &self.requirement.id
    }

    /// Whether this record holds the session back from leaving the document step.
    pub fn is_blocking(&self) -> bool {
        self.requirement.required && !self.status.satisfies_requirement()
    }
}

/// Counts backing the dossier status card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DossierSummary {
    pub total: usize,
    pub validated: usize,
    pub uploaded: usize,
    pub missing: usize,
    pub expired: usize,
    pub invalid: usize,
    pub completion_percentage: u8,
    pub expired_documents: Vec<String>,
}

/// Authoritative status of every document requirement in one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLedger {
    records: Vec<DocumentRecord>,
}

impl DocumentLedger {
    pub fn new(requirements: &[DocumentRequirement]) -> Self {
        Self {
            records: requirements
                .iter()
                .cloned()
                .map(DocumentRecord::missing)
                .collect(),
        }
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn record(&self, requirement_id: &RequirementId) -> Option<&DocumentRecord> {
        self.records
            .iter()
            .find(|record| record.id() == requirement_id)
    }

    pub fn status_of(&self, requirement_id: &RequirementId) -> Option<DocumentStatus> {
        self.record(requirement_id).map(|record| record.status)
    }

    fn record_mut(
        &mut self,
        requirement_id: &RequirementId,
    ) -> Result<&mut DocumentRecord, EnrollmentError> {
        self.records
            .iter_mut()
            .find(|record| record.id() == requirement_id)
            .ok_or_else(|| EnrollmentError::UnknownRequirement(requirement_id.clone()))
    }

    /// Attach a file, replacing whatever the slot held before. A file that fails
    /// the intake policy leaves the ledger untouched.
    pub fn attach(
        &mut self,
        requirement_id: &RequirementId,
        file: &FileDescriptor,
        now: DateTime<Utc>,
    ) -> Result<&DocumentRecord, EnrollmentError> {
        let record = self.record_mut(requirement_id)?;
        let attached = screen_file(file)?;

        if record.status != DocumentStatus::Missing {
            debug!(
                requirement = %requirement_id,
                previous = %record.status,
                "replacing existing attachment"
            );
        }

        record.expires_at = record
            .requirement
            .max_age_months
            .and_then(|months| now.checked_add_months(Months::new(months)));
        record.status = DocumentStatus::Uploaded;
        record.file = Some(attached);
        record.uploaded_at = Some(now);

        Ok(record)
    }

    /// Clear an attachment. Returns `false` when the slot was already empty.
    pub fn remove(&mut self, requirement_id: &RequirementId) -> Result<bool, EnrollmentError> {
        let record = self.record_mut(requirement_id)?;
        if record.status == DocumentStatus::Missing {
            return Ok(false);
        }

        record.reset();
        Ok(true)
    }

    pub fn mark_validated(&mut self, requirement_id: &RequirementId) -> Result<(), EnrollmentError> {
        self.review(requirement_id, DocumentStatus::Validated)
    }

    pub fn mark_invalid(&mut self, requirement_id: &RequirementId) -> Result<(), EnrollmentError> {
        self.review(requirement_id, DocumentStatus::Invalid)
    }

    pub fn mark_expired(&mut self, requirement_id: &RequirementId) -> Result<(), EnrollmentError> {
        self.review(requirement_id, DocumentStatus::Expired)
    }

    /// Reviewer moves: an uploaded file is validated or rejected, a validated
    /// one may later be rejected or expire. Expired and invalid records only
    /// leave their state through a new attachment. Repeating a verdict is a no-op.
    fn review(
        &mut self,
        requirement_id: &RequirementId,
        to: DocumentStatus,
    ) -> Result<(), EnrollmentError> {
        use DocumentStatus::{Expired, Invalid, Uploaded, Validated};

        let record = self.record_mut(requirement_id)?;
        let from = record.status;
        let allowed = from == to
            || matches!(
                (from, to),
                (Uploaded, Validated | Invalid) | (Validated, Invalid | Expired)
            );
        if !allowed {
            return Err(EnrollmentError::InvalidTransition {
                requirement: requirement_id.clone(),
                from,
                to,
            });
        }

        record.status = to;
        Ok(())
    }

    /// Demote validated documents whose validity window closed before `now`.
    pub fn expire_stale(&mut self, now: DateTime<Utc>) -> Vec<RequirementId> {
        self.records
            .iter_mut()
            .filter(|record| record.status == DocumentStatus::Validated)
            .filter(|record| record.expires_at.is_some_and(|expiry| expiry < now))
            .map(|record| {
                record.status = DocumentStatus::Expired;
                record.requirement.id.clone()
            })
            .collect()
    }

    /// Gate for leaving the document step: every required document is uploaded
    /// or validated. Expired and invalid attachments still block.
    pub fn is_complete(&self) -> bool {
        !self.records.iter().any(DocumentRecord::is_blocking)
    }

    /// Records carried into a submission.
    pub fn submittable(&self) -> impl Iterator<Item = &DocumentRecord> {
        self.records
            .iter()
            .filter(|record| record.status.satisfies_requirement())
    }

    pub fn summary(&self) -> DossierSummary {
        let count = |status: DocumentStatus| {
            self.records
                .iter()
                .filter(|record| record.status == status)
                .count()
        };

        let total = self.records.len();
        let validated = count(DocumentStatus::Validated);
        let completion_percentage = if total == 0 {
            100
        } else {
            ((validated * 200 + total) / (2 * total)) as u8
        };

        DossierSummary {
            total,
            validated,
            uploaded: count(DocumentStatus::Uploaded),
            missing: count(DocumentStatus::Missing),
            expired: count(DocumentStatus::Expired),
            invalid: count(DocumentStatus::Invalid),
            completion_percentage,
            expired_documents: self
                .records
                .iter()
                .filter(|record| record.status == DocumentStatus::Expired)
                .map(|record| record.requirement.name.clone())
                .collect(),
        }
    }
}
