use chrono::{DateTime, Utc};
use serde::Serialize;

use super::documents::{DocumentRecord, DossierSummary};
use super::domain::{DocumentStatus, OfferingId, RequirementId, SessionId, Slot};
use super::session::{EnrollmentSession, Phase};

#[derive(Debug, Clone, Serialize)]
pub struct ProgressStep {
    pub number: u8,
    pub label: &'static str,
    pub completed: bool,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    pub requirement_id: RequirementId,
    pub name: String,
    pub required: bool,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_months: Option<u32>,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&DocumentRecord> for DocumentView {
    fn from(record: &DocumentRecord) -> Self {
        Self {
            requirement_id: record.requirement.id.clone(),
            name: record.requirement.name.clone(),
            required: record.requirement.required,
            description: record.requirement.description.clone(),
            max_age_months: record.requirement.max_age_months,
            status: record.status,
            file_name: record.file.as_ref().map(|file| file.name.clone()),
            uploaded_at: record.uploaded_at,
            expires_at: record.expires_at,
        }
    }
}

/// Everything the presentation layer needs to render the current step.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub offering_id: OfferingId,
    pub offering_title: String,
    pub category: &'static str,
    pub phase: Phase,
    pub phase_number: u8,
    pub steps: Vec<ProgressStep>,
    pub selected_slot: Option<Slot>,
    pub documents: Vec<DocumentView>,
    pub documents_complete: bool,
    pub terms_accepted: bool,
    pub submission_in_flight: bool,
    pub quoted_price: u32,
    pub dossier: DossierSummary,
}

impl From<&EnrollmentSession> for SessionView {
    fn from(session: &EnrollmentSession) -> Self {
        let phase = session.phase();
        let steps = Phase::ordered()
            .into_iter()
            .map(|step| ProgressStep {
                number: step.number(),
                label: step.label(),
                completed: step < phase,
                current: step == phase,
            })
            .collect();

        Self {
            session_id: session.id().clone(),
            offering_id: session.offering().id.clone(),
            offering_title: session.offering().title.clone(),
            category: session.offering().category.code(),
            phase,
            phase_number: phase.number(),
            steps,
            selected_slot: session.selected_slot().cloned(),
            documents: session
                .ledger()
                .records()
                .iter()
                .map(DocumentView::from)
                .collect(),
            documents_complete: session.ledger().is_complete(),
            terms_accepted: session.terms_accepted(),
            submission_in_flight: session.submission_in_flight(),
            quoted_price: session.quoted_price(),
            dossier: session.ledger().summary(),
        }
    }
}
