use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Category, OfferingId, SessionId, SlotId};
use super::submission::SubmissionPackage;

/// Administrative status of a submitted enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Validated,
    Completed,
}

impl RegistrationStatus {
    pub const fn ordered() -> [Self; 3] {
        [Self::Pending, Self::Validated, Self::Completed]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|status| raw.trim().eq_ignore_ascii_case(status.label()))
    }
}

/// A guardian's registration as tracked after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub registration_id: String,
    pub session_id: SessionId,
    pub offering_id: OfferingId,
    pub offering_title: String,
    pub category: Category,
    pub slot_id: SlotId,
    pub workshop_date: NaiveDate,
    pub child_reference: String,
    pub status: RegistrationStatus,
    pub registered_on: NaiveDate,
    pub price: u32,
    #[serde(default)]
    pub evaluation_done: bool,
}

impl RegistrationRecord {
    pub fn from_package(registration_id: impl Into<String>, package: &SubmissionPackage) -> Self {
        Self {
            registration_id: registration_id.into(),
            session_id: package.session_id.clone(),
            offering_id: package.offering_id.clone(),
            offering_title: package.offering_title.clone(),
            category: package.category,
            slot_id: package.slot.id.clone(),
            workshop_date: package.slot.date,
            child_reference: package.child.reference.clone(),
            status: RegistrationStatus::Pending,
            registered_on: package.submitted_at.date_naive(),
            price: package.quoted_price,
            evaluation_done: false,
        }
    }

    /// Validated registrations are settled by payment before the workshop.
    pub fn awaiting_payment(&self) -> bool {
        self.status == RegistrationStatus::Validated
    }

    /// Completed workshops ask the guardian for a satisfaction evaluation once.
    pub fn awaiting_evaluation(&self) -> bool {
        self.status == RegistrationStatus::Completed && !self.evaluation_done
    }
}

/// Per-status counters shown on the registration tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub pending: usize,
    pub validated: usize,
    pub completed: usize,
}

pub fn by_status(
    records: &[RegistrationRecord],
    status: RegistrationStatus,
) -> impl Iterator<Item = &RegistrationRecord> {
    records.iter().filter(move |record| record.status == status)
}

pub fn tab_counts(records: &[RegistrationRecord]) -> TabCounts {
    records
        .iter()
        .fold(TabCounts::default(), |mut counts, record| {
            match record.status {
                RegistrationStatus::Pending => counts.pending += 1,
                RegistrationStatus::Validated => counts.validated += 1,
                RegistrationStatus::Completed => counts.completed += 1,
            }
            counts
        })
}
