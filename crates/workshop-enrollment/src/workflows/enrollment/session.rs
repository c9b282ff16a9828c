use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::{is_selectable, price};
use super::documents::{DocumentLedger, DocumentRecord};
use super::domain::{
    ChildProfile, DocumentRequirement, FileDescriptor, Offering, RequirementId, SessionId, Slot,
    SlotId,
};
use super::error::{EnrollmentError, GuardFailure};
use super::submission::{
    dispatch, SubmissionPackage, SubmissionReceipt, SubmissionSink, SubmittedDocument,
};

/// The three ordered steps of an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SlotSelection,
    DocumentCollection,
    Confirmation,
}

impl Phase {
    pub const fn ordered() -> [Self; 3] {
        [
            Self::SlotSelection,
            Self::DocumentCollection,
            Self::Confirmation,
        ]
    }

    /// One-based position shown in the progress bar.
    pub const fn number(self) -> u8 {
        match self {
            Self::SlotSelection => 1,
            Self::DocumentCollection => 2,
            Self::Confirmation => 3,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SlotSelection => "Workshop details",
            Self::DocumentCollection => "Required documents",
            Self::Confirmation => "Confirmation",
        }
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::SlotSelection => Some(Self::DocumentCollection),
            Self::DocumentCollection => Some(Self::Confirmation),
            Self::Confirmation => None,
        }
    }

    /// Preceding phase, saturating at slot selection.
    pub const fn previous(self) -> Self {
        match self {
            Self::SlotSelection | Self::DocumentCollection => Self::SlotSelection,
            Self::Confirmation => Self::DocumentCollection,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.label())
    }
}

/// Decision recorded by an external document reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewVerdict {
    Validated,
    Invalid,
    Expired,
}

/// How a submission attempt ended.
#[derive(Debug)]
pub enum SubmissionResolution {
    /// The desk took the package; the session is over.
    Accepted(SubmissionReceipt),
    /// The session is handed back, still at confirmation, for correction or retry.
    Retry {
        session: Box<EnrollmentSession>,
        error: EnrollmentError,
    },
}

/// What remains of a session after the guardian abandons it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelledEnrollment {
    pub session_id: SessionId,
    pub phase: Phase,
    pub discarded_documents: usize,
}

/// Aggregate root for one guardian's enrollment attempt.
///
/// Phase moves only happen through the guarded methods below; there is no way
/// to reach confirmation without a selected slot and a complete ledger.
#[derive(Debug, Clone)]
pub struct EnrollmentSession {
    id: SessionId,
    offering: Offering,
    child: ChildProfile,
    phase: Phase,
    selected_slot: Option<SlotId>,
    ledger: DocumentLedger,
    terms_accepted: bool,
    submission_in_flight: bool,
    opened_at: DateTime<Utc>,
}

impl EnrollmentSession {
    pub fn open(
        id: SessionId,
        offering: Offering,
        child: ChildProfile,
        requirements: &[DocumentRequirement],
        now: DateTime<Utc>,
    ) -> Self {
        info!(session = %id, offering = %offering.id, "enrollment session opened");
        Self {
            id,
            offering,
            child,
            phase: Phase::SlotSelection,
            selected_slot: None,
            ledger: DocumentLedger::new(requirements),
            terms_accepted: false,
            submission_in_flight: false,
            opened_at: now,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn offering(&self) -> &Offering {
        &self.offering
    }

    pub fn child(&self) -> &ChildProfile {
        &self.child
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selected_slot(&self) -> Option<&Slot> {
        self.selected_slot
            .as_ref()
            .and_then(|slot_id| self.offering.slot(slot_id))
    }

    pub fn ledger(&self) -> &DocumentLedger {
        &self.ledger
    }

    pub fn terms_accepted(&self) -> bool {
        self.terms_accepted
    }

    pub fn submission_in_flight(&self) -> bool {
        self.submission_in_flight
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Price for the household index attached to the offering.
    pub fn quoted_price(&self) -> u32 {
        price(&self.offering, self.offering.household_index)
    }

    fn ensure_idle(&self) -> Result<(), EnrollmentError> {
        if self.submission_in_flight {
            return Err(GuardFailure::SubmissionInFlight.into());
        }
        Ok(())
    }

    fn ensure_phase(&self, expected: Phase) -> Result<(), EnrollmentError> {
        self.ensure_idle()?;
        if self.phase != expected {
            return Err(GuardFailure::WrongPhase {
                expected,
                actual: self.phase,
            }
            .into());
        }
        Ok(())
    }

    pub fn select_slot(&mut self, slot_id: &SlotId) -> Result<&Slot, EnrollmentError> {
        self.ensure_phase(Phase::SlotSelection)?;

        let slot = self
            .offering
            .slot(slot_id)
            .ok_or_else(|| EnrollmentError::UnknownSlot(slot_id.clone()))?;
        if !is_selectable(slot) {
            return Err(GuardFailure::SlotUnavailable(slot_id.clone()).into());
        }

        debug!(session = %self.id, slot = %slot_id, "slot selected");
        self.selected_slot = Some(slot_id.clone());
        Ok(slot)
    }

    pub fn advance(&mut self) -> Result<Phase, EnrollmentError> {
        self.ensure_idle()?;

        let next = match self.phase {
            Phase::SlotSelection if self.selected_slot().is_none() => {
                return Err(GuardFailure::NoSlotSelected.into());
            }
            Phase::DocumentCollection if !self.ledger.is_complete() => {
                return Err(GuardFailure::DocumentsIncomplete.into());
            }
            phase => phase.next().ok_or(GuardFailure::NoFurtherPhase)?,
        };

        info!(session = %self.id, from = %self.phase, to = %next, "enrollment advanced");
        self.phase = next;
        Ok(next)
    }

    /// Step back one phase. The chosen slot and attachments are kept; leaving
    /// confirmation withdraws the terms acceptance.
    pub fn back(&mut self) -> Result<Phase, EnrollmentError> {
        self.ensure_idle()?;
        let previous = self.phase.previous();
        if self.phase == Phase::Confirmation {
            self.terms_accepted = false;
        }
        if previous != self.phase {
            info!(session = %self.id, from = %self.phase, to = %previous, "enrollment stepped back");
        }
        self.phase = previous;
        Ok(previous)
    }

    pub fn attach_document(
        &mut self,
        requirement_id: &RequirementId,
        file: &FileDescriptor,
        now: DateTime<Utc>,
    ) -> Result<&DocumentRecord, EnrollmentError> {
        self.ensure_phase(Phase::DocumentCollection)?;
        let record = self.ledger.attach(requirement_id, file, now)?;
        debug!(session = %self.id, requirement = %requirement_id, "document attached");
        Ok(record)
    }

    pub fn remove_document(&mut self, requirement_id: &RequirementId) -> Result<bool, EnrollmentError> {
        self.ensure_phase(Phase::DocumentCollection)?;
        let removed = self.ledger.remove(requirement_id)?;
        if removed {
            debug!(session = %self.id, requirement = %requirement_id, "document removed");
        }
        Ok(removed)
    }

    /// Apply a reviewer decision. Allowed at any phase; a demotion after the
    /// document step is caught again by the submission guard.
    pub fn review_document(
        &mut self,
        requirement_id: &RequirementId,
        verdict: ReviewVerdict,
    ) -> Result<(), EnrollmentError> {
        match verdict {
            ReviewVerdict::Validated => self.ledger.mark_validated(requirement_id),
            ReviewVerdict::Invalid => self.ledger.mark_invalid(requirement_id),
            ReviewVerdict::Expired => self.ledger.mark_expired(requirement_id),
        }?;
        debug!(session = %self.id, requirement = %requirement_id, ?verdict, "document reviewed");
        Ok(())
    }

    pub fn expire_stale_documents(&mut self, now: DateTime<Utc>) -> Vec<RequirementId> {
        let expired = self.ledger.expire_stale(now);
        if !expired.is_empty() {
            info!(session = %self.id, count = expired.len(), "validated documents expired");
        }
        expired
    }

    pub fn accept_terms(&mut self, accepted: bool) -> Result<(), EnrollmentError> {
        self.ensure_phase(Phase::Confirmation)?;
        self.terms_accepted = accepted;
        Ok(())
    }

    /// Check every submission precondition, then freeze the session and
    /// return the package to hand to the desk.
    pub fn begin_submission(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<SubmissionPackage, EnrollmentError> {
        self.ensure_phase(Phase::Confirmation)?;
        if !self.terms_accepted {
            return Err(GuardFailure::TermsNotAccepted.into());
        }
        if !self.ledger.is_complete() {
            return Err(GuardFailure::DocumentsIncomplete.into());
        }
        let slot = self
            .selected_slot()
            .cloned()
            .ok_or(GuardFailure::NoSlotSelected)?;

        let package = SubmissionPackage {
            session_id: self.id.clone(),
            offering_id: self.offering.id.clone(),
            offering_title: self.offering.title.clone(),
            category: self.offering.category,
            child: self.child.clone(),
            slot,
            quoted_price: self.quoted_price(),
            documents: self
                .ledger
                .submittable()
                .filter_map(SubmittedDocument::from_record)
                .collect(),
            submitted_at: now,
        };

        self.submission_in_flight = true;
        info!(session = %self.id, documents = package.documents.len(), "submission started");
        Ok(package)
    }

    /// Resolve a submission started with [`begin_submission`](Self::begin_submission).
    pub fn complete_submission(
        mut self,
        result: Result<SubmissionReceipt, EnrollmentError>,
    ) -> SubmissionResolution {
        self.submission_in_flight = false;
        match result {
            Ok(receipt) => {
                info!(
                    session = %self.id,
                    registration = %receipt.registration_id,
                    "submission accepted"
                );
                SubmissionResolution::Accepted(receipt)
            }
            Err(error) => {
                warn!(session = %self.id, %error, "submission not accepted");
                SubmissionResolution::Retry {
                    session: Box::new(self),
                    error,
                }
            }
        }
    }

    /// Release a submission whose outcome will never arrive, leaving the
    /// session at confirmation.
    pub fn abandon_submission(&mut self) {
        if self.submission_in_flight {
            warn!(session = %self.id, "submission abandoned before the desk answered");
            self.submission_in_flight = false;
        }
    }

    /// Submit end to end, waiting at most `timeout` for the desk's decision.
    pub async fn submit<S>(
        mut self,
        sink: &S,
        timeout: Duration,
        now: DateTime<Utc>,
    ) -> SubmissionResolution
    where
        S: SubmissionSink + ?Sized,
    {
        let package = match self.begin_submission(now) {
            Ok(package) => package,
            Err(error) => {
                return SubmissionResolution::Retry {
                    session: Box::new(self),
                    error,
                }
            }
        };

        let result = dispatch(sink, package, timeout).await;
        self.complete_submission(result)
    }

    /// Refuses only while a submission awaits its decision.
    pub fn ensure_cancellable(&self) -> Result<(), EnrollmentError> {
        self.ensure_idle()
    }

    /// End the session without submitting; every document record is dropped.
    pub fn cancel(self) -> CancelledEnrollment {
        let discarded_documents = self
            .ledger
            .records()
            .iter()
            .filter(|record| record.file.is_some())
            .count();
        info!(session = %self.id, phase = %self.phase, discarded_documents, "enrollment cancelled");
        CancelledEnrollment {
            session_id: self.id,
            phase: self.phase,
            discarded_documents,
        }
    }
}
