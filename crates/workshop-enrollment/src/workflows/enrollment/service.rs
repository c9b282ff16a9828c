use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::info;

use super::catalog::{filter, quote, CatalogError, CatalogProvider, FilterCriteria, PriceQuote};
use super::domain::{
    ChildProfile, DocumentRequirement, FileDescriptor, Offering, OfferingId, RequirementId,
    SessionId, SlotId,
};
use super::error::EnrollmentError;
use super::session::{CancelledEnrollment, EnrollmentSession, ReviewVerdict, SubmissionResolution};
use super::submission::{dispatch, SubmissionReceipt, SubmissionSink};
use super::views::SessionView;
use crate::config::EnrollmentConfig;

/// Service owning every open enrollment session and the ports they talk to.
pub struct EnrollmentService<C, S> {
    catalog: Arc<C>,
    sink: Arc<S>,
    requirements: Vec<DocumentRequirement>,
    config: EnrollmentConfig,
    sessions: Mutex<SessionMap>,
}

type SessionMap = HashMap<SessionId, EnrollmentSession>;

/// Clears the in-flight flag of a session if the submitting future is dropped
/// before the desk's answer is applied.
struct InFlightGuard<'a> {
    sessions: &'a Mutex<SessionMap>,
    session_id: SessionId,
    armed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(sessions: &'a Mutex<SessionMap>, session_id: SessionId) -> Self {
        Self {
            sessions,
            session_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(session) = sessions.get_mut(&self.session_id) {
            session.abandon_submission();
        }
    }
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("enr-{id:06}"))
}

impl<C, S> EnrollmentService<C, S>
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    pub fn new(
        catalog: Arc<C>,
        sink: Arc<S>,
        requirements: Vec<DocumentRequirement>,
        config: EnrollmentConfig,
    ) -> Self {
        Self {
            catalog,
            sink,
            requirements,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EnrollmentConfig {
        &self.config
    }

    pub fn requirements(&self) -> &[DocumentRequirement] {
        &self.requirements
    }

    fn lock_sessions(&self) -> MutexGuard<'_, SessionMap> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn offering(&self, offering_id: &OfferingId) -> Result<Offering, EnrollmentServiceError> {
        self.catalog
            .offering(offering_id)?
            .ok_or_else(|| EnrollmentServiceError::OfferingNotFound(offering_id.clone()))
    }

    /// Offerings admitted by `criteria`, in catalog order.
    pub fn browse(&self, criteria: &FilterCriteria) -> Result<Vec<Offering>, EnrollmentServiceError> {
        let offerings = self.catalog.offerings()?;
        Ok(filter(&offerings, criteria).cloned().collect())
    }

    pub fn quote(
        &self,
        offering_id: &OfferingId,
        household_index: u32,
    ) -> Result<PriceQuote, EnrollmentServiceError> {
        let offering = self.offering(offering_id)?;
        Ok(quote(&offering, household_index))
    }

    pub fn open(
        &self,
        offering_id: &OfferingId,
        child: ChildProfile,
    ) -> Result<SessionView, EnrollmentServiceError> {
        let offering = self.offering(offering_id)?;
        if offering.is_full() {
            return Err(EnrollmentServiceError::OfferingFull(offering.id));
        }

        let session = EnrollmentSession::open(
            next_session_id(),
            offering,
            child,
            &self.requirements,
            Utc::now(),
        );
        let view = SessionView::from(&session);
        self.lock_sessions().insert(session.id().clone(), session);
        Ok(view)
    }

    pub fn view(&self, session_id: &SessionId) -> Result<SessionView, EnrollmentServiceError> {
        self.with_session(session_id, |_| Ok(()))
    }

    pub fn open_sessions(&self) -> usize {
        self.lock_sessions().len()
    }

    /// Run one intent against a session while holding the session map, so no
    /// two intents on the same session interleave.
    fn with_session<F>(
        &self,
        session_id: &SessionId,
        intent: F,
    ) -> Result<SessionView, EnrollmentServiceError>
    where
        F: FnOnce(&mut EnrollmentSession) -> Result<(), EnrollmentError>,
    {
        let mut sessions = self.lock_sessions();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| EnrollmentServiceError::SessionNotFound(session_id.clone()))?;
        intent(session)?;
        Ok(SessionView::from(&*session))
    }

    pub fn select_slot(
        &self,
        session_id: &SessionId,
        slot_id: &SlotId,
    ) -> Result<SessionView, EnrollmentServiceError> {
        self.with_session(session_id, |session| session.select_slot(slot_id).map(|_| ()))
    }

    pub fn attach_document(
        &self,
        session_id: &SessionId,
        requirement_id: &RequirementId,
        file: &FileDescriptor,
    ) -> Result<SessionView, EnrollmentServiceError> {
        self.with_session(session_id, |session| {
            session
                .attach_document(requirement_id, file, Utc::now())
                .map(|_| ())
        })
    }

    pub fn remove_document(
        &self,
        session_id: &SessionId,
        requirement_id: &RequirementId,
    ) -> Result<SessionView, EnrollmentServiceError> {
        self.with_session(session_id, |session| {
            session.remove_document(requirement_id).map(|_| ())
        })
    }

    pub fn review_document(
        &self,
        session_id: &SessionId,
        requirement_id: &RequirementId,
        verdict: ReviewVerdict,
    ) -> Result<SessionView, EnrollmentServiceError> {
        self.with_session(session_id, |session| {
            session.review_document(requirement_id, verdict)
        })
    }

    pub fn advance(&self, session_id: &SessionId) -> Result<SessionView, EnrollmentServiceError> {
        self.with_session(session_id, |session| session.advance().map(|_| ()))
    }

    pub fn back(&self, session_id: &SessionId) -> Result<SessionView, EnrollmentServiceError> {
        self.with_session(session_id, |session| session.back().map(|_| ()))
    }

    pub fn accept_terms(
        &self,
        session_id: &SessionId,
        accepted: bool,
    ) -> Result<SessionView, EnrollmentServiceError> {
        self.with_session(session_id, |session| session.accept_terms(accepted))
    }

    /// Submit a session to the desk. The session map is released while the desk
    /// deliberates; the session itself refuses other intents until it resolves
    /// or the returned future is dropped.
    pub async fn submit(
        &self,
        session_id: &SessionId,
    ) -> Result<SubmissionReceipt, EnrollmentServiceError> {
        let package = {
            let mut sessions = self.lock_sessions();
            let session = sessions
                .get_mut(session_id)
                .ok_or_else(|| EnrollmentServiceError::SessionNotFound(session_id.clone()))?;
            session.begin_submission(Utc::now())?
        };

        let mut guard = InFlightGuard::new(&self.sessions, session_id.clone());
        let result = dispatch(self.sink.as_ref(), package, self.config.submission_timeout).await;
        guard.disarm();

        let mut sessions = self.lock_sessions();
        let session = sessions
            .remove(session_id)
            .ok_or_else(|| EnrollmentServiceError::SessionNotFound(session_id.clone()))?;

        match session.complete_submission(result) {
            SubmissionResolution::Accepted(receipt) => Ok(receipt),
            SubmissionResolution::Retry { session, error } => {
                sessions.insert(session_id.clone(), *session);
                Err(error.into())
            }
        }
    }

    pub fn cancel(
        &self,
        session_id: &SessionId,
    ) -> Result<CancelledEnrollment, EnrollmentServiceError> {
        let mut sessions = self.lock_sessions();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| EnrollmentServiceError::SessionNotFound(session_id.clone()))?;
        session.ensure_cancellable()?;

        match sessions.remove(session_id) {
            Some(session) => Ok(session.cancel()),
            None => Err(EnrollmentServiceError::SessionNotFound(session_id.clone())),
        }
    }

    /// Sweep every open session for validated documents past their validity.
    pub fn expire_stale_documents(&self, now: DateTime<Utc>) -> usize {
        let expired: usize = self
            .lock_sessions()
            .values_mut()
            .map(|session| session.expire_stale_documents(now).len())
            .sum();
        if expired > 0 {
            info!(expired, "expired stale documents across open sessions");
        }
        expired
    }
}

/// Error raised by the enrollment service.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentServiceError {
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("enrollment session '{0}' not found")]
    SessionNotFound(SessionId),
    #[error("offering '{0}' not found")]
    OfferingNotFound(OfferingId),
    #[error("offering '{0}' has no remaining places")]
    OfferingFull(OfferingId),
}
