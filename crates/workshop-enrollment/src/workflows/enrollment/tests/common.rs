use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::EnrollmentConfig;
use crate::workflows::enrollment::{
    enrollment_router, ChildProfile, ContentHandle, DocumentLedger, DocumentRequirement,
    EnrollmentBlueprint, EnrollmentService, EnrollmentSession, FileDescriptor, MissingDataPolicy,
    Offering, OfferingId, Phase, RegistrationStatus, RequirementId, SessionId, SlotId,
    StaticCatalog, SubmissionPackage, SubmissionReceipt, SubmissionRejection, SubmissionSink,
};

pub(super) const OPEN_SLOT: &str = "2024-03-15T1400";
pub(super) const FULL_SLOT: &str = "2024-04-05T1400";

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn blueprint() -> EnrollmentBlueprint {
    EnrollmentBlueprint::standard()
}

pub(super) fn requirements() -> Vec<DocumentRequirement> {
    blueprint().requirements().to_vec()
}

pub(super) fn requirement_ids() -> Vec<RequirementId> {
    requirements().into_iter().map(|req| req.id).collect()
}

pub(super) fn req(id: &str) -> RequirementId {
    RequirementId(id.to_string())
}

pub(super) fn slot_id(id: &str) -> SlotId {
    SlotId(id.to_string())
}

pub(super) fn offering(id: &str) -> Offering {
    blueprint()
        .offerings()
        .iter()
        .find(|offering| offering.id.0 == id)
        .cloned()
        .expect("offering present in standard blueprint")
}

pub(super) fn child() -> ChildProfile {
    ChildProfile {
        reference: "child-042".to_string(),
        first_name: "Lea".to_string(),
        age: 9,
    }
}

pub(super) fn file(name: &str, media_type: &str, size: u64) -> FileDescriptor {
    FileDescriptor {
        name: name.to_string(),
        media_type: media_type.to_string(),
        size,
        handle: ContentHandle(format!("blob://{name}")),
    }
}

pub(super) fn pdf(name: &str) -> FileDescriptor {
    file(name, "application/pdf", 48 * 1024)
}

pub(super) fn ledger() -> DocumentLedger {
    DocumentLedger::new(&requirements())
}

pub(super) fn open_session() -> EnrollmentSession {
    EnrollmentSession::open(
        SessionId("enr-test".to_string()),
        offering("balanced-cooking"),
        child(),
        &requirements(),
        now(),
    )
}

pub(super) fn session_at_documents() -> EnrollmentSession {
    let mut session = open_session();
    session
        .select_slot(&slot_id(OPEN_SLOT))
        .expect("open slot is selectable");
    session.advance().expect("slot selected");
    session
}

pub(super) fn session_at_confirmation() -> EnrollmentSession {
    let mut session = session_at_documents();
    for id in requirement_ids() {
        session
            .attach_document(&id, &pdf(&format!("{id}.pdf")), now())
            .expect("pdf accepted");
    }
    session.advance().expect("documents complete");
    assert_eq!(session.phase(), Phase::Confirmation);
    session
}

pub(super) fn enrollment_config(timeout: Duration) -> EnrollmentConfig {
    EnrollmentConfig {
        submission_timeout: timeout,
        filter_missing_data: MissingDataPolicy::Include,
    }
}

pub(super) fn build_service<S>(sink: Arc<S>, timeout: Duration) -> EnrollmentService<StaticCatalog, S>
where
    S: SubmissionSink + 'static,
{
    let blueprint = blueprint();
    let catalog = blueprint.catalog().expect("standard catalog is valid");
    EnrollmentService::new(
        Arc::new(catalog),
        sink,
        blueprint.requirements().to_vec(),
        enrollment_config(timeout),
    )
}

pub(super) fn enrollment_router_with_service<S>(service: EnrollmentService<StaticCatalog, S>) -> axum::Router
where
    S: SubmissionSink + 'static,
{
    enrollment_router(Arc::new(service))
}

/// Drive a service session up to confirmation with accepted terms.
pub(super) fn ready_to_submit<S>(service: &EnrollmentService<StaticCatalog, S>) -> SessionId
where
    S: SubmissionSink + 'static,
{
    let view = service
        .open(&OfferingId("balanced-cooking".to_string()), child())
        .expect("session opens");
    let id = view.session_id;
    service
        .select_slot(&id, &slot_id(OPEN_SLOT))
        .expect("slot selected");
    service.advance(&id).expect("advance to documents");
    for requirement in requirement_ids() {
        service
            .attach_document(&id, &requirement, &pdf(&format!("{requirement}.pdf")))
            .expect("document attached");
    }
    service.advance(&id).expect("advance to confirmation");
    service.accept_terms(&id, true).expect("terms accepted");
    id
}

/// Desk double that records packages and can be scripted to refuse.
#[derive(Default, Clone)]
pub(super) struct MemorySink {
    packages: Arc<Mutex<Vec<SubmissionPackage>>>,
    rejections: Arc<Mutex<VecDeque<SubmissionRejection>>>,
}

impl MemorySink {
    pub(super) fn packages(&self) -> Vec<SubmissionPackage> {
        self.packages.lock().expect("sink mutex poisoned").clone()
    }

    pub(super) fn reject_next(&self, reason_code: &str, detail: &str) {
        self.rejections
            .lock()
            .expect("sink mutex poisoned")
            .push_back(SubmissionRejection::new(reason_code, detail));
    }
}

#[async_trait]
impl SubmissionSink for MemorySink {
    async fn submit(
        &self,
        package: SubmissionPackage,
    ) -> Result<SubmissionReceipt, SubmissionRejection> {
        if let Some(rejection) = self
            .rejections
            .lock()
            .expect("sink mutex poisoned")
            .pop_front()
        {
            return Err(rejection);
        }

        let mut packages = self.packages.lock().expect("sink mutex poisoned");
        packages.push(package);
        Ok(SubmissionReceipt {
            registration_id: format!("reg-{:03}", packages.len()),
            status: RegistrationStatus::Pending,
            received_at: now(),
        })
    }
}

/// Desk double that never answers.
pub(super) struct SilentSink;

#[async_trait]
impl SubmissionSink for SilentSink {
    async fn submit(
        &self,
        _package: SubmissionPackage,
    ) -> Result<SubmissionReceipt, SubmissionRejection> {
        std::future::pending().await
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
