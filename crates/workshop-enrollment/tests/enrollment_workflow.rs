//! End-to-end enrollment scenarios driven through the public service facade,
//! with a desk double that books registrations the way an administrative
//! back office would.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use workshop_enrollment::config::EnrollmentConfig;
    use workshop_enrollment::workflows::enrollment::{
        ChildProfile, ContentHandle, EnrollmentBlueprint, EnrollmentService, FileDescriptor,
        MissingDataPolicy, RegistrationRecord, RegistrationStatus, SlotId, StaticCatalog,
        SubmissionPackage, SubmissionReceipt, SubmissionRejection, SubmissionSink,
    };

    /// Desk that books one place per accepted package.
    #[derive(Default)]
    pub struct BookingDesk {
        capacity: Mutex<HashMap<SlotId, u32>>,
        registrations: Mutex<Vec<RegistrationRecord>>,
    }

    impl BookingDesk {
        pub fn with_capacity(slot: &str, places: u32) -> Self {
            let desk = Self::default();
            desk.capacity
                .lock()
                .expect("desk mutex poisoned")
                .insert(SlotId(slot.to_string()), places);
            desk
        }

        pub fn registrations(&self) -> Vec<RegistrationRecord> {
            self.registrations
                .lock()
                .expect("desk mutex poisoned")
                .clone()
        }
    }

    #[async_trait]
    impl SubmissionSink for BookingDesk {
        async fn submit(
            &self,
            package: SubmissionPackage,
        ) -> Result<SubmissionReceipt, SubmissionRejection> {
            let mut capacity = self.capacity.lock().expect("desk mutex poisoned");
            let places = capacity.entry(package.slot.id.clone()).or_insert(0);
            if *places == 0 {
                return Err(SubmissionRejection::new(
                    "slot_full",
                    format!("slot {} has no places left", package.slot.id),
                ));
            }
            *places -= 1;

            let mut registrations = self.registrations.lock().expect("desk mutex poisoned");
            let registration_id = format!("REG-{:04}", registrations.len() + 1);
            registrations.push(RegistrationRecord::from_package(
                registration_id.clone(),
                &package,
            ));
            Ok(SubmissionReceipt {
                registration_id,
                status: RegistrationStatus::Pending,
                received_at: Utc::now(),
            })
        }
    }

    pub fn service(desk: Arc<BookingDesk>) -> EnrollmentService<StaticCatalog, BookingDesk> {
        let blueprint = EnrollmentBlueprint::standard();
        EnrollmentService::new(
            Arc::new(blueprint.catalog().expect("standard catalog is valid")),
            desk,
            blueprint.requirements().to_vec(),
            EnrollmentConfig {
                submission_timeout: Duration::from_secs(2),
                filter_missing_data: MissingDataPolicy::Include,
            },
        )
    }

    pub fn child(reference: &str) -> ChildProfile {
        ChildProfile {
            reference: reference.to_string(),
            first_name: "Sacha".to_string(),
            age: 8,
        }
    }

    pub fn scan(name: &str) -> FileDescriptor {
        FileDescriptor {
            name: name.to_string(),
            media_type: "image/jpeg".to_string(),
            size: 900 * 1024,
            handle: ContentHandle(format!("intake://{name}")),
        }
    }
}

use std::sync::Arc;

use common::*;
use workshop_enrollment::workflows::enrollment::registrations::{by_status, tab_counts};
use workshop_enrollment::workflows::enrollment::{
    EnrollmentError, EnrollmentService, EnrollmentServiceError, OfferingId, Phase,
    RegistrationStatus, SessionId, SlotId, StaticCatalog,
};

fn drive_to_confirmation(
    service: &EnrollmentService<StaticCatalog, BookingDesk>,
    reference: &str,
) -> SessionId {
    let id = service
        .open(&OfferingId("balanced-cooking".to_string()), child(reference))
        .expect("session opens")
        .session_id;
    service
        .select_slot(&id, &SlotId("2024-03-22T1400".to_string()))
        .expect("slot has one place left");
    service.advance(&id).expect("advance to documents");

    let requirements: Vec<_> = service
        .requirements()
        .iter()
        .map(|requirement| requirement.id.clone())
        .collect();
    for requirement in &requirements {
        service
            .attach_document(&id, requirement, &scan(&format!("{requirement}.jpg")))
            .expect("scan accepted");
    }

    let view = service.advance(&id).expect("advance to confirmation");
    assert_eq!(view.phase, Phase::Confirmation);
    assert!(view.documents_complete);
    service.accept_terms(&id, true).expect("terms accepted");
    id
}

#[tokio::test]
async fn guardian_enrolls_a_child_and_the_desk_books_a_pending_registration() {
    let desk = Arc::new(BookingDesk::with_capacity("2024-03-22T1400", 1));
    let service = service(desk.clone());
    let id = drive_to_confirmation(&service, "child-001");

    let receipt = service.submit(&id).await.expect("desk accepts");
    assert_eq!(receipt.registration_id, "REG-0001");
    assert_eq!(receipt.status, RegistrationStatus::Pending);

    let registrations = desk.registrations();
    assert_eq!(registrations.len(), 1);
    let record = &registrations[0];
    assert_eq!(record.session_id, id);
    assert_eq!(record.child_reference, "child-001");
    assert_eq!(record.price, 60);
    assert_eq!(record.slot_id, SlotId("2024-03-22T1400".to_string()));
    assert!(!record.awaiting_payment());

    let counts = tab_counts(&registrations);
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.validated + counts.completed, 0);
    assert_eq!(
        by_status(&registrations, RegistrationStatus::Pending).count(),
        1
    );
}

#[tokio::test]
async fn second_guardian_is_turned_away_when_the_desk_runs_out_of_places() {
    let desk = Arc::new(BookingDesk::with_capacity("2024-03-22T1400", 1));
    let service = service(desk.clone());
    let first = drive_to_confirmation(&service, "child-001");
    let second = drive_to_confirmation(&service, "child-002");

    service.submit(&first).await.expect("first booking fits");

    match service.submit(&second).await {
        Err(EnrollmentServiceError::Enrollment(EnrollmentError::SubmissionRejected {
            reason_code,
            detail,
        })) => {
            assert_eq!(reason_code, "slot_full");
            assert!(detail.contains("2024-03-22T1400"));
        }
        other => panic!("expected slot_full rejection, got {other:?}"),
    }

    let view = service.view(&second).expect("rejected session is kept");
    assert_eq!(view.phase, Phase::Confirmation);

    service.back(&second).expect("step back");
    let view = service.back(&second).expect("step back again");
    assert_eq!(view.phase, Phase::SlotSelection);
    assert!(view.selected_slot.is_some(), "slot choice survives stepping back");

    let cancelled = service.cancel(&second).expect("cancellable");
    assert_eq!(cancelled.discarded_documents, 4);
    assert_eq!(desk.registrations().len(), 1);
}
