use super::common::*;
use chrono::Months;

use crate::workflows::enrollment::{
    DocumentLedger, DocumentRequirement, DocumentStatus, EnrollmentError, FileRejection,
    MediaType, MAX_FILE_SIZE,
};

#[test]
fn fresh_ledger_starts_every_requirement_missing() {
    let ledger = ledger();
    assert_eq!(ledger.records().len(), 4);
    assert!(ledger
        .records()
        .iter()
        .all(|record| record.status == DocumentStatus::Missing && record.file.is_none()));
    assert!(!ledger.is_complete());
}

#[test]
fn attach_records_file_and_validity_window() {
    let mut ledger = ledger();

    let record = ledger
        .attach(&req("medical"), &pdf("certificate.pdf"), now())
        .expect("pdf accepted");

    assert_eq!(record.status, DocumentStatus::Uploaded);
    assert_eq!(record.uploaded_at, Some(now()));
    assert_eq!(record.expires_at, now().checked_add_months(Months::new(6)));
    let attached = record.file.as_ref().expect("file kept");
    assert_eq!(attached.media_type, MediaType::Pdf);
    assert_eq!(attached.name, "certificate.pdf");
}

#[test]
fn requirements_without_validity_never_expire() {
    let mut ledger = ledger();
    let record = ledger
        .attach(&req("consent"), &pdf("consent.pdf"), now())
        .expect("pdf accepted");
    assert_eq!(record.expires_at, None);
}

#[test]
fn attach_refuses_unsupported_formats_without_touching_the_ledger() {
    let mut ledger = ledger();
    let before = ledger.clone();

    match ledger.attach(&req("consent"), &file("scan.gif", "image/gif", 1024), now()) {
        Err(EnrollmentError::InvalidFile(FileRejection::UnsupportedMediaType(raw))) => {
            assert_eq!(raw, "image/gif");
        }
        other => panic!("expected unsupported media type, got {other:?}"),
    }
    assert_eq!(ledger, before);
}

#[test]
fn attach_refuses_files_over_the_size_limit() {
    let mut ledger = ledger();

    match ledger.attach(
        &req("insurance"),
        &file("policy.pdf", "application/pdf", MAX_FILE_SIZE + 1),
        now(),
    ) {
        Err(EnrollmentError::InvalidFile(FileRejection::TooLarge { size, limit })) => {
            assert_eq!(size, MAX_FILE_SIZE + 1);
            assert_eq!(limit, 5 * 1024 * 1024);
        }
        other => panic!("expected size rejection, got {other:?}"),
    }
    assert_eq!(ledger.status_of(&req("insurance")), Some(DocumentStatus::Missing));
}

#[test]
fn attach_accepts_boundary_size_and_image_aliases() {
    let mut ledger = ledger();
    ledger
        .attach(
            &req("consent"),
            &file("consent.pdf", "application/pdf", MAX_FILE_SIZE),
            now(),
        )
        .expect("exactly five megabytes is allowed");
    ledger
        .attach(&req("parental"), &file("photo.jpg", "image/jpg", 2048), now())
        .expect("image/jpg is accepted");
    ledger
        .attach(&req("insurance"), &file("card.png", "IMAGE/PNG", 2048), now())
        .expect("media types are case-insensitive");

    assert_eq!(
        ledger
            .record(&req("parental"))
            .and_then(|record| record.file.as_ref())
            .map(|file| file.media_type),
        Some(MediaType::Jpeg)
    );
}

#[test]
fn attach_then_remove_restores_the_original_record() {
    let mut ledger = ledger();
    let before = ledger.clone();

    ledger
        .attach(&req("medical"), &pdf("certificate.pdf"), now())
        .expect("pdf accepted");
    assert!(ledger.remove(&req("medical")).expect("known requirement"));

    assert_eq!(ledger, before);
}

#[test]
fn removing_an_empty_slot_is_a_no_op() {
    let mut ledger = ledger();
    assert!(!ledger.remove(&req("consent")).expect("known requirement"));
    assert_eq!(ledger.status_of(&req("consent")), Some(DocumentStatus::Missing));
}

#[test]
fn reviewer_cannot_judge_a_missing_document() {
    let mut ledger = ledger();
    match ledger.mark_validated(&req("consent")) {
        Err(EnrollmentError::InvalidTransition { requirement, from, to }) => {
            assert_eq!(requirement, req("consent"));
            assert_eq!(from, DocumentStatus::Missing);
            assert_eq!(to, DocumentStatus::Validated);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn reviewer_verdicts_follow_the_document_lifecycle() {
    let mut ledger = ledger();
    ledger
        .attach(&req("medical"), &pdf("certificate.pdf"), now())
        .expect("pdf accepted");

    match ledger.mark_expired(&req("medical")) {
        Err(EnrollmentError::InvalidTransition { from, to, .. }) => {
            assert_eq!(from, DocumentStatus::Uploaded);
            assert_eq!(to, DocumentStatus::Expired);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }

    ledger.mark_validated(&req("medical")).expect("uploaded");
    ledger.mark_validated(&req("medical")).expect("repeat verdict");
    ledger.mark_expired(&req("medical")).expect("validated");

    match ledger.mark_validated(&req("medical")) {
        Err(EnrollmentError::InvalidTransition { from, to, .. }) => {
            assert_eq!(from, DocumentStatus::Expired);
            assert_eq!(to, DocumentStatus::Validated);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    assert_eq!(ledger.status_of(&req("medical")), Some(DocumentStatus::Expired));

    ledger
        .attach(&req("medical"), &pdf("certificate-2024.pdf"), now())
        .expect("expired documents can be replaced");
    ledger.mark_invalid(&req("medical")).expect("uploaded");
    assert!(ledger.mark_validated(&req("medical")).is_err());
}

#[test]
fn unknown_requirements_are_reported() {
    let mut ledger = ledger();
    match ledger.attach(&req("passport"), &pdf("passport.pdf"), now()) {
        Err(EnrollmentError::UnknownRequirement(id)) => assert_eq!(id, req("passport")),
        other => panic!("expected unknown requirement, got {other:?}"),
    }
}

#[test]
fn completeness_requires_uploaded_or_validated_required_documents() {
    let mut ledger = ledger();
    for id in requirement_ids() {
        ledger
            .attach(&id, &pdf(&format!("{id}.pdf")), now())
            .expect("pdf accepted");
    }
    assert!(ledger.is_complete());

    ledger.mark_validated(&req("consent")).expect("uploaded");
    assert!(ledger.is_complete());

    ledger.mark_invalid(&req("parental")).expect("uploaded");
    assert!(!ledger.is_complete());

    ledger
        .attach(&req("parental"), &pdf("parental-v2.pdf"), now())
        .expect("invalid documents can be replaced");
    assert!(ledger.is_complete());

    ledger.mark_validated(&req("insurance")).expect("uploaded");
    ledger.mark_expired(&req("insurance")).expect("validated");
    assert!(!ledger.is_complete());
}

#[test]
fn optional_requirements_do_not_block_completion() {
    let requirements = vec![
        DocumentRequirement {
            id: req("consent"),
            name: "Family consent".to_string(),
            required: true,
            description: String::new(),
            max_age_months: None,
        },
        DocumentRequirement {
            id: req("photo"),
            name: "Photo".to_string(),
            required: false,
            description: String::new(),
            max_age_months: None,
        },
    ];
    let mut ledger = DocumentLedger::new(&requirements);
    ledger
        .attach(&req("consent"), &pdf("consent.pdf"), now())
        .expect("pdf accepted");

    assert!(ledger.is_complete());
    assert_eq!(ledger.submittable().count(), 1);
}

#[test]
fn expire_stale_demotes_only_lapsed_validated_documents() {
    let mut ledger = ledger();
    ledger
        .attach(&req("medical"), &pdf("certificate.pdf"), now())
        .expect("pdf accepted");
    ledger.mark_validated(&req("medical")).expect("uploaded");
    ledger
        .attach(&req("consent"), &pdf("consent.pdf"), now())
        .expect("pdf accepted");

    let within = now().checked_add_months(Months::new(5)).expect("in range");
    assert!(ledger.expire_stale(within).is_empty());

    let lapsed = now().checked_add_months(Months::new(7)).expect("in range");
    assert_eq!(ledger.expire_stale(lapsed), vec![req("medical")]);
    assert_eq!(ledger.status_of(&req("medical")), Some(DocumentStatus::Expired));
    assert_eq!(ledger.status_of(&req("consent")), Some(DocumentStatus::Uploaded));
}

#[test]
fn summary_reports_counts_and_rounded_completion() {
    let mut ledger = ledger();
    assert_eq!(ledger.summary().completion_percentage, 0);

    for id in requirement_ids() {
        ledger
            .attach(&id, &pdf(&format!("{id}.pdf")), now())
            .expect("pdf accepted");
    }
    ledger.mark_validated(&req("consent")).expect("uploaded");
    ledger.mark_validated(&req("parental")).expect("uploaded");
    ledger.mark_validated(&req("insurance")).expect("uploaded");
    ledger.mark_validated(&req("medical")).expect("uploaded");
    ledger.mark_expired(&req("medical")).expect("validated");

    let summary = ledger.summary();
    assert_eq!(summary.total, 4);
    assert_eq!(summary.validated, 3);
    assert_eq!(summary.expired, 1);
    assert_eq!(summary.missing, 0);
    assert_eq!(summary.completion_percentage, 75);
    assert_eq!(summary.expired_documents, vec!["Medical certificate".to_string()]);
}

#[test]
fn summary_rounds_thirds_half_up() {
    let requirements: Vec<_> = requirements().into_iter().take(3).collect();
    let mut ledger = DocumentLedger::new(&requirements);
    for requirement in &requirements {
        ledger
            .attach(&requirement.id, &pdf("doc.pdf"), now())
            .expect("pdf accepted");
    }
    ledger.mark_validated(&requirements[0].id).expect("uploaded");
    assert_eq!(ledger.summary().completion_percentage, 33);

    ledger.mark_validated(&requirements[1].id).expect("uploaded");
    assert_eq!(ledger.summary().completion_percentage, 67);
}

#[test]
fn empty_ledger_is_complete() {
    let ledger = DocumentLedger::new(&[]);
    assert!(ledger.is_complete());
    assert_eq!(ledger.summary().completion_percentage, 100);
}
