use async_trait::async_trait;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};
use workshop_enrollment::config::EnrollmentConfig;
use workshop_enrollment::error::AppError;
use workshop_enrollment::workflows::enrollment::registrations::{by_status, tab_counts};
use workshop_enrollment::workflows::enrollment::{
    ContentHandle, EnrollmentBlueprint, EnrollmentService, FileDescriptor, Offering,
    RegistrationRecord, RegistrationStatus, RequirementId, SessionId, SlotId, StaticCatalog,
    SubmissionPackage, SubmissionReceipt, SubmissionRejection, SubmissionSink, TabCounts,
};

pub(crate) type DeskService = EnrollmentService<StaticCatalog, InMemoryRegistrationDesk>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct DeskLedger {
    capacity: HashMap<SlotId, u32>,
    registered_sessions: HashSet<SessionId>,
    registrations: Vec<RegistrationRecord>,
}

/// Administrative desk kept in process memory. It owns the live slot capacity
/// and books one place per accepted enrollment.
#[derive(Default)]
pub(crate) struct InMemoryRegistrationDesk {
    ledger: Mutex<DeskLedger>,
}

impl InMemoryRegistrationDesk {
    pub(crate) fn from_offerings(offerings: &[Offering]) -> Self {
        let capacity = offerings
            .iter()
            .flat_map(|offering| offering.slots.iter())
            .map(|slot| (slot.id.clone(), slot.remaining_capacity))
            .collect();

        Self {
            ledger: Mutex::new(DeskLedger {
                capacity,
                ..DeskLedger::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DeskLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn remaining(&self, slot_id: &SlotId) -> Option<u32> {
        self.lock().capacity.get(slot_id).copied()
    }

    pub(crate) fn registrations(&self, status: Option<RegistrationStatus>) -> Vec<RegistrationRecord> {
        let ledger = self.lock();
        match status {
            Some(status) => by_status(&ledger.registrations, status).cloned().collect(),
            None => ledger.registrations.clone(),
        }
    }

    pub(crate) fn tab_counts(&self) -> TabCounts {
        tab_counts(&self.lock().registrations)
    }
}

#[async_trait]
impl SubmissionSink for InMemoryRegistrationDesk {
    async fn submit(
        &self,
        package: SubmissionPackage,
    ) -> Result<SubmissionReceipt, SubmissionRejection> {
        let mut ledger = self.lock();

        if ledger.registered_sessions.contains(&package.session_id) {
            warn!(session = %package.session_id, "duplicate enrollment refused");
            return Err(SubmissionRejection::new(
                "duplicate_session",
                format!("session {} is already registered", package.session_id),
            ));
        }

        let places = ledger.capacity.entry(package.slot.id.clone()).or_insert(0);
        if *places == 0 {
            warn!(slot = %package.slot.id, "enrollment refused, slot is full");
            return Err(SubmissionRejection::new(
                "slot_full",
                format!(
                    "the {} session at {} has no places left",
                    package.slot.date,
                    package.slot.time_window()
                ),
            ));
        }
        *places -= 1;

        let registration_id = format!("REG-{:05}", ledger.registrations.len() + 1);
        let record = RegistrationRecord::from_package(registration_id.clone(), &package);
        ledger.registered_sessions.insert(package.session_id.clone());
        ledger.registrations.push(record);

        info!(
            registration = %registration_id,
            offering = %package.offering_id,
            slot = %package.slot.id,
            "registration booked"
        );

        Ok(SubmissionReceipt {
            registration_id,
            status: RegistrationStatus::Pending,
            received_at: Utc::now(),
        })
    }
}

/// Wire the standard catalog to an in-memory desk.
pub(crate) fn standard_service(
    config: EnrollmentConfig,
) -> Result<(Arc<DeskService>, Arc<InMemoryRegistrationDesk>), AppError> {
    let blueprint = EnrollmentBlueprint::standard();
    let catalog = Arc::new(blueprint.catalog()?);
    let desk = Arc::new(InMemoryRegistrationDesk::from_offerings(blueprint.offerings()));
    let service = Arc::new(EnrollmentService::new(
        catalog,
        desk.clone(),
        blueprint.requirements().to_vec(),
        config,
    ));
    Ok((service, desk))
}

/// Describe a local file the way an upload provider would hand it over.
pub(crate) fn describe_file(path: &Path) -> Result<FileDescriptor, AppError> {
    let metadata = std::fs::metadata(path)?;
    let media_type = mime_guess::from_path(path).first_or_octet_stream();
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(FileDescriptor {
        name,
        media_type: media_type.essence_str().to_string(),
        size: metadata.len(),
        handle: ContentHandle(format!("file://{}", path.display())),
    })
}

/// Parse a `requirement=path` pair given on the command line.
pub(crate) fn parse_attachment(raw: &str) -> Result<(RequirementId, PathBuf), String> {
    let (requirement, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected REQUIREMENT=PATH, got '{raw}'"))?;
    let requirement = requirement.trim();
    let path = path.trim();
    if requirement.is_empty() || path.is_empty() {
        return Err(format!("expected REQUIREMENT=PATH, got '{raw}'"));
    }
    Ok((RequirementId(requirement.to_string()), PathBuf::from(path)))
}
