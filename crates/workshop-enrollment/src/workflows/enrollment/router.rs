use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::catalog::{
    AgeFilter, CatalogProvider, CategoryFilter, DepartmentFilter, FilterCriteria,
    MissingDataPolicy,
};
use super::domain::{
    Category, ChildProfile, FileDescriptor, OfferingId, RequirementId, SessionId, SlotId,
};
use super::error::EnrollmentError;
use super::service::{EnrollmentService, EnrollmentServiceError};
use super::session::ReviewVerdict;
use super::submission::SubmissionSink;

type SharedService<C, S> = Arc<EnrollmentService<C, S>>;

/// Router forwarding guardian and reviewer intents into the enrollment service.
pub fn enrollment_router<C, S>(service: SharedService<C, S>) -> Router
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    Router::new()
        .route("/api/v1/offerings", get(offerings_handler::<C, S>))
        .route(
            "/api/v1/offerings/:offering_id/price",
            get(price_handler::<C, S>),
        )
        .route("/api/v1/enrollments", post(open_handler::<C, S>))
        .route(
            "/api/v1/enrollments/:session_id",
            get(view_handler::<C, S>).delete(cancel_handler::<C, S>),
        )
        .route(
            "/api/v1/enrollments/:session_id/slot",
            post(select_slot_handler::<C, S>),
        )
        .route(
            "/api/v1/enrollments/:session_id/advance",
            post(advance_handler::<C, S>),
        )
        .route(
            "/api/v1/enrollments/:session_id/back",
            post(back_handler::<C, S>),
        )
        .route(
            "/api/v1/enrollments/:session_id/documents/:requirement_id",
            put(attach_handler::<C, S>).delete(remove_handler::<C, S>),
        )
        .route(
            "/api/v1/enrollments/:session_id/documents/:requirement_id/review",
            post(review_handler::<C, S>),
        )
        .route(
            "/api/v1/enrollments/:session_id/terms",
            post(terms_handler::<C, S>),
        )
        .route(
            "/api/v1/enrollments/:session_id/submit",
            post(submit_handler::<C, S>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub struct OfferingQuery {
    pub category: Option<String>,
    pub age_range: Option<String>,
    pub department: Option<String>,
    pub on_missing: Option<String>,
}

impl OfferingQuery {
    /// Build filter criteria, falling back to `default_policy` for offerings
    /// that lack the filtered data.
    pub fn criteria(&self, default_policy: MissingDataPolicy) -> Result<FilterCriteria, String> {
        let category = match self.category.as_deref().map(str::trim) {
            None | Some("") => CategoryFilter::All,
            Some(raw) if raw.eq_ignore_ascii_case("all") => CategoryFilter::All,
            Some(raw) => CategoryFilter::Only(
                Category::parse(raw).ok_or_else(|| format!("unknown category '{raw}'"))?,
            ),
        };

        let age_range = match self.age_range.as_deref() {
            None => AgeFilter::All,
            Some(raw) => AgeFilter::parse(raw).ok_or_else(|| format!("unknown age range '{raw}'"))?,
        };

        let on_missing = match self.on_missing.as_deref() {
            None => default_policy,
            Some(raw) => MissingDataPolicy::parse(raw)
                .ok_or_else(|| format!("unknown missing-data policy '{raw}'"))?,
        };

        Ok(FilterCriteria {
            category,
            age_range,
            department: self
                .department
                .as_deref()
                .map(DepartmentFilter::parse)
                .unwrap_or_default(),
            on_missing,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub household_index: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct OpenEnrollmentRequest {
    pub offering_id: OfferingId,
    pub child: ChildProfile,
}

#[derive(Debug, Deserialize)]
pub struct SlotSelectionRequest {
    pub slot_id: SlotId,
}

#[derive(Debug, Deserialize)]
pub struct TermsRequest {
    pub accepted: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub verdict: ReviewVerdict,
}

fn bad_request(message: String) -> Response {
    let payload = json!({ "error": message, "code": "bad_request" });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

/// HTTP status for a refused intent.
pub fn status_for(error: &EnrollmentServiceError) -> StatusCode {
    match error {
        EnrollmentServiceError::Enrollment(error) => match error {
            EnrollmentError::InvalidFile(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EnrollmentError::PhaseGuardViolation(_)
            | EnrollmentError::InvalidTransition { .. }
            | EnrollmentError::SubmissionRejected { .. } => StatusCode::CONFLICT,
            EnrollmentError::SubmissionTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            EnrollmentError::UnknownRequirement(_) | EnrollmentError::UnknownSlot(_) => {
                StatusCode::NOT_FOUND
            }
        },
        EnrollmentServiceError::Catalog(_) => StatusCode::SERVICE_UNAVAILABLE,
        EnrollmentServiceError::SessionNotFound(_) | EnrollmentServiceError::OfferingNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EnrollmentServiceError::OfferingFull(_) => StatusCode::CONFLICT,
    }
}

fn error_code(error: &EnrollmentServiceError) -> &'static str {
    match error {
        EnrollmentServiceError::Enrollment(error) => error.code(),
        EnrollmentServiceError::Catalog(_) => "catalog_unavailable",
        EnrollmentServiceError::SessionNotFound(_) => "session_not_found",
        EnrollmentServiceError::OfferingNotFound(_) => "offering_not_found",
        EnrollmentServiceError::OfferingFull(_) => "offering_full",
    }
}

fn error_response(error: EnrollmentServiceError) -> Response {
    let mut payload = json!({
        "error": error.to_string(),
        "code": error_code(&error),
    });
    if let EnrollmentServiceError::Enrollment(EnrollmentError::SubmissionRejected {
        reason_code,
        ..
    }) = &error
    {
        payload["reason_code"] = json!(reason_code);
    }
    (status_for(&error), Json(payload)).into_response()
}

fn respond<T: Serialize>(
    status: StatusCode,
    result: Result<T, EnrollmentServiceError>,
) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn offerings_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Query(query): Query<OfferingQuery>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    match query.criteria(service.config().filter_missing_data) {
        Ok(criteria) => respond(StatusCode::OK, service.browse(&criteria)),
        Err(message) => bad_request(message),
    }
}

pub(crate) async fn price_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(offering_id): Path<String>,
    Query(query): Query<PriceQuery>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    let Some(household_index) = query.household_index else {
        return bad_request("household_index is required".to_string());
    };
    respond(
        StatusCode::OK,
        service.quote(&OfferingId(offering_id), household_index),
    )
}

pub(crate) async fn open_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Json(request): Json<OpenEnrollmentRequest>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(
        StatusCode::CREATED,
        service.open(&request.offering_id, request.child),
    )
}

pub(crate) async fn view_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(StatusCode::OK, service.view(&SessionId(session_id)))
}

pub(crate) async fn cancel_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(StatusCode::OK, service.cancel(&SessionId(session_id)))
}

pub(crate) async fn select_slot_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(session_id): Path<String>,
    Json(request): Json<SlotSelectionRequest>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(
        StatusCode::OK,
        service.select_slot(&SessionId(session_id), &request.slot_id),
    )
}

pub(crate) async fn advance_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(StatusCode::OK, service.advance(&SessionId(session_id)))
}

pub(crate) async fn back_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(StatusCode::OK, service.back(&SessionId(session_id)))
}

pub(crate) async fn attach_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((session_id, requirement_id)): Path<(String, String)>,
    Json(file): Json<FileDescriptor>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(
        StatusCode::OK,
        service.attach_document(
            &SessionId(session_id),
            &RequirementId(requirement_id),
            &file,
        ),
    )
}

pub(crate) async fn remove_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((session_id, requirement_id)): Path<(String, String)>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(
        StatusCode::OK,
        service.remove_document(&SessionId(session_id), &RequirementId(requirement_id)),
    )
}

pub(crate) async fn review_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path((session_id, requirement_id)): Path<(String, String)>,
    Json(request): Json<ReviewRequest>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(
        StatusCode::OK,
        service.review_document(
            &SessionId(session_id),
            &RequirementId(requirement_id),
            request.verdict,
        ),
    )
}

pub(crate) async fn terms_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(session_id): Path<String>,
    Json(request): Json<TermsRequest>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(
        StatusCode::OK,
        service.accept_terms(&SessionId(session_id), request.accepted),
    )
}

pub(crate) async fn submit_handler<C, S>(
    State(service): State<SharedService<C, S>>,
    Path(session_id): Path<String>,
) -> Response
where
    C: CatalogProvider + 'static,
    S: SubmissionSink + 'static,
{
    respond(
        StatusCode::ACCEPTED,
        service.submit(&SessionId(session_id)).await,
    )
}
