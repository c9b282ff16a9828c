use crate::infra::{AppState, DeskService, InMemoryRegistrationDesk};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use workshop_enrollment::workflows::enrollment::{enrollment_router, RegistrationStatus};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RegistrationQuery {
    #[serde(default)]
    pub(crate) status: Option<String>,
}

pub(crate) fn with_enrollment_routes(
    service: Arc<DeskService>,
    desk: Arc<InMemoryRegistrationDesk>,
) -> Router {
    let registrations = Router::new()
        .route("/api/v1/registrations", get(registrations_endpoint))
        .with_state(desk);

    enrollment_router(service)
        .merge(registrations)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Registrations grouped the way the guardian's tabs show them.
pub(crate) async fn registrations_endpoint(
    State(desk): State<Arc<InMemoryRegistrationDesk>>,
    Query(query): Query<RegistrationQuery>,
) -> Response {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => match RegistrationStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                let payload = json!({
                    "error": format!("unknown registration status '{raw}'"),
                    "code": "bad_request",
                });
                return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
            }
        },
    };

    let registrations = desk.registrations(status);
    let payload = json!({
        "tabs": desk.tab_counts(),
        "registrations": registrations,
    });
    (StatusCode::OK, Json(payload)).into_response()
}
