use crate::cli::ServeArgs;
use crate::infra::{standard_service, AppState, DeskService};
use crate::routes::with_enrollment_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use workshop_enrollment::config::AppConfig;
use workshop_enrollment::error::AppError;
use workshop_enrollment::telemetry;

const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (service, desk) = standard_service(config.enrollment.clone())?;
    spawn_expiry_sweep(service.clone());

    let app = with_enrollment_routes(service, desk)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        submission_timeout = ?config.enrollment.submission_timeout,
        "workshop enrollment service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically demote validated documents whose validity window has closed.
fn spawn_expiry_sweep(service: Arc<DeskService>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(EXPIRY_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            service.expire_stale_documents(Utc::now());
        }
    });
}
