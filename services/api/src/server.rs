use crate::cli::ServeArgs;
use crate::infra::{build_services, seed_users, AppState};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use triangular::config::AppConfig;
use triangular::error::AppError;
use triangular::events::TracingEventPublisher;
use triangular::telemetry;
use tracing::info;

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

    let services = build_services(
        Arc::new(TracingEventPublisher),
        config.ledger.clone(),
        config.storage.clone(),
    );
    if let Some(path) = args.seed.take() {
        let seeded = seed_users(&services, &path).await?;
        info!(seeded, path = %path.display(), "user directory seeded");
    }

    let app = with_marketplace_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        max_attempts = config.ledger.max_attempts,
        store_timeout_ms = config.storage.timeout.as_millis() as u64,
        "triangular marketplace api ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
