use crate::cli::ServeArgs;
use crate::infra::{
    load_catalog, AgendaBookingProvider, AppState, InMemoryLeadRepository,
    InMemoryNotificationProvider,
};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use dental_intake::config::AppConfig;
use dental_intake::diagnosis::DiagnosisEngine;
use dental_intake::error::AppError;
use dental_intake::intake::IntakeService;
use dental_intake::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
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

    let catalog = load_catalog(config.clinic.catalog_dir.as_deref())?;
    let engine = Arc::new(DiagnosisEngine::new(Arc::new(catalog)));
    let intake_service = Arc::new(IntakeService::new(
        engine,
        Arc::new(InMemoryLeadRepository::default()),
        Arc::new(AgendaBookingProvider::new()),
        Arc::new(InMemoryNotificationProvider::default()),
        config.clinic.whatsapp_number.clone(),
    ));

    let app = with_intake_routes(intake_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "dental intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
