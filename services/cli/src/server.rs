use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::report_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use login_reports::config::AppConfig;
use login_reports::error::AppError;
use login_reports::reports::{fetcher_from_config, ReportService};
use login_reports::telemetry::{self, LogSink};
use std::sync::atomic::{AtomicBool, Ordering};
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

    telemetry::init(&config.telemetry, LogSink::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        reports: Arc::new(ReportService::new(fetcher_from_config(&config.source)?)),
        default_env: config.source.env.clone(),
    };

    let app = report_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        source = ?config.source.location,
        "report service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
