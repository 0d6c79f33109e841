use chrono::{NaiveDate, Utc};
use login_reports::reports::service::ConfiguredFetcher;
use login_reports::reports::ReportService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) reports: Arc<ReportService<ConfiguredFetcher>>,
    /// `env` used when a request does not name one.
    pub(crate) default_env: String,
}

/// Reports are dated in UTC.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Query flags accept `1`, `true`, `yes` and `on`; a bare `?footer` counts too.
pub(crate) fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "" | "1" | "true" | "yes" | "on"
    )
}
