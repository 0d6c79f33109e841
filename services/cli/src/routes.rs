use crate::infra::{parse_flag, today, AppState};
use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use login_reports::error::AppError;
use login_reports::reports::{
    FunnelBaseline, ReportFilter, ReportKind, SeriesKind, Table, TableLayout, TableRequest,
};
use serde::Serialize;
use serde_json::json;

type QueryPairs = Vec<(String, String)>;

#[derive(Debug, Serialize)]
pub(crate) struct ReportResponse {
    pub(crate) report: ReportKind,
    pub(crate) title: &'static str,
    pub(crate) query: String,
    pub(crate) table: Table,
}

pub(crate) fn report_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/reports/:report", get(report_endpoint))
        .route("/api/v1/reports/:report/series", get(series_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound; also reports the `env` requests default to.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(std::sync::atomic::Ordering::Acquire) {
        (
            StatusCode::OK,
            Json(json!({ "status": "ready", "default_env": state.default_env })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn report_endpoint(
    Extension(state): Extension<AppState>,
    Path(report): Path<String>,
    Query(params): Query<QueryPairs>,
) -> Result<Response, AppError> {
    let kind = report.parse::<ReportKind>()?;
    let filter = request_filter(&params, &state.default_env)?;

    let baseline = match param(&params, "baseline") {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<FunnelBaseline>()?,
        _ => FunnelBaseline::default(),
    };
    let request = TableRequest {
        layout: TableLayout {
            total_column: param(&params, "totals").map_or(false, parse_flag),
            footer: param(&params, "footer").map_or(false, parse_flag),
        },
        baseline,
        ..TableRequest::new(kind, filter)
    };

    let table = state.reports.table(&request).await?;

    if param(&params, "format").map(str::trim) == Some("csv") {
        let filename = format!(
            "{}-{}-{}.csv",
            kind.short_name(),
            request.filter.start(),
            request.filter.finish()
        );
        let disposition = format!("attachment; filename=\"{filename}\"");
        let body = table.to_csv_string()?;
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            body,
        )
            .into_response());
    }

    Ok(Json(ReportResponse {
        report: kind,
        title: kind.label(),
        query: request.filter.to_query_string(),
        table,
    })
    .into_response())
}

/// `series` may be repeated or comma separated; without it every series the
/// report offers is returned.
pub(crate) async fn series_endpoint(
    Extension(state): Extension<AppState>,
    Path(report): Path<String>,
    Query(params): Query<QueryPairs>,
) -> Result<Response, AppError> {
    let kind = report.parse::<ReportKind>()?;
    let filter = request_filter(&params, &state.default_env)?;

    let mut requested = Vec::new();
    for (_, value) in params.iter().filter(|(key, _)| key == "series") {
        for tag in value.split(',').filter(|tag| !tag.trim().is_empty()) {
            requested.push(tag.parse::<SeriesKind>()?);
        }
    }
    if requested.is_empty() {
        requested = SeriesKind::ordered()
            .into_iter()
            .filter(|series| series.report() == kind)
            .collect();
    }

    let series = state.reports.series(kind, &filter, &requested).await?;
    Ok(Json(json!({
        "report": kind,
        "query": filter.to_query_string(),
        "series": series,
    }))
    .into_response())
}

fn param<'a>(params: &'a QueryPairs, key: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

fn request_filter(params: &QueryPairs, default_env: &str) -> Result<ReportFilter, AppError> {
    let filter = ReportFilter::from_pairs(
        params.iter().map(|(key, value)| (key.as_str(), value.as_str())),
        today(),
    )?;
    let env_given = param(params, "env").is_some_and(|env| !env.trim().is_empty());
    Ok(if env_given {
        filter
    } else {
        filter.with_env(default_env)
    })
}
