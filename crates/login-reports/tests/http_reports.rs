use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use chrono::NaiveDate;
use login_reports::reports::loader::{HttpReportFetcher, LoadError};
use login_reports::reports::{
    Cell, ReportError, ReportFilter, ReportKind, ReportService, TableRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

type Files = Arc<HashMap<String, String>>;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, d).expect("valid date")
}

async fn serve_file(
    State(files): State<Files>,
    Path((report, file)): Path<(String, String)>,
    RawQuery(query): RawQuery,
) -> Result<String, StatusCode> {
    let key = format!("{report}/{file}?{}", query.unwrap_or_default());
    files.get(&key).cloned().ok_or(StatusCode::NOT_FOUND)
}

/// Serves `files` under `/reports` on an ephemeral port and returns the base URL.
async fn spawn_source(files: HashMap<String, String>) -> Url {
    let app = Router::new()
        .route("/reports/:report/:file", get(serve_file))
        .with_state(Arc::new(files));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server runs");
    });
    Url::parse(&format!("http://{addr}/reports")).expect("valid base url")
}

fn registration_files() -> HashMap<String, String> {
    HashMap::from([
        (
            "daily-registrations-report/2021-01-01.json?env=prod".to_string(),
            r#"{"results": [{"date": "2021-01-01", "total_users": 10, "fully_registered_users": 4}]}"#
                .to_string(),
        ),
        (
            "daily-registrations-report/2021-01-02.json?env=prod".to_string(),
            r#"{"results": [{"date": "2021-01-01", "total_users": 12, "fully_registered_users": 5},
                            {"date": "2021-01-02", "total_users": 3, "fully_registered_users": 1}]}"#
                .to_string(),
        ),
    ])
}

#[tokio::test]
async fn registrations_load_over_http_with_the_env_tag() {
    let base = spawn_source(registration_files()).await;
    let fetcher = HttpReportFetcher::new(base, Duration::from_secs(5)).expect("client builds");
    let service = ReportService::new(fetcher);

    let table = service
        .table(&TableRequest::new(
            ReportKind::DailyRegistrations,
            ReportFilter::new(day(1), day(2)),
        ))
        .await
        .expect("table builds");

    assert_eq!(table.body.len(), 2);
    // The second file restates 2021-01-01, and the newer figure wins.
    assert_eq!(table.body[0][1], Cell::Count(12));
    assert_eq!(table.body[1][3], Cell::Count(15));
    assert_eq!(table.body[1][4], Cell::Count(6));
}

#[tokio::test]
async fn other_envs_are_separate_files() {
    let base = spawn_source(registration_files()).await;
    let fetcher = HttpReportFetcher::new(base, Duration::from_secs(5)).expect("client builds");
    let service = ReportService::new(fetcher);

    let error = service
        .table(&TableRequest::new(
            ReportKind::DailyRegistrations,
            ReportFilter::new(day(1), day(2)).with_env("int"),
        ))
        .await
        .expect_err("no int files are served");

    assert!(matches!(
        error,
        ReportError::Load(LoadError::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn malformed_bodies_name_the_file() {
    let files = HashMap::from([(
        "account-deletions-report/2021-01-01.json?env=prod".to_string(),
        "<html>maintenance</html>".to_string(),
    )]);
    let base = spawn_source(files).await;
    let fetcher = HttpReportFetcher::new(base, Duration::from_secs(5)).expect("client builds");
    let service = ReportService::new(fetcher);

    let error = service
        .table(&TableRequest::new(
            ReportKind::AccountDeletions,
            ReportFilter::new(day(1), day(1)),
        ))
        .await
        .expect_err("body is not json");

    match error {
        ReportError::Load(LoadError::Json { path, .. }) => {
            assert_eq!(path, "account-deletions-report/2021-01-01.json");
        }
        other => panic!("unexpected error: {other}"),
    }
}
