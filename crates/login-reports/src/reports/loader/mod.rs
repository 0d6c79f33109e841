//! Per-day report loading.
//!
//! A load over `start..=finish` issues one request per calendar day, all at
//! once, and only succeeds when every day fetches and parses. The first failure
//! fails the whole window and no partial rows are returned.

mod fetch;
mod parser;

pub use fetch::{
    DirectoryReportFetcher, HttpReportFetcher, MemoizedFetcher, ReportFetcher,
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL,
};

use crate::reports::domain::ReportKind;
use crate::reports::rows::{Dated, ReportRow};
use chrono::NaiveDate;
use futures::future::try_join_all;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("report range ends on {finish} before it starts on {start}")]
    InvalidRange { start: NaiveDate, finish: NaiveDate },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("could not build report URL for {path}: {source}")]
    Url {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request for {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request for {path} returned HTTP {status}")]
    Status { path: String, status: u16 },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Parameters of a single report file fetch. Doubles as the memoization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportRequest {
    pub kind: ReportKind,
    pub date: NaiveDate,
    pub env: String,
}

impl ReportRequest {
    pub fn new(kind: ReportKind, date: NaiveDate, env: impl Into<String>) -> Self {
        Self {
            kind,
            date,
            env: env.into(),
        }
    }

    /// `<report-name>/<YYYY-MM-DD>.<json|csv>`
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}.{}",
            self.kind.slug(),
            self.date.format("%Y-%m-%d"),
            self.kind.format().extension()
        )
    }
}

/// Every calendar day from `start` through `finish`, inclusive.
pub fn days_in_range(start: NaiveDate, finish: NaiveDate) -> Result<Vec<NaiveDate>, LoadError> {
    if finish < start {
        return Err(LoadError::InvalidRange { start, finish });
    }

    Ok(start.iter_days().take_while(|day| *day <= finish).collect())
}

pub struct ReportLoader<F> {
    fetcher: F,
}

impl<F: ReportFetcher> ReportLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn load<R: ReportRow>(
        &self,
        start: NaiveDate,
        finish: NaiveDate,
        env: &str,
    ) -> Result<Vec<Dated<R>>, LoadError> {
        let days = days_in_range(start, finish)?;
        info!(report = %R::KIND, %start, %finish, days = days.len(), env, "loading report window");

        let requests = days
            .into_iter()
            .map(|date| self.load_day::<R>(ReportRequest::new(R::KIND, date, env)));

        let batches = try_join_all(requests).await.map_err(|err| {
            warn!(report = %R::KIND, error = %err, "report window failed to load");
            err
        })?;

        let rows: Vec<Dated<R>> = batches.into_iter().flatten().collect();
        debug!(report = %R::KIND, rows = rows.len(), "report window loaded");
        Ok(rows)
    }

    async fn load_day<R: ReportRow>(
        &self,
        request: ReportRequest,
    ) -> Result<Vec<Dated<R>>, LoadError> {
        let body = self.fetcher.fetch(&request).await?;
        let rows = parser::parse_body::<R>(&request, &body)?;
        Ok(rows
            .into_iter()
            .map(|row| Dated::new(request.date, row))
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{LoadError, ReportFetcher, ReportRequest};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves bodies keyed by relative path and counts every call.
    #[derive(Default)]
    pub(crate) struct StaticFetcher {
        bodies: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        pub(crate) fn with(mut self, path: &str, body: &str) -> Self {
            self.bodies.insert(path.to_string(), body.to_string());
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReportFetcher for StaticFetcher {
        async fn fetch(&self, request: &ReportRequest) -> Result<String, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = request.relative_path();
            self.bodies
                .get(&path)
                .cloned()
                .ok_or(LoadError::Status { path, status: 404 })
        }
    }
}
