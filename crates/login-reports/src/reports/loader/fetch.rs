use super::{LoadError, ReportRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Source of raw report bodies, one file per request.
#[async_trait]
pub trait ReportFetcher: Send + Sync {
    async fn fetch(&self, request: &ReportRequest) -> Result<String, LoadError>;
}

#[async_trait]
impl<T: ReportFetcher + ?Sized> ReportFetcher for Box<T> {
    async fn fetch(&self, request: &ReportRequest) -> Result<String, LoadError> {
        (**self).fetch(request).await
    }
}

#[async_trait]
impl<T: ReportFetcher + ?Sized> ReportFetcher for std::sync::Arc<T> {
    async fn fetch(&self, request: &ReportRequest) -> Result<String, LoadError> {
        (**self).fetch(request).await
    }
}

/// Issues `GET <base>/<report-name>/<date>.<ext>?env=<env>`.
#[derive(Debug, Clone)]
pub struct HttpReportFetcher {
    client: reqwest::Client,
    base: Url,
}

impl HttpReportFetcher {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LoadError::Client)?;
        Ok(Self::with_client(client, base))
    }

    pub fn with_client(client: reqwest::Client, mut base: Url) -> Self {
        // `Url::join` replaces the last segment unless the base ends with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }

    pub fn url_for(&self, request: &ReportRequest) -> Result<Url, LoadError> {
        let path = request.relative_path();
        let mut url = self
            .base
            .join(&path)
            .map_err(|source| LoadError::Url { path, source })?;
        url.query_pairs_mut().append_pair("env", &request.env);
        Ok(url)
    }
}

#[async_trait]
impl ReportFetcher for HttpReportFetcher {
    async fn fetch(&self, request: &ReportRequest) -> Result<String, LoadError> {
        let url = self.url_for(request)?;
        let path = request.relative_path();
        debug!(%url, "fetching report file");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| LoadError::Http {
                path: path.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                path,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| LoadError::Http { path, source })
    }
}

/// Reads report files from a local mirror with the same layout as the HTTP
/// source. The `env` tag does not select a directory.
#[derive(Debug, Clone)]
pub struct DirectoryReportFetcher {
    root: PathBuf,
}

impl DirectoryReportFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, request: &ReportRequest) -> PathBuf {
        self.root.join(request.relative_path())
    }
}

#[async_trait]
impl ReportFetcher for DirectoryReportFetcher {
    async fn fetch(&self, request: &ReportRequest) -> Result<String, LoadError> {
        let path = self.path_for(request);
        debug!(path = %path.display(), "reading report file");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| LoadError::Io {
                path: path.display().to_string(),
                source,
            })
    }
}

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
struct CachedBody {
    body: String,
    fetched_at: Instant,
}

/// Keeps successful bodies in memory keyed by (report, date, env).
///
/// Entries expire after `ttl`, so republished files (today's partial file
/// included) are fetched again. At most `capacity` bodies are kept; expired
/// entries go first, then the oldest. Failures are not cached, so a retry
/// after an error reaches the inner fetcher.
pub struct MemoizedFetcher<F> {
    inner: F,
    ttl: Duration,
    capacity: usize,
    bodies: Mutex<HashMap<ReportRequest, CachedBody>>,
}

impl<F: ReportFetcher> MemoizedFetcher<F> {
    pub fn new(inner: F) -> Self {
        Self::with_limits(inner, DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_limits(inner: F, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            ttl,
            capacity: capacity.max(1),
            bodies: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached(&self) -> usize {
        self.bodies.lock().expect("report cache mutex poisoned").len()
    }

    pub fn clear(&self) {
        self.bodies
            .lock()
            .expect("report cache mutex poisoned")
            .clear();
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F: ReportFetcher> ReportFetcher for MemoizedFetcher<F> {
    async fn fetch(&self, request: &ReportRequest) -> Result<String, LoadError> {
        let hit = self
            .bodies
            .lock()
            .expect("report cache mutex poisoned")
            .get(request)
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.body.clone());
        if let Some(body) = hit {
            debug!(path = %request.relative_path(), "report cache hit");
            return Ok(body);
        }

        let body = self.inner.fetch(request).await?;
        self.store(request, &body);
        Ok(body)
    }
}

impl<F> MemoizedFetcher<F> {
    fn store(&self, request: &ReportRequest, body: &str) {
        let mut bodies = self.bodies.lock().expect("report cache mutex poisoned");
        bodies.remove(request);

        if bodies.len() >= self.capacity {
            let ttl = self.ttl;
            bodies.retain(|_, cached| cached.fetched_at.elapsed() < ttl);
        }
        while bodies.len() >= self.capacity {
            let oldest = bodies
                .iter()
                .min_by_key(|(_, cached)| cached.fetched_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    debug!(path = %key.relative_path(), "evicting cached report");
                    bodies.remove(&key);
                }
                None => break,
            }
        }

        bodies.insert(
            request.clone(),
            CachedBody {
                body: body.to_string(),
                fetched_at: Instant::now(),
            },
        );
    }
}
