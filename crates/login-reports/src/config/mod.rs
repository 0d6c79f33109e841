use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_SOURCE: &str = "reports";
const DEFAULT_REPORT_ENV: &str = "prod";
const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_CACHE_TTL_SECS: &str = "300";
const DEFAULT_CACHE_CAPACITY: &str = "1024";

/// Deployment stage, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything read from the process environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub source: SourceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: AppEnvironment::parse(&var_or("APP_ENV", "development")),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig {
                log_level: var_or("APP_LOG_LEVEL", "info"),
            },
            source: SourceConfig::from_env()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = var_or("APP_PORT", "3000");
        Ok(Self {
            host: var_or("APP_HOST", "127.0.0.1"),
            port: port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "APP_PORT",
                    value: port,
                })?,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.host.trim();
        let ip = if host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            host.parse().map_err(|source| ConfigError::InvalidHost {
                value: host.to_string(),
                source,
            })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where report files are read from and which `env` tag requests carry.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub location: ReportLocation,
    pub env: String,
    pub timeout: Duration,
    /// How long a fetched body is reused before the file is read again.
    pub cache_ttl: Duration,
    /// Upper bound on cached bodies.
    pub cache_capacity: usize,
}

impl SourceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let location = ReportLocation::parse(&var_or("REPORTS_SOURCE", DEFAULT_SOURCE))?;

        let env = var_or("REPORTS_ENV", DEFAULT_REPORT_ENV);
        let env = if env.trim().is_empty() {
            DEFAULT_REPORT_ENV.to_string()
        } else {
            env.trim().to_string()
        };

        let timeout = positive_var("REPORTS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let cache_ttl = positive_var("REPORTS_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?;
        let cache_capacity = positive_var("REPORTS_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?;

        Ok(Self {
            location,
            env,
            timeout: Duration::from_secs(timeout),
            cache_ttl: Duration::from_secs(cache_ttl),
            cache_capacity: usize::try_from(cache_capacity).unwrap_or(usize::MAX),
        })
    }
}

fn positive_var(var: &'static str, default: &str) -> Result<u64, ConfigError> {
    let value = var_or(var, default);
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|parsed| *parsed > 0)
        .ok_or(ConfigError::InvalidNumber { var, value })
}

/// Report files live either behind an HTTP base URL or in a local directory
/// using the same `<report-name>/<date>.<ext>` layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLocation {
    Remote(Url),
    Directory(PathBuf),
}

impl ReportLocation {
    /// `http://` and `https://` values are base URLs; anything else is a path.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptySource);
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidSource {
                value: trimmed.to_string(),
                source,
            })?;
            return Ok(Self::Remote(url));
        }

        Ok(Self::Directory(PathBuf::from(trimmed)))
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber {
        var: &'static str,
        value: String,
    },
    InvalidHost {
        value: String,
        source: std::net::AddrParseError,
    },
    InvalidSource {
        value: String,
        source: url::ParseError,
    },
    EmptySource,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} must be a positive whole number, got '{value}'")
            }
            ConfigError::InvalidHost { value, .. } => {
                write!(f, "APP_HOST '{value}' is not an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSource { value, .. } => {
                write!(f, "report source '{value}' is not a valid URL")
            }
            ConfigError::EmptySource => write!(f, "report source must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidNumber { .. } | ConfigError::EmptySource => None,
            ConfigError::InvalidHost { source, .. } => Some(source),
            ConfigError::InvalidSource { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    const VARS: [&str; 9] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "REPORTS_SOURCE",
        "REPORTS_ENV",
        "REPORTS_TIMEOUT_SECS",
        "REPORTS_CACHE_TTL_SECS",
        "REPORTS_CACHE_CAPACITY",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_read_reports_from_a_local_directory() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.source.location,
            ReportLocation::Directory(PathBuf::from("reports"))
        );
        assert_eq!(config.source.env, "prod");
        assert_eq!(config.source.timeout, Duration::from_secs(30));
        assert_eq!(config.source.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.source.cache_capacity, 1024);
    }

    #[test]
    fn localhost_binds_to_loopback() {
        let server = ServerConfig {
            host: "localhost".to_string(),
            port: 3000,
        };
        assert_eq!(
            server.socket_addr().expect("localhost resolves"),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000)
        );

        let server = ServerConfig {
            host: "reports.internal".to_string(),
            port: 3000,
        };
        assert!(matches!(
            server.socket_addr(),
            Err(ConfigError::InvalidHost { .. })
        ));
    }

    #[test]
    fn remote_sources_and_env_overrides_are_read() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REPORTS_SOURCE", "https://reports.example.gov/data/");
        env::set_var("REPORTS_ENV", " staging ");
        let config = AppConfig::load().expect("config loads");
        match config.source.location {
            ReportLocation::Remote(url) => {
                assert_eq!(url.as_str(), "https://reports.example.gov/data/")
            }
            other => panic!("expected remote location, got {other:?}"),
        }
        assert_eq!(config.source.env, "staging");
        reset_env();
    }

    #[test]
    fn timeouts_must_be_positive_seconds() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        for value in ["soon", "0"] {
            reset_env();
            env::set_var("REPORTS_TIMEOUT_SECS", value);
            let error = AppConfig::load().expect_err("timeout rejected");
            assert!(matches!(
                error,
                ConfigError::InvalidNumber {
                    var: "REPORTS_TIMEOUT_SECS",
                    ..
                }
            ));
        }
        reset_env();
    }

    #[test]
    fn cache_limits_are_read_and_validated() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REPORTS_CACHE_TTL_SECS", "60");
        env::set_var("REPORTS_CACHE_CAPACITY", "16");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.source.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.source.cache_capacity, 16);

        env::set_var("REPORTS_CACHE_CAPACITY", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                var: "REPORTS_CACHE_CAPACITY",
                ..
            })
        ));
        reset_env();
    }

    #[test]
    fn blank_sources_are_rejected() {
        assert!(matches!(
            ReportLocation::parse("  "),
            Err(ConfigError::EmptySource)
        ));
        assert!(matches!(
            ReportLocation::parse("https://"),
            Err(ConfigError::InvalidSource { .. })
        ));
    }
}
