use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// HTTP client crates that log every per-day request at debug level.
const QUIET_DEPENDENCIES: [&str; 2] = ["hyper", "reqwest"];

#[derive(Debug)]
pub enum TelemetryError {
    Filter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Filter { value, source } => {
                write!(f, "invalid log filter '{}': {}", value, source)
            }
            TelemetryError::Subscriber(err) => {
                write!(f, "could not install the log subscriber: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::Filter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Stdout,
    /// Used when stdout carries report output.
    Stderr,
}

/// Installs the global fmt subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &TelemetryConfig, sink: LogSink) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_for(&config.log_level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact();

    let installed = match sink {
        LogSink::Stdout => builder.try_init(),
        LogSink::Stderr => builder
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init(),
    };
    installed.map_err(TelemetryError::Subscriber)
}

/// Builds the filter for a configured level, capping the HTTP client crates
/// at `warn` unless the level names them itself.
pub fn filter_for(level: &str) -> Result<EnvFilter, TelemetryError> {
    let level = level.trim();
    let mut directives = if level.is_empty() {
        "info".to_string()
    } else {
        level.to_string()
    };
    for dependency in QUIET_DEPENDENCIES {
        if !directives.contains(dependency) {
            directives.push_str(&format!(",{dependency}=warn"));
        }
    }

    EnvFilter::try_new(&directives).map_err(|source| TelemetryError::Filter {
        value: level.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_clients_are_quieted_by_default() {
        let filter = filter_for("debug").expect("valid filter").to_string();
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn explicit_dependency_levels_are_kept() {
        let filter = filter_for("info,reqwest=trace")
            .expect("valid filter")
            .to_string();
        assert!(filter.contains("reqwest=trace"));
        assert!(!filter.contains("reqwest=warn"));
        assert!(filter.contains("hyper=warn"));
    }
}
