use crate::config::ConfigError;
use crate::reports::{FilterError, LoadError, ReportError, SeriesError, UnknownValue};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Filter(FilterError),
    Report(ReportError),
    UnknownValue(UnknownValue),
    Export(csv::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Filter(_) | AppError::UnknownValue(_) => StatusCode::BAD_REQUEST,
            AppError::Report(ReportError::Series(_)) => StatusCode::BAD_REQUEST,
            AppError::Report(ReportError::Load(LoadError::InvalidRange { .. })) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Report(ReportError::Load(_)) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Filter(err) => write!(f, "invalid filter: {}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
            AppError::UnknownValue(err) => write!(f, "invalid request: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Filter(err) => Some(err),
            AppError::Report(err) => Some(err),
            AppError::UnknownValue(err) => Some(err),
            AppError::Export(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<FilterError> for AppError {
    fn from(value: FilterError) -> Self {
        Self::Filter(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}

impl From<LoadError> for AppError {
    fn from(value: LoadError) -> Self {
        Self::Report(ReportError::Load(value))
    }
}

impl From<SeriesError> for AppError {
    fn from(value: SeriesError) -> Self {
        Self::Report(ReportError::Series(value))
    }
}

impl From<UnknownValue> for AppError {
    fn from(value: UnknownValue) -> Self {
        Self::UnknownValue(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Export(value)
    }
}
