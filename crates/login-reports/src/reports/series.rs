//! Chart-ready time series.

use super::daily_auths::{agency_daily_totals, AuthAggregate};
use super::deletions::DeletionDay;
use super::domain::ReportKind;
use super::registrations::RegistrationDay;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeriesError {
    #[error("unknown series '{0}'")]
    UnknownKind(String),
    #[error("series '{kind}' is not available for the {report} report")]
    Unsupported { kind: SeriesKind, report: ReportKind },
}

/// Every series a chart can plot. Legend labels match on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Authentications,
    NewUsers,
    FullyRegisteredUsers,
    CumulativeUsers,
    CumulativeFullyRegisteredUsers,
    DeletedUsers,
    DeletionRate,
}

impl SeriesKind {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Authentications,
            Self::NewUsers,
            Self::FullyRegisteredUsers,
            Self::CumulativeUsers,
            Self::CumulativeFullyRegisteredUsers,
            Self::DeletedUsers,
            Self::DeletionRate,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Authentications => "authentications",
            Self::NewUsers => "new_users",
            Self::FullyRegisteredUsers => "fully_registered_users",
            Self::CumulativeUsers => "cumulative_users",
            Self::CumulativeFullyRegisteredUsers => "cumulative_fully_registered_users",
            Self::DeletedUsers => "deleted_users",
            Self::DeletionRate => "deletion_rate",
        }
    }

    pub const fn legend_label(self) -> &'static str {
        match self {
            Self::Authentications => "Authentications",
            Self::NewUsers => "New Users",
            Self::FullyRegisteredUsers => "Fully Registered Users",
            Self::CumulativeUsers => "Total Users",
            Self::CumulativeFullyRegisteredUsers => "Total Fully Registered Users",
            Self::DeletedUsers => "Deleted Users",
            Self::DeletionRate => "Deletion Rate",
        }
    }

    pub const fn report(self) -> ReportKind {
        match self {
            Self::Authentications => ReportKind::DailyAuths,
            Self::NewUsers
            | Self::FullyRegisteredUsers
            | Self::CumulativeUsers
            | Self::CumulativeFullyRegisteredUsers => ReportKind::DailyRegistrations,
            Self::DeletedUsers | Self::DeletionRate => ReportKind::AccountDeletions,
        }
    }

    pub(crate) fn require(self, report: ReportKind) -> Result<(), SeriesError> {
        if self.report() == report {
            Ok(())
        } else {
            Err(SeriesError::Unsupported { kind: self, report })
        }
    }
}

impl FromStr for SeriesKind {
    type Err = SeriesError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.key() == needle)
            .ok_or_else(|| SeriesError::UnknownKind(needle.to_string()))
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub kind: SeriesKind,
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    fn new(kind: SeriesKind, points: Vec<SeriesPoint>) -> Self {
        Self {
            kind,
            label: kind.legend_label().to_string(),
            points,
        }
    }
}

/// One authentication series per agency, labeled with the agency name.
pub fn auths_by_agency(aggregates: &[AuthAggregate], dates: &[NaiveDate]) -> Vec<Series> {
    agency_daily_totals(aggregates)
        .into_iter()
        .map(|(agency, daily)| Series {
            kind: SeriesKind::Authentications,
            label: agency,
            points: dates
                .iter()
                .map(|date| SeriesPoint {
                    date: *date,
                    value: daily.get(date).copied().unwrap_or(0) as f64,
                })
                .collect(),
        })
        .collect()
}

pub fn registration_series(
    days: &[RegistrationDay],
    kinds: &[SeriesKind],
) -> Result<Vec<Series>, SeriesError> {
    kinds
        .iter()
        .map(|kind| {
            kind.require(ReportKind::DailyRegistrations)?;
            let points = days
                .iter()
                .map(|day| SeriesPoint {
                    date: day.date,
                    value: registration_value(day, *kind) as f64,
                })
                .collect();
            Ok(Series::new(*kind, points))
        })
        .collect()
}

fn registration_value(day: &RegistrationDay, kind: SeriesKind) -> u64 {
    match kind {
        SeriesKind::NewUsers => day.counts.total_users,
        SeriesKind::FullyRegisteredUsers => day.counts.fully_registered_users,
        SeriesKind::CumulativeUsers => day.cumulative_total_users,
        SeriesKind::CumulativeFullyRegisteredUsers => day.cumulative_fully_registered_users,
        SeriesKind::Authentications | SeriesKind::DeletedUsers | SeriesKind::DeletionRate => 0,
    }
}

pub fn deletion_series(
    days: &[DeletionDay],
    kinds: &[SeriesKind],
) -> Result<Vec<Series>, SeriesError> {
    kinds
        .iter()
        .map(|kind| {
            kind.require(ReportKind::AccountDeletions)?;
            let points = days
                .iter()
                .map(|day| SeriesPoint {
                    date: day.date,
                    value: deletion_value(day, *kind),
                })
                .collect();
            Ok(Series::new(*kind, points))
        })
        .collect()
}

fn deletion_value(day: &DeletionDay, kind: SeriesKind) -> f64 {
    match kind {
        SeriesKind::DeletedUsers => day.counts.deleted_users as f64,
        SeriesKind::DeletionRate => day.rate,
        SeriesKind::Authentications
        | SeriesKind::NewUsers
        | SeriesKind::FullyRegisteredUsers
        | SeriesKind::CumulativeUsers
        | SeriesKind::CumulativeFullyRegisteredUsers => 0.0,
    }
}
