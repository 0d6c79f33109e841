//! Daily report loading, normalization and tabulation.
//!
//! Every report follows the same path: the loader fetches one file per day,
//! rows are normalized, filtered and aggregated, and the result becomes a
//! [`Table`] or a set of chart [`Series`].

pub mod aggregate;
pub mod daily_auths;
pub mod deletions;
pub mod domain;
pub mod filter;
pub mod funnel;
pub mod loader;
pub mod normalizer;
pub mod registrations;
pub mod rows;
pub mod series;
pub mod service;
pub mod table;

pub use domain::{FunnelStep, Ial, ReportFormat, ReportKind, UnknownValue};
pub use filter::{FilterError, ReportFilter};
pub use funnel::FunnelBaseline;
pub use loader::{LoadError, ReportFetcher, ReportLoader, ReportRequest};
pub use series::{Series, SeriesError, SeriesKind};
pub use service::{fetcher_from_config, ReportError, ReportService, TableRequest};
pub use table::{Cell, Table, TableLayout};
