use super::daily_auths::{aggregate_daily_auths, filter_auths, tabulate_daily_auths};
use super::deletions::{aggregate_deletions, tabulate_deletions};
use super::domain::ReportKind;
use super::filter::ReportFilter;
use super::funnel::{tabulate_funnel, FunnelBaseline};
use super::loader::{
    DirectoryReportFetcher, HttpReportFetcher, LoadError, MemoizedFetcher, ReportFetcher,
    ReportLoader,
};
use super::normalizer::normalize_auths;
use super::registrations::{aggregate_registrations, tabulate_registrations};
use super::rows::{AuthRow, DeletionRow, DropoffRow, RegistrationRow};
use super::series::{auths_by_agency, deletion_series, registration_series, Series, SeriesKind};
use super::table::{date_axis, Table, TableLayout};
use crate::config::{ReportLocation, SourceConfig};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Series(#[from] super::series::SeriesError),
}

/// Everything needed to produce one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRequest {
    pub kind: ReportKind,
    pub filter: ReportFilter,
    pub layout: TableLayout,
    pub baseline: FunnelBaseline,
}

impl TableRequest {
    pub fn new(kind: ReportKind, filter: ReportFilter) -> Self {
        Self {
            kind,
            filter,
            layout: TableLayout::default(),
            baseline: FunnelBaseline::default(),
        }
    }
}

pub type ConfiguredFetcher = MemoizedFetcher<Box<dyn ReportFetcher>>;

/// Builds the memoizing fetcher described by the source configuration,
/// bounded by its cache expiry and capacity.
pub fn fetcher_from_config(config: &SourceConfig) -> Result<ConfiguredFetcher, LoadError> {
    let fetcher: Box<dyn ReportFetcher> = match &config.location {
        ReportLocation::Remote(base) => {
            Box::new(HttpReportFetcher::new(base.clone(), config.timeout)?)
        }
        ReportLocation::Directory(root) => Box::new(DirectoryReportFetcher::new(root.clone())),
    };
    Ok(MemoizedFetcher::with_limits(
        fetcher,
        config.cache_ttl,
        config.cache_capacity,
    ))
}

/// Loads a report window and turns it into tables or chart series.
pub struct ReportService<F> {
    loader: ReportLoader<F>,
}

impl<F: ReportFetcher> ReportService<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            loader: ReportLoader::new(fetcher),
        }
    }

    pub fn loader(&self) -> &ReportLoader<F> {
        &self.loader
    }

    pub async fn table(&self, request: &TableRequest) -> Result<Table, ReportError> {
        let filter = &request.filter;
        let (start, finish, env) = (filter.start(), filter.finish(), filter.env());

        let table = match request.kind {
            ReportKind::DailyAuths => {
                let rows = self.loader.load::<AuthRow>(start, finish, env).await?;
                tabulate_daily_auths(&rows, filter, request.layout)
            }
            ReportKind::DailyDropoffs => {
                let rows = self.loader.load::<DropoffRow>(start, finish, env).await?;
                tabulate_funnel(&rows, filter, request.baseline, request.layout)
            }
            ReportKind::DailyRegistrations => {
                let rows = self.loader.load::<RegistrationRow>(start, finish, env).await?;
                tabulate_registrations(&rows, filter, request.layout)
            }
            ReportKind::AccountDeletions => {
                let rows = self.loader.load::<DeletionRow>(start, finish, env).await?;
                tabulate_deletions(&rows, filter, request.layout)
            }
        };

        info!(
            report = %request.kind,
            rows = table.body.len(),
            columns = table.width(),
            "report tabulated"
        );
        Ok(table)
    }

    /// Chart series for `kind`. Asking for a series another report owns fails
    /// before anything is fetched.
    pub async fn series(
        &self,
        kind: ReportKind,
        filter: &ReportFilter,
        series: &[SeriesKind],
    ) -> Result<Vec<Series>, ReportError> {
        for requested in series {
            requested.require(kind)?;
        }
        if series.is_empty() {
            return Ok(Vec::new());
        }

        let (start, finish, env) = (filter.start(), filter.finish(), filter.env());
        let charted = match kind {
            ReportKind::DailyAuths => {
                let rows = self.loader.load::<AuthRow>(start, finish, env).await?;
                let filtered = filter_auths(&normalize_auths(&rows), filter);
                let dates = date_axis(filtered.iter().map(|row| row.date));
                auths_by_agency(&aggregate_daily_auths(&filtered), &dates)
            }
            ReportKind::DailyRegistrations => {
                let rows = self.loader.load::<RegistrationRow>(start, finish, env).await?;
                registration_series(&aggregate_registrations(&rows, filter), series)?
            }
            ReportKind::AccountDeletions => {
                let rows = self.loader.load::<DeletionRow>(start, finish, env).await?;
                deletion_series(&aggregate_deletions(&rows, filter), series)?
            }
            // No series kind maps to the funnel, so `require` rejected it above.
            ReportKind::DailyDropoffs => Vec::new(),
        };

        Ok(charted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::loader::testing::StaticFetcher;
    use crate::reports::series::SeriesError;
    use crate::reports::table::Cell;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).expect("valid date")
    }

    fn fetcher() -> StaticFetcher {
        StaticFetcher::default()
            .with(
                "daily-auths-report/2021-01-01.json",
                r#"{"results": [{"count": 100, "ial": 1, "issuer": "issuer1", "agency": "agency1"},
                                {"count": 1, "ial": 2, "issuer": "issuer1", "agency": "agency1"}]}"#,
            )
            .with(
                "daily-auths-report/2021-01-02.json",
                r#"{"results": [{"count": 111, "ial": 1, "issuer": "issuer1", "agency": "agency1"}]}"#,
            )
            .with(
                "daily-dropoffs-report/2021-01-01.csv",
                "issuer,friendly_name,agency,welcome,agreement\nissuer1,App,agency1,100,50\n",
            )
            .with(
                "daily-dropoffs-report/2021-01-02.csv",
                "issuer,friendly_name,agency,welcome,agreement\nissuer1,App,agency1,0,0\n",
            )
            .with(
                "daily-registrations-report/2021-01-01.json",
                r#"{"results": [{"date": "2021-01-01", "total_users": 10, "fully_registered_users": 4}]}"#,
            )
            .with(
                "daily-registrations-report/2021-01-02.json",
                r#"{"results": [{"date": "2021-01-02", "total_users": 6, "fully_registered_users": 2}]}"#,
            )
    }

    #[tokio::test]
    async fn auth_tables_are_built_from_loaded_days() {
        let service = ReportService::new(fetcher());
        let request = TableRequest::new(ReportKind::DailyAuths, ReportFilter::new(d(1), d(2)));

        let table = service.table(&request).await.expect("table builds");
        assert_eq!(
            table.header,
            vec!["Agency", "App", "IAL", "2021-01-01", "2021-01-02"]
        );
        assert_eq!(table.body[1][4], Cell::Count(0));
    }

    #[tokio::test]
    async fn funnel_tables_sum_the_whole_window() {
        let service = ReportService::new(fetcher());
        let request = TableRequest::new(ReportKind::DailyDropoffs, ReportFilter::new(d(1), d(2)));

        let table = service.table(&request).await.expect("table builds");
        assert_eq!(table.body.len(), 1);
        assert_eq!(table.body[0][2], Cell::Count(100));
        assert_eq!(table.body[0][4], Cell::Percent(0.5));
    }

    #[tokio::test]
    async fn registration_series_are_charted() {
        let service = ReportService::new(fetcher());
        let series = service
            .series(
                ReportKind::DailyRegistrations,
                &ReportFilter::new(d(1), d(2)),
                &[SeriesKind::CumulativeUsers],
            )
            .await
            .expect("series builds");

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].points[1].value, 16.0);
    }

    #[tokio::test]
    async fn registration_tables_stay_inside_the_window() {
        let service = ReportService::new(StaticFetcher::default().with(
            "daily-registrations-report/2021-01-01.json",
            r#"{"results": [{"date": "2020-06-01", "total_users": 500, "fully_registered_users": 1},
                            {"date": "2021-01-01", "total_users": 10, "fully_registered_users": 4}]}"#,
        ));
        let filter = ReportFilter::new(d(1), d(1));

        let table = service
            .table(&TableRequest::new(ReportKind::DailyRegistrations, filter.clone()))
            .await
            .expect("table builds");
        assert_eq!(table.body.len(), 1);
        assert_eq!(table.body[0][3], Cell::Count(10));
        assert_eq!(table.body[0][4], Cell::Count(4));

        let series = service
            .series(
                ReportKind::DailyRegistrations,
                &filter,
                &[SeriesKind::CumulativeUsers],
            )
            .await
            .expect("series builds");
        assert_eq!(series[0].points.len(), 1);
        assert_eq!(series[0].points[0].value, 10.0);
    }

    #[tokio::test]
    async fn mismatched_series_fail_before_fetching() {
        let service = ReportService::new(fetcher());
        let error = service
            .series(
                ReportKind::DailyDropoffs,
                &ReportFilter::new(d(1), d(2)),
                &[SeriesKind::DeletionRate],
            )
            .await
            .expect_err("funnel has no deletion series");

        assert!(matches!(
            error,
            ReportError::Series(SeriesError::Unsupported { .. })
        ));
        assert_eq!(service.loader().fetcher().calls(), 0);
    }

    #[tokio::test]
    async fn missing_days_surface_as_load_errors() {
        let service = ReportService::new(fetcher());
        let request = TableRequest::new(ReportKind::AccountDeletions, ReportFilter::new(d(1), d(1)));

        let error = service.table(&request).await.expect_err("no deletion files");
        assert!(matches!(error, ReportError::Load(LoadError::Status { .. })));
    }
}
