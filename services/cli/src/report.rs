use crate::infra::{parse_date, today};
use crate::render::render_text;
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use login_reports::config::{AppConfig, ReportLocation};
use login_reports::error::AppError;
use login_reports::reports::{
    fetcher_from_config, FilterError, FunnelBaseline, Ial, ReportFilter, ReportKind,
    ReportService, Table, TableLayout, TableRequest,
};
use login_reports::telemetry::{self, LogSink};
use std::io::Write;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Csv,
    Json,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Report to load: daily-auths, daily-dropoffs, daily-registrations or account-deletions
    pub(crate) report: ReportKind,
    /// First day of the window (YYYY-MM-DD). Defaults to six days before --finish.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Last day of the window (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) finish: Option<NaiveDate>,
    /// Only count authentications at this IAL (1 or 2)
    #[arg(long)]
    pub(crate) ial: Option<Ial>,
    /// Only include rows for this agency
    #[arg(long)]
    pub(crate) agency: Option<String>,
    /// Report environment tag (defaults to REPORTS_ENV)
    #[arg(long)]
    pub(crate) env: Option<String>,
    /// Base URL or directory to load from (defaults to REPORTS_SOURCE)
    #[arg(long)]
    pub(crate) source: Option<String>,
    /// Append a per-row total column
    #[arg(long)]
    pub(crate) totals: bool,
    /// Append a footer row of column totals
    #[arg(long)]
    pub(crate) footer: bool,
    /// Funnel percentages relative to the first or the previous step
    #[arg(long, default_value = "first")]
    pub(crate) baseline: FunnelBaseline,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

impl ReportArgs {
    pub(crate) fn filter(
        &self,
        default_env: &str,
        today: NaiveDate,
    ) -> Result<ReportFilter, FilterError> {
        Ok(ReportFilter::from_bounds(self.start, self.finish, today)?
            .with_ial(self.ial)
            .with_agency(self.agency.clone())
            .with_env(self.env.clone().unwrap_or_else(|| default_env.to_string())))
    }

    fn request(&self, filter: ReportFilter) -> TableRequest {
        TableRequest {
            layout: TableLayout {
                total_column: self.totals,
                footer: self.footer,
            },
            baseline: self.baseline,
            ..TableRequest::new(self.report, filter)
        }
    }
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(source) = args.source.as_deref() {
        config.source.location = ReportLocation::parse(source)?;
    }

    telemetry::init(&config.telemetry, LogSink::Stderr)?;

    let filter = args.filter(&config.source.env, today())?;
    let service = ReportService::new(fetcher_from_config(&config.source)?);
    let request = args.request(filter);
    let table = service.table(&request).await?;

    info!(
        report = %request.kind,
        query = %request.filter.to_query_string(),
        cached = service.loader().fetcher().cached(),
        "report loaded"
    );

    let stdout = std::io::stdout();
    write_table(stdout.lock(), &request, &table, args.format)
}

fn write_table<W: Write>(
    mut out: W,
    request: &TableRequest,
    table: &Table,
    format: OutputFormat,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Text => {
            writeln!(
                out,
                "{} ({} to {}, env {})",
                request.kind.label(),
                request.filter.start(),
                request.filter.finish(),
                request.filter.env()
            )?;
            write!(out, "{}", render_text(table))?;
        }
        OutputFormat::Csv => table.write_csv(out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, table).map_err(std::io::Error::from)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
