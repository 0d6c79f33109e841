//! Identity-verification funnel drop-offs per app.

use super::aggregate::{app_order, ratio};
use super::domain::{FunnelStep, UnknownValue};
use super::filter::ReportFilter;
use super::normalizer::{normalize_dropoffs, AppIdentity, NormalizedDropoff};
use super::rows::{Dated, DropoffRow};
use super::table::{Cell, Table, TableLayout, TOTAL_LABEL};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const LABEL_COLUMNS: usize = 2;

/// What a step's percentage is measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelBaseline {
    #[default]
    FirstStep,
    PreviousStep,
}

impl FromStr for FunnelBaseline {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "first" | "first_step" => Ok(Self::FirstStep),
            "previous" | "previous_step" => Ok(Self::PreviousStep),
            other => Err(UnknownValue::Baseline(other.to_string())),
        }
    }
}

impl fmt::Display for FunnelBaseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstStep => f.write_str("first"),
            Self::PreviousStep => f.write_str("previous"),
        }
    }
}

/// Summed counts for every funnel step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FunnelCounts([u64; FunnelStep::COUNT]);

impl FunnelCounts {
    pub fn from_row(row: &DropoffRow) -> Self {
        let mut counts = Self::default();
        counts.add_row(row);
        counts
    }

    pub fn get(&self, step: FunnelStep) -> u64 {
        self.0[step.index()]
    }

    pub fn set(&mut self, step: FunnelStep, count: u64) {
        self.0[step.index()] = count;
    }

    pub fn add_row(&mut self, row: &DropoffRow) {
        for step in FunnelStep::ordered() {
            let sum = &mut self.0[step.index()];
            *sum = sum.saturating_add(row.step_count(step));
        }
    }

    pub fn add(&mut self, other: &FunnelCounts) {
        for (sum, value) in self.0.iter_mut().zip(other.0) {
            *sum = sum.saturating_add(value);
        }
    }

    pub fn percent_of_first(&self, step: FunnelStep) -> f64 {
        ratio(self.get(step), self.get(FunnelStep::first()))
    }

    /// The first step measures against itself.
    pub fn percent_of_previous(&self, step: FunnelStep) -> f64 {
        let baseline = step.previous().unwrap_or(step);
        ratio(self.get(step), self.get(baseline))
    }

    pub fn percent(&self, step: FunnelStep, baseline: FunnelBaseline) -> f64 {
        match baseline {
            FunnelBaseline::FirstStep => self.percent_of_first(step),
            FunnelBaseline::PreviousStep => self.percent_of_previous(step),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelAggregate {
    pub app: AppIdentity,
    pub counts: FunnelCounts,
}

pub fn filter_dropoffs(
    rows: &[NormalizedDropoff],
    filter: &ReportFilter,
) -> Vec<NormalizedDropoff> {
    rows.iter()
        .filter(|row| filter.matches_agency(&row.app.agency))
        .cloned()
        .collect()
}

/// Groups by issuer and sums each step independently. Agency and app name
/// come from the first row seen for the issuer.
pub fn aggregate_funnel(rows: &[NormalizedDropoff]) -> Vec<FunnelAggregate> {
    let mut groups: HashMap<&str, FunnelAggregate> = HashMap::new();

    for row in rows {
        groups
            .entry(row.app.issuer.as_str())
            .or_insert_with(|| FunnelAggregate {
                app: row.app.clone(),
                counts: FunnelCounts::default(),
            })
            .counts
            .add_row(&row.row);
    }

    let mut aggregates: Vec<FunnelAggregate> = groups.into_values().collect();
    aggregates.sort_by(|left, right| app_order(&left.app, &right.app));
    aggregates
}

pub fn tabulate_funnel(
    rows: &[Dated<DropoffRow>],
    filter: &ReportFilter,
    baseline: FunnelBaseline,
    layout: TableLayout,
) -> Table {
    let filtered = filter_dropoffs(&normalize_dropoffs(rows), filter);
    let aggregates = aggregate_funnel(&filtered);

    let mut header = vec!["Agency".to_string(), "App".to_string()];
    for step in FunnelStep::ordered() {
        header.push(step.label().to_string());
        if step != FunnelStep::first() {
            header.push(format!("{} %", step.label()));
        }
    }

    let mut table = Table::new(header);
    let mut totals = FunnelCounts::default();
    for aggregate in &aggregates {
        let mut row = vec![
            Cell::from(aggregate.app.agency.as_str()),
            Cell::from(aggregate.app.friendly_name.as_str()),
        ];
        row.extend(step_cells(&aggregate.counts, baseline));
        table.push_row(row);
        totals.add(&aggregate.counts);
    }

    if layout.footer {
        let mut footer = vec![Cell::from(TOTAL_LABEL), Cell::empty()];
        footer.extend(step_cells(&totals, baseline));
        debug_assert_eq!(footer.len(), LABEL_COLUMNS + 2 * FunnelStep::COUNT - 1);
        table.set_footer(footer);
    }

    table
}

fn step_cells(counts: &FunnelCounts, baseline: FunnelBaseline) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(2 * FunnelStep::COUNT - 1);
    for step in FunnelStep::ordered() {
        cells.push(Cell::Count(counts.get(step)));
        if step != FunnelStep::first() {
            cells.push(Cell::Percent(counts.percent(step, baseline)));
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).expect("valid date")
    }

    fn dropoff(issuer: &str, agency: &str, welcome: u64, agreement: u64) -> DropoffRow {
        DropoffRow {
            issuer: Some(issuer.to_string()),
            friendly_name: Some(format!("{issuer} app")),
            agency: Some(agency.to_string()),
            welcome,
            agreement,
            ..DropoffRow::default()
        }
    }

    #[test]
    fn percent_of_first_is_relative_to_welcome() {
        let counts = FunnelCounts::from_row(&dropoff("issuer1", "agency1", 100, 50));
        assert_eq!(counts.percent_of_first(FunnelStep::Agreement), 0.5);
        assert_eq!(counts.percent_of_first(FunnelStep::Welcome), 1.0);
    }

    #[test]
    fn zero_baselines_yield_zero_not_nan() {
        let counts = FunnelCounts::from_row(&dropoff("issuer1", "agency1", 0, 0));
        for step in FunnelStep::ordered() {
            assert_eq!(counts.percent_of_first(step), 0.0);
            assert_eq!(counts.percent_of_previous(step), 0.0);
        }
    }

    #[test]
    fn percent_of_previous_uses_the_prior_step() {
        let mut counts = FunnelCounts::default();
        counts.set(FunnelStep::Welcome, 200);
        counts.set(FunnelStep::Agreement, 100);
        counts.set(FunnelStep::CaptureDocument, 25);

        assert_eq!(counts.percent_of_previous(FunnelStep::CaptureDocument), 0.25);
        assert_eq!(counts.percent_of_first(FunnelStep::CaptureDocument), 0.125);
        assert_eq!(counts.percent_of_previous(FunnelStep::Welcome), 1.0);
        assert_eq!(counts.percent_of_previous(FunnelStep::CapDocSubmit), 0.0);
    }

    #[test]
    fn step_sums_saturate() {
        let mut counts = FunnelCounts::from_row(&dropoff("issuer1", "agency1", u64::MAX, 1));
        counts.add_row(&dropoff("issuer1", "agency1", 5, 1));
        counts.add(&FunnelCounts::from_row(&dropoff("issuer1", "agency1", 1, 1)));

        assert_eq!(counts.get(FunnelStep::Welcome), u64::MAX);
        assert_eq!(counts.get(FunnelStep::Agreement), 3);
    }

    #[test]
    fn aggregation_sums_steps_per_issuer_across_days() {
        let rows = vec![
            Dated::new(d(1), dropoff("issuer1", "agency1", 100, 50)),
            Dated::new(d(2), dropoff("issuer1", "agency1", 20, 10)),
            Dated::new(d(1), dropoff("issuer2", "agency0", 5, 5)),
        ];
        let aggregates = aggregate_funnel(&normalize_dropoffs(&rows));

        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].app.agency, "agency0");
        assert_eq!(aggregates[1].counts.get(FunnelStep::Welcome), 120);
        assert_eq!(aggregates[1].counts.get(FunnelStep::Agreement), 60);
        assert_eq!(aggregates[1].counts.get(FunnelStep::Verified), 0);
    }

    #[test]
    fn table_has_count_and_percent_columns_after_the_first_step() {
        let rows = vec![Dated::new(d(1), dropoff("issuer1", "agency1", 100, 50))];
        let filter = ReportFilter::new(d(1), d(1));
        let table = tabulate_funnel(
            &rows,
            &filter,
            FunnelBaseline::FirstStep,
            TableLayout::default(),
        );

        assert_eq!(table.width(), 2 + 2 * FunnelStep::COUNT - 1);
        assert_eq!(
            &table.header[..5],
            &["Agency", "App", "Welcome", "Agreement", "Agreement %"]
        );
        assert_eq!(table.body[0][1], Cell::from("issuer1 app"));
        assert_eq!(table.body[0][2], Cell::Count(100));
        assert_eq!(table.body[0][3], Cell::Count(50));
        assert_eq!(table.body[0][4], Cell::Percent(0.5));
        assert!(table.is_rectangular());
    }

    #[test]
    fn footer_recomputes_percentages_from_totals() {
        let rows = vec![
            Dated::new(d(1), dropoff("issuer1", "agency1", 100, 50)),
            Dated::new(d(1), dropoff("issuer2", "agency1", 300, 50)),
        ];
        let filter = ReportFilter::new(d(1), d(1));
        let layout = TableLayout {
            footer: true,
            ..TableLayout::default()
        };
        let table = tabulate_funnel(&rows, &filter, FunnelBaseline::FirstStep, layout);

        let footer = table.footer.as_ref().expect("footer requested");
        assert_eq!(footer[0], Cell::from(TOTAL_LABEL));
        assert_eq!(footer[2], Cell::Count(400));
        assert_eq!(footer[3], Cell::Count(100));
        assert_eq!(footer[4], Cell::Percent(0.25));
        assert!(table.is_rectangular());
    }

    #[test]
    fn agency_filter_applies_before_grouping() {
        let rows = vec![
            Dated::new(d(1), dropoff("issuer1", "agency1", 100, 50)),
            Dated::new(d(1), dropoff("issuer2", "agency2", 300, 50)),
        ];
        let filter = ReportFilter::new(d(1), d(1)).with_agency(Some("agency2"));
        let table = tabulate_funnel(
            &rows,
            &filter,
            FunnelBaseline::PreviousStep,
            TableLayout::default(),
        );

        assert_eq!(table.body.len(), 1);
        assert_eq!(table.body[0][0], Cell::from("agency2"));
    }

    #[test]
    fn baseline_parses_from_short_names() {
        assert_eq!(
            "first".parse::<FunnelBaseline>(),
            Ok(FunnelBaseline::FirstStep)
        );
        assert_eq!(
            "previous".parse::<FunnelBaseline>(),
            Ok(FunnelBaseline::PreviousStep)
        );
        assert!("last".parse::<FunnelBaseline>().is_err());
    }
}
