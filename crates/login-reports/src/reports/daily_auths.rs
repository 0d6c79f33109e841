//! Daily authentication counts per agency, app, and IAL.

use super::aggregate::{app_order, saturating_sum};
use super::domain::Ial;
use super::filter::ReportFilter;
use super::normalizer::{normalize_auths, AppIdentity, NormalizedAuth};
use super::rows::{AuthRow, Dated};
use super::table::{date_axis, date_label, Cell, Table, TableLayout, TOTAL_LABEL};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const LABEL_COLUMNS: usize = 3;

/// Counts for one (agency, issuer, IAL) group, per day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthAggregate {
    pub app: AppIdentity,
    pub ial: Ial,
    pub daily: BTreeMap<NaiveDate, u64>,
}

impl AuthAggregate {
    pub fn count_on(&self, date: NaiveDate) -> u64 {
        self.daily.get(&date).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        saturating_sum(self.daily.values().copied())
    }
}

pub fn filter_auths(rows: &[NormalizedAuth], filter: &ReportFilter) -> Vec<NormalizedAuth> {
    rows.iter()
        .filter(|row| filter.matches_agency(&row.app.agency) && filter.matches_ial(row.ial))
        .cloned()
        .collect()
}

/// Groups by (agency, issuer, IAL) and sums `count` per day, sorted by agency,
/// app name, issuer, then IAL.
pub fn aggregate_daily_auths(rows: &[NormalizedAuth]) -> Vec<AuthAggregate> {
    let mut groups: HashMap<(&str, &str, Ial), AuthAggregate> = HashMap::new();

    for row in rows {
        let key = (row.app.agency.as_str(), row.app.issuer.as_str(), row.ial);
        let aggregate = groups.entry(key).or_insert_with(|| AuthAggregate {
            app: row.app.clone(),
            ial: row.ial,
            daily: BTreeMap::new(),
        });
        let day = aggregate.daily.entry(row.date).or_default();
        *day = day.saturating_add(row.count);
    }

    let mut aggregates: Vec<AuthAggregate> = groups.into_values().collect();
    aggregates.sort_by(|left, right| {
        app_order(&left.app, &right.app).then_with(|| left.ial.cmp(&right.ial))
    });
    aggregates
}

/// Totals per agency per day, for stacked charts.
pub fn agency_daily_totals(
    aggregates: &[AuthAggregate],
) -> BTreeMap<String, BTreeMap<NaiveDate, u64>> {
    let mut totals: BTreeMap<String, BTreeMap<NaiveDate, u64>> = BTreeMap::new();
    for aggregate in aggregates {
        let agency = totals.entry(aggregate.app.agency.clone()).or_default();
        for (date, count) in &aggregate.daily {
            let day = agency.entry(*date).or_default();
            *day = day.saturating_add(*count);
        }
    }
    totals
}

pub fn tabulate_daily_auths(
    rows: &[Dated<AuthRow>],
    filter: &ReportFilter,
    layout: TableLayout,
) -> Table {
    let filtered = filter_auths(&normalize_auths(rows), filter);
    let dates = date_axis(filtered.iter().map(|row| row.date));
    let aggregates = aggregate_daily_auths(&filtered);

    let mut header = vec!["Agency".to_string(), "App".to_string(), "IAL".to_string()];
    header.extend(dates.iter().copied().map(date_label));
    if layout.total_column {
        header.push(TOTAL_LABEL.to_string());
    }

    let mut table = Table::new(header);
    for aggregate in &aggregates {
        let mut row = vec![
            Cell::from(aggregate.app.agency.as_str()),
            Cell::from(aggregate.app.friendly_name.as_str()),
            Cell::from(aggregate.ial.label()),
        ];
        row.extend(dates.iter().map(|date| Cell::Count(aggregate.count_on(*date))));
        if layout.total_column {
            row.push(Cell::Count(aggregate.total()));
        }
        table.push_row(row);
    }

    if layout.footer {
        let footer = table.totals_footer(LABEL_COLUMNS);
        table.set_footer(footer);
    }

    table
}
