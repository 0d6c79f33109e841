use super::aggregate::{ratio, sum_latest_snapshot};
use super::filter::ReportFilter;
use super::rows::{Dated, DeletionRow};
use super::table::{date_label, Cell, Table, TableLayout};
use chrono::NaiveDate;
use serde::Serialize;
use std::ops::AddAssign;

const RATE_LABEL: &str = "Deletion Rate";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionCounts {
    pub deleted_users: u64,
    pub fully_registered_users: u64,
}

impl DeletionCounts {
    /// Deleted accounts per fully registered account; 0 without registrations.
    pub fn rate(&self) -> f64 {
        ratio(self.deleted_users, self.fully_registered_users)
    }
}

impl AddAssign for DeletionCounts {
    fn add_assign(&mut self, other: Self) {
        self.deleted_users = self.deleted_users.saturating_add(other.deleted_users);
        self.fully_registered_users = self
            .fully_registered_users
            .saturating_add(other.fully_registered_users);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeletionDay {
    pub date: NaiveDate,
    pub counts: DeletionCounts,
    pub rate: f64,
}

/// One entry per date inside the filter window; a date repeated across files
/// is taken from the newest one.
pub fn aggregate_deletions(
    rows: &[Dated<DeletionRow>],
    filter: &ReportFilter,
) -> Vec<DeletionDay> {
    sum_latest_snapshot(
        rows.iter()
            .map(|dated| {
                (
                    dated.row.date.unwrap_or(dated.date),
                    dated.date,
                    DeletionCounts {
                        deleted_users: dated.row.deleted_users,
                        fully_registered_users: dated.row.fully_registered_users,
                    },
                )
            })
            .filter(|(effective, _, _)| filter.contains(*effective)),
    )
    .into_iter()
    .map(|(date, counts)| DeletionDay {
        date,
        counts,
        rate: counts.rate(),
    })
    .collect()
}

pub fn tabulate_deletions(
    rows: &[Dated<DeletionRow>],
    filter: &ReportFilter,
    layout: TableLayout,
) -> Table {
    let days = aggregate_deletions(rows, filter);

    let mut table = Table::new(vec![
        "Date".to_string(),
        "Deleted Users".to_string(),
        "Fully Registered".to_string(),
        RATE_LABEL.to_string(),
    ]);

    let mut totals = DeletionCounts::default();
    for day in &days {
        table.push_row(vec![
            Cell::from(date_label(day.date)),
            Cell::Count(day.counts.deleted_users),
            Cell::Count(day.counts.fully_registered_users),
            rate_cell(day.rate),
        ]);
        totals += day.counts;
    }

    if layout.footer {
        let mut footer = table.totals_footer(1);
        footer[3] = rate_cell(totals.rate());
        table.set_footer(footer);
    }

    table
}

/// Deletion rates are small, so they keep two decimals.
fn rate_cell(rate: f64) -> Cell {
    Cell::Labeled {
        label: RATE_LABEL.to_string(),
        display: format!("{:.2}%", rate * 100.0),
        raw: Some(rate.to_string()),
    }
}
