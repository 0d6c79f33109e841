use super::aggregate::{cumulative, sum_latest_snapshot};
use super::filter::ReportFilter;
use super::rows::{Dated, RegistrationRow};
use super::table::{date_label, Cell, Table, TableLayout};
use chrono::NaiveDate;
use serde::Serialize;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationCounts {
    pub total_users: u64,
    pub fully_registered_users: u64,
}

impl AddAssign for RegistrationCounts {
    fn add_assign(&mut self, other: Self) {
        self.total_users = self.total_users.saturating_add(other.total_users);
        self.fully_registered_users = self
            .fully_registered_users
            .saturating_add(other.fully_registered_users);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistrationDay {
    pub date: NaiveDate,
    pub counts: RegistrationCounts,
    pub cumulative_total_users: u64,
    pub cumulative_fully_registered_users: u64,
}

/// One entry per date, ascending, with running totals.
///
/// Rows carry their own `date` when the file reports several days; otherwise
/// the file's day is used. A date reported by several files is taken from the
/// newest one. Restated days outside the filter window are dropped before the
/// running totals start.
pub fn aggregate_registrations(
    rows: &[Dated<RegistrationRow>],
    filter: &ReportFilter,
) -> Vec<RegistrationDay> {
    let by_date = sum_latest_snapshot(
        rows.iter()
            .map(|dated| {
                (
                    dated.row.date.unwrap_or(dated.date),
                    dated.date,
                    RegistrationCounts {
                        total_users: dated.row.total_users,
                        fully_registered_users: dated.row.fully_registered_users,
                    },
                )
            })
            .filter(|(effective, _, _)| filter.contains(*effective)),
    );

    let running_total = cumulative(by_date.values().map(|counts| counts.total_users));
    let running_registered =
        cumulative(by_date.values().map(|counts| counts.fully_registered_users));

    by_date
        .into_iter()
        .zip(running_total.into_iter().zip(running_registered))
        .map(|((date, counts), (total, registered))| RegistrationDay {
            date,
            counts,
            cumulative_total_users: total,
            cumulative_fully_registered_users: registered,
        })
        .collect()
}

pub fn tabulate_registrations(
    rows: &[Dated<RegistrationRow>],
    filter: &ReportFilter,
    layout: TableLayout,
) -> Table {
    let days = aggregate_registrations(rows, filter);

    let mut table = Table::new(vec![
        "Date".to_string(),
        "New Users".to_string(),
        "Fully Registered".to_string(),
        "Cumulative Users".to_string(),
        "Cumulative Fully Registered".to_string(),
    ]);

    for day in &days {
        table.push_row(vec![
            Cell::from(date_label(day.date)),
            Cell::Count(day.counts.total_users),
            Cell::Count(day.counts.fully_registered_users),
            Cell::Count(day.cumulative_total_users),
            Cell::Count(day.cumulative_fully_registered_users),
        ]);
    }

    if layout.footer {
        let mut footer = table.totals_footer(1);
        // Running totals end at the window total rather than summing.
        if let Some(last) = days.last() {
            footer[3] = Cell::Count(last.cumulative_total_users);
            footer[4] = Cell::Count(last.cumulative_fully_registered_users);
        }
        table.set_footer(footer);
    }

    table
}
