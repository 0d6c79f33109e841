//! Grouping and ratio helpers shared by the report tabulators.

use super::normalizer::AppIdentity;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Sum of `values`, clamped at `u64::MAX`. Every count total in the reports
/// goes through here or `saturating_add`.
pub fn saturating_sum<I>(values: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    values.into_iter().fold(0, u64::saturating_add)
}

/// Running totals of `values`.
pub fn cumulative<I>(values: I) -> Vec<u64>
where
    I: IntoIterator<Item = u64>,
{
    values
        .into_iter()
        .scan(0u64, |running, value| {
            *running = running.saturating_add(value);
            Some(*running)
        })
        .collect()
}

/// Agency first, then app friendly name, then issuer. Case-sensitive.
pub(crate) fn app_order(left: &AppIdentity, right: &AppIdentity) -> Ordering {
    left.agency
        .cmp(&right.agency)
        .then_with(|| left.friendly_name.cmp(&right.friendly_name))
        .then_with(|| left.issuer.cmp(&right.issuer))
}

/// Sums dated values per effective date, where snapshot files may repeat
/// earlier days: only rows from the newest file mentioning a date count.
pub(crate) fn sum_latest_snapshot<V, I>(entries: I) -> BTreeMap<NaiveDate, V>
where
    V: Default + std::ops::AddAssign,
    I: IntoIterator<Item = (NaiveDate, NaiveDate, V)>,
{
    let mut by_date: BTreeMap<NaiveDate, (NaiveDate, V)> = BTreeMap::new();

    for (effective, source, value) in entries {
        match by_date.get_mut(&effective) {
            Some((seen_source, sum)) if *seen_source == source => *sum += value,
            Some((seen_source, _)) if *seen_source > source => {}
            _ => {
                by_date.insert(effective, (source, value));
            }
        }
    }

    by_date
        .into_iter()
        .map(|(date, (_, value))| (date, value))
        .collect()
}
