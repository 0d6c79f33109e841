//! Display-ready tables shared by every report.

use super::aggregate::saturating_sum;
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::io::Write;

pub const TOTAL_LABEL: &str = "Total";

/// One grid cell. Every cell has a display form; cells whose display form is
/// lossy also carry a raw form used for CSV export.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Count(u64),
    /// A ratio in `0.0..=1.0`, shown as a percentage.
    Percent(f64),
    Labeled {
        label: String,
        display: String,
        raw: Option<String>,
    },
}

impl Cell {
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    pub fn display(&self) -> String {
        match self {
            Self::Text(value) => value.clone(),
            Self::Count(value) => value.to_string(),
            Self::Percent(ratio) => format_percent(*ratio),
            Self::Labeled { display, .. } => display.clone(),
        }
    }

    pub fn raw(&self) -> Option<String> {
        match self {
            Self::Text(_) => None,
            Self::Count(value) => Some(value.to_string()),
            Self::Percent(ratio) => Some(ratio.to_string()),
            Self::Labeled { raw, .. } => raw.clone(),
        }
    }

    /// Value written by CSV export: raw when present, display otherwise.
    pub fn export_value(&self) -> String {
        self.raw().unwrap_or_else(|| self.display())
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Self::Count(value)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(value) => serializer.serialize_str(value),
            Self::Count(value) => serializer.serialize_u64(*value),
            Self::Percent(ratio) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("display", &format_percent(*ratio))?;
                map.serialize_entry("raw", ratio)?;
                map.end()
            }
            Self::Labeled {
                label,
                display,
                raw,
            } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("label", label)?;
                map.serialize_entry("display", display)?;
                if let Some(raw) = raw {
                    map.serialize_entry("raw", raw)?;
                }
                map.end()
            }
        }
    }
}

/// Whole percentages print without decimals, everything else with one.
pub fn format_percent(ratio: f64) -> String {
    let percent = ratio * 100.0;
    if (percent - percent.round()).abs() < f64::EPSILON {
        format!("{:.0}%", percent)
    } else {
        format!("{:.1}%", percent)
    }
}

/// Optional parts of a tabulated report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableLayout {
    /// Append a trailing column summing each row across the date axis.
    pub total_column: bool,
    /// Append a footer row of column totals.
    pub footer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub body: Vec<Vec<Cell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Vec<Cell>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            body: Vec::new(),
            footer: None,
        }
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.header.len(), "row width must match header");
        self.body.push(row);
    }

    pub fn set_footer(&mut self, footer: Vec<Cell>) {
        debug_assert_eq!(footer.len(), self.header.len(), "footer width must match header");
        self.footer = Some(footer);
    }

    /// True when every body row, and the footer, is as wide as the header.
    pub fn is_rectangular(&self) -> bool {
        let width = self.width();
        self.body.iter().all(|row| row.len() == width)
            && self.footer.as_ref().map_or(true, |footer| footer.len() == width)
    }

    /// Sum of the count cells in one column of the body.
    pub fn column_total(&self, index: usize) -> u64 {
        saturating_sum(
            self.body
                .iter()
                .filter_map(|row| row.get(index).and_then(Cell::as_count)),
        )
    }

    /// Footer summing every count column after `label_columns`; the first label
    /// column reads "Total" and the rest are blank.
    pub fn totals_footer(&self, label_columns: usize) -> Vec<Cell> {
        (0..self.width())
            .map(|index| {
                if index == 0 {
                    Cell::from(TOTAL_LABEL)
                } else if index < label_columns {
                    Cell::empty()
                } else {
                    Cell::Count(self.column_total(index))
                }
            })
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.header)?;
        for row in self.body.iter().chain(self.footer.iter()) {
            csv_writer.write_record(row.iter().map(Cell::export_value))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String, csv::Error> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Sorted, de-duplicated dates.
pub fn date_axis<I>(dates: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    dates.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

pub fn date_label(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
