use super::domain::{Ial, UnknownValue};
use chrono::{Duration, NaiveDate};
use url::form_urlencoded;

pub const DEFAULT_ENV: &str = "prod";
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("failed to parse {field} '{value}' as YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
    #[error(transparent)]
    Ial(#[from] UnknownValue),
    #[error("finish {finish} is before start {start}")]
    ReversedRange { start: NaiveDate, finish: NaiveDate },
}

/// The date range, agency, IAL, and env a report is viewed with.
///
/// Filters are never edited in place: every `with_*` call returns a new value,
/// and the query string is re-derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    start: NaiveDate,
    finish: NaiveDate,
    ial: Option<Ial>,
    agency: Option<String>,
    env: String,
}

impl ReportFilter {
    pub fn new(start: NaiveDate, finish: NaiveDate) -> Self {
        Self {
            start,
            finish,
            ial: None,
            agency: None,
            env: DEFAULT_ENV.to_string(),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn finish(&self) -> NaiveDate {
        self.finish
    }

    pub fn ial(&self) -> Option<Ial> {
        self.ial
    }

    pub fn agency(&self) -> Option<&str> {
        self.agency.as_deref()
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn with_range(&self, start: NaiveDate, finish: NaiveDate) -> Self {
        Self {
            start,
            finish,
            ..self.clone()
        }
    }

    pub fn with_ial(&self, ial: Option<Ial>) -> Self {
        Self {
            ial,
            ..self.clone()
        }
    }

    pub fn with_agency<S: Into<String>>(&self, agency: Option<S>) -> Self {
        Self {
            agency: agency
                .map(Into::into)
                .filter(|value: &String| !value.trim().is_empty()),
            ..self.clone()
        }
    }

    pub fn with_env(&self, env: impl Into<String>) -> Self {
        let env = env.into();
        Self {
            env: if env.trim().is_empty() {
                DEFAULT_ENV.to_string()
            } else {
                env
            },
            ..self.clone()
        }
    }

    /// Whether `date` falls inside the inclusive window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.finish
    }

    pub fn matches_agency(&self, agency: &str) -> bool {
        self.agency.as_deref().map_or(true, |wanted| wanted == agency)
    }

    pub fn matches_ial(&self, ial: Ial) -> bool {
        self.ial.map_or(true, |wanted| wanted == ial)
    }

    /// `start=..&finish=..[&ial=..][&agency=..]&env=..`
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("start", &self.start.format("%Y-%m-%d").to_string());
        serializer.append_pair("finish", &self.finish.format("%Y-%m-%d").to_string());
        if let Some(ial) = self.ial {
            serializer.append_pair("ial", ial.label());
        }
        if let Some(agency) = &self.agency {
            serializer.append_pair("agency", agency);
        }
        serializer.append_pair("env", &self.env);
        serializer.finish()
    }

    /// A filter over the given bounds. A missing bound extends the window to
    /// a week from the other one; without either, the week ending on `today`.
    pub fn from_bounds(
        start: Option<NaiveDate>,
        finish: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, FilterError> {
        let window = Duration::days(DEFAULT_WINDOW_DAYS - 1);
        let (start, finish) = match (start, finish) {
            (Some(start), Some(finish)) => (start, finish),
            (Some(start), None) => (start, start + window),
            (None, Some(finish)) => (finish - window, finish),
            (None, None) => (today - window, today),
        };
        if finish < start {
            return Err(FilterError::ReversedRange { start, finish });
        }
        Ok(Self::new(start, finish))
    }

    /// Parses a query string; keys this filter does not own are ignored.
    pub fn from_query(query: &str, today: NaiveDate) -> Result<Self, FilterError> {
        let pairs = form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()));
        Self::from_pairs(pairs, today)
    }

    pub fn from_pairs<I, K, V>(pairs: I, today: NaiveDate) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut start = None;
        let mut finish = None;
        let mut ial = None;
        let mut agency = None;
        let mut env = None;

        for (key, value) in pairs {
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "start" => start = Some(parse_date("start", value)?),
                "finish" => finish = Some(parse_date("finish", value)?),
                "ial" => ial = Some(value.parse::<Ial>()?),
                "agency" => agency = Some(value.to_string()),
                "env" => env = Some(value.to_string()),
                _ => {}
            }
        }

        Ok(Self::from_bounds(start, finish, today)?
            .with_ial(ial)
            .with_agency(agency)
            .with_env(env.unwrap_or_else(|| DEFAULT_ENV.to_string())))
    }
}

pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| FilterError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, month, day).expect("valid date")
    }

    #[test]
    fn updates_produce_new_filters() {
        let base = ReportFilter::new(d(1, 1), d(1, 7));
        let narrowed = base.with_agency(Some("agency1")).with_ial(Some(Ial::Two));

        assert_eq!(base.agency(), None);
        assert_eq!(base.ial(), None);
        assert_eq!(narrowed.agency(), Some("agency1"));
        assert_eq!(narrowed.ial(), Some(Ial::Two));
        assert_eq!(narrowed.start(), base.start());
    }

    #[test]
    fn query_string_round_trips_through_parse() {
        let filter = ReportFilter::new(d(1, 1), d(1, 2))
            .with_agency(Some("Dept. of Examples & Tests"))
            .with_ial(Some(Ial::One))
            .with_env("int");

        let query = filter.to_query_string();
        assert_eq!(
            query,
            "start=2021-01-01&finish=2021-01-02&ial=1&agency=Dept.+of+Examples+%26+Tests&env=int"
        );
        assert_eq!(ReportFilter::from_query(&query, d(6, 1)).expect("parses"), filter);
    }

    #[test]
    fn missing_bounds_default_to_a_week() {
        let today = d(3, 10);
        let filter = ReportFilter::from_query("", today).expect("parses");
        assert_eq!(filter.start(), d(3, 4));
        assert_eq!(filter.finish(), today);
        assert_eq!(filter.env(), DEFAULT_ENV);

        let filter = ReportFilter::from_query("?start=2021-02-01", today).expect("parses");
        assert_eq!(filter.finish(), d(2, 7));

        let filter = ReportFilter::from_query("finish=2021-02-07&ial=", today).expect("parses");
        assert_eq!(filter.start(), d(2, 1));
        assert_eq!(filter.ial(), None);
    }

    #[test]
    fn bounds_fill_in_the_missing_side() {
        let today = d(3, 10);
        let filter = ReportFilter::from_bounds(None, Some(d(2, 7)), today).expect("valid");
        assert_eq!((filter.start(), filter.finish()), (d(2, 1), d(2, 7)));
        assert_eq!(filter.env(), DEFAULT_ENV);

        assert_eq!(
            ReportFilter::from_bounds(Some(d(2, 2)), Some(d(2, 1)), today),
            Err(FilterError::ReversedRange {
                start: d(2, 2),
                finish: d(2, 1)
            })
        );
        assert!(filter.contains(d(2, 1)));
        assert!(filter.contains(d(2, 7)));
        assert!(!filter.contains(d(2, 8)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let today = d(3, 10);
        assert_eq!(
            ReportFilter::from_query("start=01/02/2021", today),
            Err(FilterError::InvalidDate {
                field: "start",
                value: "01/02/2021".to_string()
            })
        );
        assert!(matches!(
            ReportFilter::from_query("ial=3", today),
            Err(FilterError::Ial(_))
        ));
        assert!(matches!(
            ReportFilter::from_query("start=2021-02-02&finish=2021-02-01", today),
            Err(FilterError::ReversedRange { .. })
        ));
    }

    #[test]
    fn empty_filters_match_everything() {
        let filter = ReportFilter::new(d(1, 1), d(1, 1));
        assert!(filter.matches_agency("anything"));
        assert!(filter.matches_ial(Ial::Two));

        let filter = filter.with_agency(Some("agency1")).with_ial(Some(Ial::One));
        assert!(filter.matches_agency("agency1"));
        assert!(!filter.matches_agency("Agency1"));
        assert!(!filter.matches_ial(Ial::Two));
    }
}
