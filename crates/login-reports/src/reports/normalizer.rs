use super::domain::{Ial, NO_AGENCY, NO_APP, NO_ISSUER};
use super::rows::{AuthRow, Dated, DropoffRow};
use chrono::NaiveDate;
use serde::Serialize;

/// Who a row belongs to, with every label filled in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AppIdentity {
    pub agency: String,
    pub issuer: String,
    pub friendly_name: String,
}

impl AppIdentity {
    /// A missing friendly name falls back to the issuer before the generic
    /// placeholder, so unnamed apps stay distinguishable.
    pub fn from_fields(
        agency: Option<&str>,
        issuer: Option<&str>,
        friendly_name: Option<&str>,
    ) -> Self {
        let agency = clean_label(agency);
        let issuer = clean_label(issuer);
        let friendly_name = clean_label(friendly_name).or_else(|| issuer.clone());

        Self {
            agency: agency.unwrap_or_else(|| NO_AGENCY.to_string()),
            issuer: issuer.unwrap_or_else(|| NO_ISSUER.to_string()),
            friendly_name: friendly_name.unwrap_or_else(|| NO_APP.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedAuth {
    pub date: NaiveDate,
    pub app: AppIdentity,
    pub ial: Ial,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedDropoff {
    pub date: NaiveDate,
    pub app: AppIdentity,
    pub row: DropoffRow,
}

pub fn normalize_auths(rows: &[Dated<AuthRow>]) -> Vec<NormalizedAuth> {
    rows.iter()
        .map(|dated| NormalizedAuth {
            date: dated.date,
            app: AppIdentity::from_fields(
                dated.row.agency.as_deref(),
                dated.row.issuer.as_deref(),
                dated.row.friendly_name.as_deref(),
            ),
            ial: dated.row.ial,
            count: dated.row.count,
        })
        .collect()
}

pub fn normalize_dropoffs(rows: &[Dated<DropoffRow>]) -> Vec<NormalizedDropoff> {
    rows.iter()
        .map(|dated| NormalizedDropoff {
            date: dated.date,
            app: AppIdentity::from_fields(
                dated.row.agency.as_deref(),
                dated.row.issuer.as_deref(),
                dated.row.friendly_name.as_deref(),
            ),
            row: dated.row.clone(),
        })
        .collect()
}

fn clean_label(value: Option<&str>) -> Option<String> {
    let cleaned = value?.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}
