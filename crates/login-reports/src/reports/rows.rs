//! Raw row shapes as published in each report file.

use super::domain::{FunnelStep, Ial, ReportKind};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// A row type that can be loaded from the files of one report.
pub trait ReportRow: DeserializeOwned + Send + 'static {
    const KIND: ReportKind;
}

/// A parsed row tagged with the day of the file it was loaded from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dated<R> {
    pub date: NaiveDate,
    pub row: R,
}

impl<R> Dated<R> {
    pub fn new(date: NaiveDate, row: R) -> Self {
        Self { date, row }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthRow {
    #[serde(default)]
    pub count: u64,
    pub ial: Ial,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub issuer: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub friendly_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub agency: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub iaa: Option<String>,
}

impl ReportRow for AuthRow {
    const KIND: ReportKind = ReportKind::DailyAuths;
}

/// One issuer's funnel counts for a single day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct DropoffRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub issuer: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub friendly_name: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub iaa: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub agency: Option<String>,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub welcome: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub agreement: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub capture_document: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub cap_doc_submit: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub ssn: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub verify_info: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub verify_submit: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub phone: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub encrypt: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub personal_key: u64,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub verified: u64,
}

impl DropoffRow {
    pub fn step_count(&self, step: FunnelStep) -> u64 {
        match step {
            FunnelStep::Welcome => self.welcome,
            FunnelStep::Agreement => self.agreement,
            FunnelStep::CaptureDocument => self.capture_document,
            FunnelStep::CapDocSubmit => self.cap_doc_submit,
            FunnelStep::Ssn => self.ssn,
            FunnelStep::VerifyInfo => self.verify_info,
            FunnelStep::VerifySubmit => self.verify_submit,
            FunnelStep::Phone => self.phone,
            FunnelStep::Encrypt => self.encrypt,
            FunnelStep::PersonalKey => self.personal_key,
            FunnelStep::Verified => self.verified,
        }
    }
}

impl ReportRow for DropoffRow {
    const KIND: ReportKind = ReportKind::DailyDropoffs;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct RegistrationRow {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub fully_registered_users: u64,
}

impl ReportRow for RegistrationRow {
    const KIND: ReportKind = ReportKind::DailyRegistrations;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct DeletionRow {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub deleted_users: u64,
    #[serde(default)]
    pub fully_registered_users: u64,
}

impl ReportRow for DeletionRow {
    const KIND: ReportKind = ReportKind::AccountDeletions;
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn count_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}
