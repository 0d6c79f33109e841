use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NO_AGENCY: &str = "(No Agency)";
pub const NO_ISSUER: &str = "(No Issuer)";
pub const NO_APP: &str = "(No App)";

/// Raised when an enumerated value arrives in a form no variant accepts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnknownValue {
    #[error("unknown IAL '{0}': expected 1 or 2")]
    Ial(String),
    #[error("unknown report '{0}'")]
    Report(String),
    #[error("unknown funnel step '{0}'")]
    FunnelStep(String),
    #[error("unknown funnel baseline '{0}': expected first or previous")]
    Baseline(String),
}

/// Identity assurance level of an authentication or proofing event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Ial {
    One,
    Two,
}

impl Ial {
    pub const fn ordered() -> [Self; 2] {
        [Self::One, Self::Two]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::One => "1",
            Self::Two => "2",
        }
    }
}

impl TryFrom<u8> for Ial {
    type Error = UnknownValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            other => Err(UnknownValue::Ial(other.to_string())),
        }
    }
}

impl From<Ial> for u8 {
    fn from(value: Ial) -> Self {
        match value {
            Ial::One => 1,
            Ial::Two => 2,
        }
    }
}

impl FromStr for Ial {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "1" => Ok(Self::One),
            "2" => Ok(Self::Two),
            other => Err(UnknownValue::Ial(other.to_string())),
        }
    }
}

impl fmt::Display for Ial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stages of the identity-proofing flow. Declaration order is the funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStep {
    Welcome,
    Agreement,
    CaptureDocument,
    CapDocSubmit,
    Ssn,
    VerifyInfo,
    VerifySubmit,
    Phone,
    Encrypt,
    PersonalKey,
    Verified,
}

impl FunnelStep {
    pub const COUNT: usize = 11;

    pub const fn ordered() -> [Self; Self::COUNT] {
        [
            Self::Welcome,
            Self::Agreement,
            Self::CaptureDocument,
            Self::CapDocSubmit,
            Self::Ssn,
            Self::VerifyInfo,
            Self::VerifySubmit,
            Self::Phone,
            Self::Encrypt,
            Self::PersonalKey,
            Self::Verified,
        ]
    }

    pub const fn first() -> Self {
        Self::Welcome
    }

    /// Position within [`FunnelStep::ordered`].
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn previous(self) -> Option<Self> {
        self.index()
            .checked_sub(1)
            .map(|index| Self::ordered()[index])
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Agreement => "agreement",
            Self::CaptureDocument => "capture_document",
            Self::CapDocSubmit => "cap_doc_submit",
            Self::Ssn => "ssn",
            Self::VerifyInfo => "verify_info",
            Self::VerifySubmit => "verify_submit",
            Self::Phone => "phone",
            Self::Encrypt => "encrypt",
            Self::PersonalKey => "personal_key",
            Self::Verified => "verified",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Agreement => "Agreement",
            Self::CaptureDocument => "Capture Document",
            Self::CapDocSubmit => "Submit Document",
            Self::Ssn => "SSN",
            Self::VerifyInfo => "Verify Info",
            Self::VerifySubmit => "Verify Submit",
            Self::Phone => "Phone",
            Self::Encrypt => "Encrypt",
            Self::PersonalKey => "Personal Key",
            Self::Verified => "Verified",
        }
    }
}

impl FromStr for FunnelStep {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        Self::ordered()
            .into_iter()
            .find(|step| step.key() == needle)
            .ok_or_else(|| UnknownValue::FunnelStep(needle.to_string()))
    }
}

/// Body format a report file is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// The periodic reports this crate knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    DailyAuths,
    DailyDropoffs,
    DailyRegistrations,
    AccountDeletions,
}

impl ReportKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::DailyAuths,
            Self::DailyDropoffs,
            Self::DailyRegistrations,
            Self::AccountDeletions,
        ]
    }

    /// Directory name under the report base URL.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::DailyAuths => "daily-auths-report",
            Self::DailyDropoffs => "daily-dropoffs-report",
            Self::DailyRegistrations => "daily-registrations-report",
            Self::AccountDeletions => "account-deletions-report",
        }
    }

    pub const fn short_name(self) -> &'static str {
        match self {
            Self::DailyAuths => "daily-auths",
            Self::DailyDropoffs => "daily-dropoffs",
            Self::DailyRegistrations => "daily-registrations",
            Self::AccountDeletions => "account-deletions",
        }
    }

    pub const fn format(self) -> ReportFormat {
        match self {
            Self::DailyDropoffs => ReportFormat::Csv,
            Self::DailyAuths | Self::DailyRegistrations | Self::AccountDeletions => {
                ReportFormat::Json
            }
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::DailyAuths => "Daily Authentications",
            Self::DailyDropoffs => "Identity Verification Drop-offs",
            Self::DailyRegistrations => "Daily Registrations",
            Self::AccountDeletions => "Account Deletions",
        }
    }
}

impl FromStr for ReportKind {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.short_name() == needle || kind.slug() == needle)
            .ok_or_else(|| UnknownValue::Report(needle.to_string()))
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
