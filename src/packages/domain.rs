use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for stored packages. Assigned by the store at insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId(pub String);

/// Closed set of package categories accepted at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    Food,
    Grocery,
    General,
}

impl PackageKind {
    pub const fn label(self) -> &'static str {
        match self {
            PackageKind::Food => "food",
            PackageKind::Grocery => "grocery",
            PackageKind::General => "general",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "food" => Some(PackageKind::Food),
            "grocery" => Some(PackageKind::Grocery),
            "general" => Some(PackageKind::General),
            _ => None,
        }
    }
}

/// Lifecycle state. `Pending` is initial; the other two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageState {
    Pending,
    Withdrawn,
    Lost,
}

impl PackageState {
    pub const fn label(self) -> &'static str {
        match self {
            PackageState::Pending => "pending",
            PackageState::Withdrawn => "withdrawn",
            PackageState::Lost => "lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(PackageState::Pending),
            "withdrawn" => Some(PackageState::Withdrawn),
            "lost" => Some(PackageState::Lost),
            _ => None,
        }
    }
}

/// Recorded when nobody resolvable performed the withdrawal.
pub const UNKNOWN_WITHDRAWER: &str = "unknown";

/// Persisted package record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: PackageId,
    pub department: String,
    pub kind: PackageKind,
    pub comments: String,
    pub state: PackageState,
    pub urgent: bool,
    pub tracking_code: String,
    pub retrieval_code: String,
    pub ingested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawn_by: Option<String>,
    pub notified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_notified_at: Option<DateTime<Utc>>,
}

/// Raw intake payload before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntakeRequest {
    pub department: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    /// Manual override; accepted verbatim when present and non-empty.
    #[serde(default)]
    pub tracking_code: Option<String>,
}

/// Intake payload after field validation, ready for code allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIntake {
    pub department: String,
    pub kind: PackageKind,
    pub comments: String,
    pub urgent: bool,
    pub tracking_code_override: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("department is required")]
    MissingDepartment,
    #[error("department must contain only digits")]
    NonNumericDepartment,
    #[error("unknown package type '{value}'; expected food, grocery, or general")]
    UnknownKind { value: String },
}

impl IntakeRequest {
    /// Field validation mirroring the intake form rules: department is a
    /// non-empty digit string, type is one of the closed set.
    pub fn validate(self) -> Result<ValidatedIntake, ValidationError> {
        let department = self.department.trim().to_string();
        if department.is_empty() {
            return Err(ValidationError::MissingDepartment);
        }
        if !department.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::NonNumericDepartment);
        }

        let kind = PackageKind::parse(&self.kind).ok_or_else(|| ValidationError::UnknownKind {
            value: self.kind.trim().to_string(),
        })?;

        let tracking_code_override = self
            .tracking_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());

        Ok(ValidatedIntake {
            department,
            kind,
            comments: self.comments.unwrap_or_default().trim().to_string(),
            urgent: self.urgent,
            tracking_code_override,
        })
    }
}
