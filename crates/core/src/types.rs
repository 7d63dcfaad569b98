use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::status::classify;

/// Status of a single vaccination record.
///
/// `Skipped` is a stored-only clinic override; the classifier never derives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaccinationStatus {
    Scheduled,
    DueSoon,
    Overdue,
    Completed,
    Skipped,
}

impl VaccinationStatus {
    /// Returns the canonical database representation for the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::DueSoon => "due_soon",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for VaccinationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vaccination status: {0}")]
pub struct UnknownStatusError(pub String);

impl FromStr for VaccinationStatus {
    type Err = UnknownStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "due_soon" => Ok(Self::DueSoon),
            "overdue" => Ok(Self::Overdue),
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            other => Err(UnknownStatusError(other.to_string())),
        }
    }
}

/// One vaccine dose tracked for a child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub id: String,
    pub child_id: String,
    pub vaccine_name: String,
    pub vaccine_code: String,
    pub dose_number: u32,
    pub scheduled_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administered_date: Option<NaiveDate>,
    /// Last persisted status. Advisory except for `Skipped`.
    pub status: VaccinationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl VaccinationRecord {
    /// Derives the effective status of the record on `today`.
    ///
    /// An administered date always yields `Completed`. Otherwise a stored
    /// `Skipped` override is honoured before falling back to date
    /// classification.
    pub fn status_on(&self, today: NaiveDate) -> VaccinationStatus {
        if self.administered_date.is_some() {
            return VaccinationStatus::Completed;
        }
        if self.status == VaccinationStatus::Skipped {
            return VaccinationStatus::Skipped;
        }
        classify(self.scheduled_date, None, today)
    }
}

/// A child profile owned by a parent account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    pub id: String,
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinic_id: Option<String>,
    pub name: String,
    pub birth_date: NaiveDate,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

/// Kind of account owning or serving children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Parent,
    Clinic,
}

impl OwnerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Clinic => "clinic",
        }
    }
}

impl FromStr for OwnerKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "parent" => Ok(Self::Parent),
            "clinic" => Ok(Self::Clinic),
            other => Err(format!("unknown owner kind: {other}")),
        }
    }
}

/// Parent or clinic account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub kind: OwnerKind,
    pub display_name: String,
    /// IANA timezone used to determine the owner's local calendar day.
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

/// Reason a reminder was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DueSoon,
    Overdue,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DueSoon => "due_soon",
            Self::Overdue => "overdue",
        }
    }

    /// Maps a derived status to the reminder it warrants, if any.
    pub fn for_status(status: VaccinationStatus) -> Option<Self> {
        match status {
            VaccinationStatus::DueSoon => Some(Self::DueSoon),
            VaccinationStatus::Overdue => Some(Self::Overdue),
            _ => None,
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "due_soon" => Ok(Self::DueSoon),
            "overdue" => Ok(Self::Overdue),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// In-app reminder attached to a vaccination record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub owner_id: String,
    pub record_id: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}
