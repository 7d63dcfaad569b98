//! Domain layer for vaccination tracking.
//!
//! Everything here is pure: callers pass "today" explicitly and no function
//! touches the clock, the database or the network.

pub mod aggregate;
pub mod dates;
pub mod guidelines;
pub mod schedule;
pub mod status;
pub mod types;

pub use aggregate::{ChildStats, DashboardStats};
pub use dates::{format_iso_date, parse_iso_date, InvalidDateError};
pub use guidelines::{BuiltinGuidelines, GuidelineEntry, GuidelineSource};
pub use schedule::{ScheduleGenerator, ScheduledDose};
pub use status::classify;
pub use types::{
    Child, Notification, NotificationKind, Owner, OwnerKind, VaccinationRecord, VaccinationStatus,
};
