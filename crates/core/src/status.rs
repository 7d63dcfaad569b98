use chrono::NaiveDate;

use crate::types::VaccinationStatus;

/// Number of days ahead (inclusive) in which an unadministered dose is due soon.
pub const DUE_SOON_WINDOW_DAYS: i64 = 14;

/// Whole days from `today` until `scheduled_date`. Negative once the date has passed.
pub fn days_until(scheduled_date: NaiveDate, today: NaiveDate) -> i64 {
    scheduled_date.signed_duration_since(today).num_days()
}

/// Classifies a dose from its scheduled and administered dates.
///
/// Never returns [`VaccinationStatus::Skipped`]: that state only exists in
/// storage and callers must check for it first.
pub fn classify(
    scheduled_date: NaiveDate,
    administered_date: Option<NaiveDate>,
    today: NaiveDate,
) -> VaccinationStatus {
    if administered_date.is_some() {
        return VaccinationStatus::Completed;
    }

    match days_until(scheduled_date, today) {
        days if days < 0 => VaccinationStatus::Overdue,
        days if days <= DUE_SOON_WINDOW_DAYS => VaccinationStatus::DueSoon,
        _ => VaccinationStatus::Scheduled,
    }
}
