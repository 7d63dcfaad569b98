use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::guidelines::{normalize_country, BuiltinGuidelines, GuidelineSource};

/// Concrete dose produced for a child from a guideline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledDose {
    pub vaccine_name: String,
    pub vaccine_code: String,
    pub dose_number: u32,
    pub scheduled_date: NaiveDate,
}

/// Expands country guideline tables into dated doses.
#[derive(Clone)]
pub struct ScheduleGenerator {
    source: Arc<dyn GuidelineSource>,
}

impl Default for ScheduleGenerator {
    fn default() -> Self {
        Self::new(Arc::new(BuiltinGuidelines))
    }
}

impl ScheduleGenerator {
    pub fn new(source: Arc<dyn GuidelineSource>) -> Self {
        Self { source }
    }

    /// Returns `true` when a guideline table exists for the country.
    pub fn is_supported(&self, country: &str) -> bool {
        self.source.guidelines(&normalize_country(country)).is_some()
    }

    pub fn supported_countries(&self) -> Vec<&'static str> {
        self.source.supported_countries()
    }

    /// Generates the schedule for a child born on `birth_date`.
    ///
    /// Unsupported countries produce an empty schedule. Doses are ordered by
    /// date, then vaccine code, then dose number.
    pub fn generate(&self, country: &str, birth_date: NaiveDate) -> Vec<ScheduledDose> {
        let Some(entries) = self.source.guidelines(&normalize_country(country)) else {
            return Vec::new();
        };

        let mut doses: Vec<ScheduledDose> = entries
            .iter()
            .filter_map(|entry| {
                let scheduled_date =
                    birth_date.checked_add_days(Days::new(u64::from(entry.age_in_days)))?;
                Some(ScheduledDose {
                    vaccine_name: entry.vaccine_name.to_string(),
                    vaccine_code: entry.vaccine_code.to_string(),
                    dose_number: entry.dose_number,
                    scheduled_date,
                })
            })
            .collect();

        doses.sort_by(|a, b| {
            a.scheduled_date
                .cmp(&b.scheduled_date)
                .then_with(|| a.vaccine_code.cmp(&b.vaccine_code))
                .then_with(|| a.dose_number.cmp(&b.dose_number))
        });
        doses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidelines::GuidelineEntry;
    use crate::status::classify;
    use crate::types::VaccinationStatus;

    struct TwoDoseTable;

    const ENTRIES: &[GuidelineEntry] = &[
        GuidelineEntry {
            vaccine_name: "Measles",
            vaccine_code: "MEAS",
            dose_number: 2,
            age_in_days: 180,
        },
        GuidelineEntry {
            vaccine_name: "Hepatitis B",
            vaccine_code: "HEPB",
            dose_number: 1,
            age_in_days: 0,
        },
    ];

    impl GuidelineSource for TwoDoseTable {
        fn guidelines(&self, country: &str) -> Option<&[GuidelineEntry]> {
            (country == "XX").then_some(ENTRIES)
        }

        fn supported_countries(&self) -> Vec<&'static str> {
            vec!["XX"]
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn adds_age_in_days_to_birth_date_in_order() {
        let generator = ScheduleGenerator::new(Arc::new(TwoDoseTable));
        let doses = generator.generate("xx", date(2024, 1, 1));

        assert_eq!(doses.len(), 2);
        assert_eq!(doses[0].vaccine_code, "HEPB");
        assert_eq!(doses[0].scheduled_date, date(2024, 1, 1));
        assert_eq!(doses[1].vaccine_code, "MEAS");
        assert_eq!(doses[1].dose_number, 2);
        assert_eq!(doses[1].scheduled_date, date(2024, 6, 29));
    }

    #[test]
    fn past_doses_of_a_213_day_old_are_overdue() {
        let generator = ScheduleGenerator::new(Arc::new(TwoDoseTable));
        let today = date(2024, 8, 1);
        let doses = generator.generate("XX", date(2024, 1, 1));

        for dose in doses {
            assert_eq!(
                classify(dose.scheduled_date, None, today),
                VaccinationStatus::Overdue
            );
        }
    }

    #[test]
    fn unsupported_country_yields_empty_schedule() {
        let generator = ScheduleGenerator::default();
        assert!(generator.generate("ZZ", date(2024, 1, 1)).is_empty());
        assert!(!generator.is_supported("ZZ"));
        assert!(generator.is_supported("us"));
    }

    #[test]
    fn builtin_schedule_is_sorted() {
        let generator = ScheduleGenerator::default();
        let doses = generator.generate("IN", date(2024, 1, 1));
        assert!(!doses.is_empty());
        assert!(doses
            .windows(2)
            .all(|pair| pair[0].scheduled_date <= pair[1].scheduled_date));
        assert_eq!(doses[0].scheduled_date, date(2024, 1, 1));
    }
}
