use serde::Serialize;

/// Recommended age for one dose of one vaccine in a national schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GuidelineEntry {
    pub vaccine_name: &'static str,
    pub vaccine_code: &'static str,
    pub dose_number: u32,
    pub age_in_days: u32,
}

const fn dose(
    vaccine_name: &'static str,
    vaccine_code: &'static str,
    dose_number: u32,
    age_in_days: u32,
) -> GuidelineEntry {
    GuidelineEntry {
        vaccine_name,
        vaccine_code,
        dose_number,
        age_in_days,
    }
}

/// National schedule table keyed by ISO 3166 alpha-2 code.
#[derive(Debug, Clone, Copy)]
pub struct CountryGuidelines {
    pub country: &'static str,
    pub entries: &'static [GuidelineEntry],
}

const US: &[GuidelineEntry] = &[
    dose("Hepatitis B", "HEPB", 1, 0),
    dose("Hepatitis B", "HEPB", 2, 30),
    dose("Rotavirus", "RV", 1, 60),
    dose("Diphtheria, Tetanus, Pertussis", "DTAP", 1, 60),
    dose("Haemophilus influenzae type b", "HIB", 1, 60),
    dose("Pneumococcal conjugate", "PCV", 1, 60),
    dose("Inactivated poliovirus", "IPV", 1, 60),
    dose("Rotavirus", "RV", 2, 120),
    dose("Diphtheria, Tetanus, Pertussis", "DTAP", 2, 120),
    dose("Haemophilus influenzae type b", "HIB", 2, 120),
    dose("Pneumococcal conjugate", "PCV", 2, 120),
    dose("Inactivated poliovirus", "IPV", 2, 120),
    dose("Hepatitis B", "HEPB", 3, 180),
    dose("Rotavirus", "RV", 3, 180),
    dose("Diphtheria, Tetanus, Pertussis", "DTAP", 3, 180),
    dose("Pneumococcal conjugate", "PCV", 3, 180),
    dose("Inactivated poliovirus", "IPV", 3, 180),
    dose("Haemophilus influenzae type b", "HIB", 3, 365),
    dose("Pneumococcal conjugate", "PCV", 4, 365),
    dose("Measles, Mumps, Rubella", "MMR", 1, 365),
    dose("Varicella", "VAR", 1, 365),
    dose("Hepatitis A", "HEPA", 1, 365),
    dose("Diphtheria, Tetanus, Pertussis", "DTAP", 4, 450),
    dose("Hepatitis A", "HEPA", 2, 545),
    dose("Diphtheria, Tetanus, Pertussis", "DTAP", 5, 1460),
    dose("Inactivated poliovirus", "IPV", 4, 1460),
    dose("Measles, Mumps, Rubella", "MMR", 2, 1460),
    dose("Varicella", "VAR", 2, 1460),
];

const GB: &[GuidelineEntry] = &[
    dose("6-in-1 (DTaP/IPV/Hib/HepB)", "DTAP-IPV-HIB-HEPB", 1, 56),
    dose("Meningococcal B", "MENB", 1, 56),
    dose("Rotavirus", "RV", 1, 56),
    dose("6-in-1 (DTaP/IPV/Hib/HepB)", "DTAP-IPV-HIB-HEPB", 2, 84),
    dose("Pneumococcal conjugate", "PCV", 1, 84),
    dose("Rotavirus", "RV", 2, 84),
    dose("6-in-1 (DTaP/IPV/Hib/HepB)", "DTAP-IPV-HIB-HEPB", 3, 112),
    dose("Meningococcal B", "MENB", 2, 112),
    dose("Hib/MenC", "HIB-MENC", 1, 365),
    dose("Meningococcal B", "MENB", 3, 365),
    dose("Pneumococcal conjugate", "PCV", 2, 365),
    dose("Measles, Mumps, Rubella", "MMR", 1, 365),
    dose("4-in-1 pre-school booster (DTaP/IPV)", "DTAP-IPV", 1, 1216),
    dose("Measles, Mumps, Rubella", "MMR", 2, 1216),
];

const IN: &[GuidelineEntry] = &[
    dose("Bacillus Calmette-Guerin", "BCG", 1, 0),
    dose("Oral poliovirus", "OPV", 0, 0),
    dose("Hepatitis B birth dose", "HEPB", 0, 0),
    dose("Pentavalent (DTwP/HepB/Hib)", "PENTA", 1, 42),
    dose("Oral poliovirus", "OPV", 1, 42),
    dose("Rotavirus", "RV", 1, 42),
    dose("Fractional inactivated poliovirus", "FIPV", 1, 42),
    dose("Pneumococcal conjugate", "PCV", 1, 42),
    dose("Pentavalent (DTwP/HepB/Hib)", "PENTA", 2, 70),
    dose("Oral poliovirus", "OPV", 2, 70),
    dose("Rotavirus", "RV", 2, 70),
    dose("Pentavalent (DTwP/HepB/Hib)", "PENTA", 3, 98),
    dose("Oral poliovirus", "OPV", 3, 98),
    dose("Rotavirus", "RV", 3, 98),
    dose("Fractional inactivated poliovirus", "FIPV", 2, 98),
    dose("Pneumococcal conjugate", "PCV", 2, 98),
    dose("Measles, Rubella", "MR", 1, 270),
    dose("Pneumococcal conjugate", "PCV", 3, 270),
    dose("Measles, Rubella", "MR", 2, 480),
    dose("Diphtheria, Tetanus, Pertussis booster", "DPT", 1, 480),
    dose("Oral poliovirus booster", "OPV", 4, 480),
];

/// Built-in national schedules.
pub const BUILTIN_GUIDELINES: &[CountryGuidelines] = &[
    CountryGuidelines {
        country: "GB",
        entries: GB,
    },
    CountryGuidelines {
        country: "IN",
        entries: IN,
    },
    CountryGuidelines {
        country: "US",
        entries: US,
    },
];

/// Normalizes user supplied country codes (`" us "` -> `"US"`).
pub fn normalize_country(country: &str) -> String {
    country.trim().to_ascii_uppercase()
}

/// Source of guideline tables consumed by the schedule generator.
pub trait GuidelineSource: Send + Sync {
    /// Returns the guideline table for a normalized country code.
    fn guidelines(&self, country: &str) -> Option<&[GuidelineEntry]>;

    /// Lists the countries this source can produce schedules for.
    fn supported_countries(&self) -> Vec<&'static str>;
}

/// Guideline source backed by [`BUILTIN_GUIDELINES`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinGuidelines;

impl GuidelineSource for BuiltinGuidelines {
    fn guidelines(&self, country: &str) -> Option<&[GuidelineEntry]> {
        BUILTIN_GUIDELINES
            .iter()
            .find(|table| table.country == country)
            .map(|table| table.entries)
    }

    fn supported_countries(&self) -> Vec<&'static str> {
        BUILTIN_GUIDELINES.iter().map(|table| table.country).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_tables_have_unique_doses() {
        for table in BUILTIN_GUIDELINES {
            let mut seen = HashSet::new();
            for entry in table.entries {
                assert!(
                    seen.insert((entry.vaccine_code, entry.dose_number)),
                    "{} repeats {} dose {}",
                    table.country,
                    entry.vaccine_code,
                    entry.dose_number
                );
            }
        }
    }

    #[test]
    fn looks_up_known_countries_only() {
        let source = BuiltinGuidelines;
        assert!(source.guidelines("US").is_some());
        assert!(source.guidelines("ZZ").is_none());
        assert_eq!(source.supported_countries(), vec!["GB", "IN", "US"]);
    }

    #[test]
    fn normalizes_country_codes() {
        assert_eq!(normalize_country(" gb "), "GB");
    }
}
