//! Public holiday seed generator
//!
//! Produces a static CSV of national holidays for every supported country,
//! plus holidays of configured subdivisions that do not fall on a national
//! holiday. The file is a seed for the transformation layer; nothing here
//! touches the database.

pub mod calendar;

pub use calendar::BuiltinCalendar;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub const DEFAULT_START_YEAR: i32 = 2020;
pub const DEFAULT_END_YEAR: i32 = 2030;
pub const DEFAULT_OUTPUT: &str = "data_transformation/dbt/seeds/public_holidays.csv";

/// Errors raised by a [`HolidayCalendar`]
#[derive(Debug, thiserror::Error)]
pub enum HolidayError {
    #[error("Unsupported country: {0}")]
    UnknownCountry(String),

    #[error("Subdivision {subdivision} is not supported for {country}")]
    UnknownSubdivision { country: String, subdivision: String },

    #[error("Invalid subdivision '{0}', expected COUNTRY-SUBDIVISION (e.g. DE-BE)")]
    InvalidSubdivisionSpec(String),

    #[error("Invalid year range {start}..={end}")]
    InvalidYearRange { start: i32, end: i32 },
}

/// One holiday on one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

/// Source of holiday dates per country and subdivision
pub trait HolidayCalendar {
    /// ISO 3166-1 alpha-2 codes, sorted
    fn supported_countries(&self) -> Vec<String>;

    /// Holidays of one year, sorted by date
    ///
    /// With a subdivision, the result contains the national holidays as well
    /// as the subdivision's own.
    fn holidays(
        &self,
        country: &str,
        subdivision: Option<&str>,
        year: i32,
    ) -> Result<Vec<Holiday>, HolidayError>;
}

/// Generator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayConfig {
    pub start_year: i32,
    /// Inclusive
    pub end_year: i32,
    /// Subdivision codes to add, by country code
    pub subdivisions: BTreeMap<String, Vec<String>>,
    pub output: PathBuf,
}

impl Default for HolidayConfig {
    fn default() -> Self {
        let mut subdivisions = BTreeMap::new();
        subdivisions.insert("DE".to_string(), vec!["BE".to_string()]);
        Self {
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
            subdivisions,
            output: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl HolidayConfig {
    pub fn validate(&self) -> Result<(), HolidayError> {
        if self.start_year > self.end_year {
            return Err(HolidayError::InvalidYearRange {
                start: self.start_year,
                end: self.end_year,
            });
        }
        Ok(())
    }

    /// Replace the subdivision map from `CC-SUB` specs
    pub fn set_subdivisions<S: AsRef<str>>(&mut self, specs: &[S]) -> Result<(), HolidayError> {
        let mut subdivisions: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for spec in specs {
            let (country, sub) = parse_subdivision(spec.as_ref())?;
            let entry = subdivisions.entry(country).or_default();
            if !entry.contains(&sub) {
                entry.push(sub);
            }
        }
        self.subdivisions = subdivisions;
        Ok(())
    }
}

/// Split `DE-BE` into `("DE", "BE")`, uppercased
pub fn parse_subdivision(spec: &str) -> Result<(String, String), HolidayError> {
    match spec.trim().split_once('-') {
        Some((country, sub)) if !country.is_empty() && !sub.is_empty() => {
            Ok((country.to_uppercase(), sub.to_uppercase()))
        }
        _ => Err(HolidayError::InvalidSubdivisionSpec(spec.to_string())),
    }
}

/// One row of the seed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRecord {
    pub date: NaiveDate,
    pub country_code: String,
    /// Empty for national holidays
    pub subdivision_code: String,
    pub holiday_name: String,
}

fn collect_years(
    calendar: &dyn HolidayCalendar,
    country: &str,
    subdivision: Option<&str>,
    config: &HolidayConfig,
) -> Result<Vec<Holiday>, HolidayError> {
    let mut all = Vec::new();
    for year in config.start_year..=config.end_year {
        all.extend(calendar.holidays(country, subdivision, year)?);
    }
    Ok(all)
}

/// Build the holiday records for every supported country
///
/// A country or subdivision the calendar rejects is skipped with a warning.
/// Records are sorted by date, country and subdivision.
pub fn generate(calendar: &dyn HolidayCalendar, config: &HolidayConfig) -> Vec<HolidayRecord> {
    let countries = calendar.supported_countries();
    tracing::info!(
        "Generating holidays for {} countries from {} to {}",
        countries.len(),
        config.start_year,
        config.end_year
    );

    for country in config.subdivisions.keys() {
        if !countries.contains(country) {
            tracing::warn!("Subdivisions configured for unsupported country {}", country);
        }
    }

    let mut records = Vec::new();
    for country in &countries {
        let national = match collect_years(calendar, country, None, config) {
            Ok(national) => national,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", country, e);
                continue;
            }
        };
        let national_dates: BTreeSet<NaiveDate> = national.iter().map(|h| h.date).collect();
        records.extend(national.into_iter().map(|h| HolidayRecord {
            date: h.date,
            country_code: country.clone(),
            subdivision_code: String::new(),
            holiday_name: h.name,
        }));

        let Some(subdivisions) = config.subdivisions.get(country) else {
            continue;
        };
        for sub in subdivisions {
            match collect_years(calendar, country, Some(sub), config) {
                Ok(holidays) => records.extend(
                    holidays
                        .into_iter()
                        .filter(|h| !national_dates.contains(&h.date))
                        .map(|h| HolidayRecord {
                            date: h.date,
                            country_code: country.clone(),
                            subdivision_code: sub.clone(),
                            holiday_name: h.name,
                        }),
                ),
                Err(e) => tracing::warn!("Skipping subdivision {}-{}: {}", country, sub, e),
            }
        }
    }

    records.sort_by(|a, b| {
        (a.date, &a.country_code, &a.subdivision_code).cmp(&(
            b.date,
            &b.country_code,
            &b.subdivision_code,
        ))
    });
    records
}

/// Write records as CSV, creating parent directories
pub fn write_csv(records: &[HolidayRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if records.is_empty() {
        writer.write_record(["date", "country_code", "subdivision_code", "holiday_name"])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subdivision() {
        assert_eq!(
            parse_subdivision("de-be").unwrap(),
            ("DE".to_string(), "BE".to_string())
        );
        assert!(parse_subdivision("DE").is_err());
        assert!(parse_subdivision("-BE").is_err());
    }

    #[test]
    fn test_set_subdivisions_groups_by_country() {
        let mut config = HolidayConfig::default();
        config
            .set_subdivisions(&["DE-BE", "DE-BY", "DE-BE", "US-NY"])
            .unwrap();
        assert_eq!(config.subdivisions["DE"], vec!["BE", "BY"]);
        assert_eq!(config.subdivisions["US"], vec!["NY"]);
    }

    #[test]
    fn test_year_range_validation() {
        let config = HolidayConfig {
            start_year: 2031,
            ..HolidayConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(HolidayConfig::default().validate().is_ok());
    }
}
