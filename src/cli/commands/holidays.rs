//! `landing holidays`

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::holidays::{BuiltinCalendar, HolidayConfig, generate, write_csv};

#[derive(Debug, Clone, Default)]
pub struct HolidayArgs {
    pub output: Option<PathBuf>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    /// `CC-SUB` codes; replace the default subdivision set when given
    pub subdivisions: Vec<String>,
}

impl HolidayArgs {
    pub fn to_config(&self) -> Result<HolidayConfig, CliError> {
        let mut config = HolidayConfig::default();
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(start) = self.start_year {
            config.start_year = start;
        }
        if let Some(end) = self.end_year {
            config.end_year = end;
        }
        if !self.subdivisions.is_empty() {
            config.set_subdivisions(&self.subdivisions)?;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn handle_holidays(args: &HolidayArgs) -> Result<(), CliError> {
    let config = args.to_config()?;
    let records = generate(&BuiltinCalendar::new(), &config);

    println!("Writing to {}...", config.output.display());
    write_csv(&records, &config.output)?;
    println!("Successfully generated {} holiday records.", records.len());
    Ok(())
}
