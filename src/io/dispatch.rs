//! CSV import of dispatch schedules.
//!
//! Expected columns: `cycle_power,thermal_power,standby,ambient_temperature`.
//! `standby` is read as a number; values of 0.5 or more mean standby.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::Deserialize;

use crate::error::DataError;
use crate::sim::schedule::DispatchSchedule;

#[derive(Debug, Deserialize)]
struct DispatchRow {
    cycle_power: f64,
    thermal_power: f64,
    standby: f64,
    ambient_temperature: f64,
}

/// Reads a dispatch schedule from a CSV file.
///
/// # Errors
///
/// Returns a [`DataError`] if the file cannot be read or a row is malformed.
pub fn import_dispatch_csv(path: &Path) -> Result<DispatchSchedule, DataError> {
    let file = File::open(path)?;
    read_dispatch_csv(io::BufReader::new(file))
}

/// Reads a dispatch schedule from any CSV source with a header row.
///
/// # Errors
///
/// Returns a [`DataError`] if a row is malformed.
pub fn read_dispatch_csv(reader: impl Read) -> Result<DispatchSchedule, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut schedule = DispatchSchedule::default();
    for row in rdr.deserialize() {
        let row: DispatchRow = row?;
        schedule.cycle_power.push(row.cycle_power);
        schedule.thermal_power.push(row.thermal_power);
        schedule.standby.push(row.standby >= 0.5);
        schedule.ambient_temperature.push(row.ambient_temperature);
    }
    Ok(schedule)
}
