//! CSV export of per-step records and failure logs.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::DataError;
use crate::sim::event::FailureLog;
use crate::sim::types::StepRecord;

/// Column header for per-step telemetry.
const STEP_HEADER: &str = "timestep,time_hr,mode,start,commanded_kw,power_kw,capacity,efficiency,\
                           turbine_capacity,turbine_efficiency,ramp_multiplier,trains_online,\
                           components_down,failures,repairs";

/// Column header for failure-log export.
const FAILURE_HEADER: &str = "scenario,time,component,kind,failure_index,downtime_hr,labor_hr,new_life_hr";

/// Exports one scenario's step records to a CSV file at `path`.
///
/// # Errors
///
/// Returns a [`DataError`] if file creation or writing fails.
pub fn export_steps_csv(records: &[StepRecord], path: &Path) -> Result<(), DataError> {
    let file = File::create(path)?;
    write_steps_csv(records, io::BufWriter::new(file))
}

/// Writes step records as CSV to any writer. Identical inputs give
/// byte-identical output.
///
/// # Errors
///
/// Returns a [`DataError`] if writing fails.
pub fn write_steps_csv(records: &[StepRecord], writer: impl Write) -> Result<(), DataError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(STEP_HEADER.split(',').map(str::trim))?;

    for r in records {
        wtr.write_record(&[
            r.timestep.to_string(),
            format!("{:.2}", r.time_hr),
            r.mode.code().to_string(),
            r.start.code().to_string(),
            format!("{:.2}", r.commanded_kw),
            format!("{:.2}", r.power_kw),
            format!("{:.6}", r.capacity),
            format!("{:.6}", r.efficiency),
            format!("{:.6}", r.turbine_capacity),
            format!("{:.6}", r.turbine_efficiency),
            format!("{:.4}", r.ramp_multiplier),
            r.trains_online.to_string(),
            r.components_down.to_string(),
            r.failures.to_string(),
            r.repairs.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports failure logs, in the order given, to a CSV file at `path`.
///
/// # Errors
///
/// Returns a [`DataError`] if file creation or writing fails.
pub fn export_failures_csv<'a>(
    logs: impl IntoIterator<Item = &'a FailureLog>,
    path: &Path,
) -> Result<(), DataError> {
    let file = File::create(path)?;
    write_failures_csv(logs, io::BufWriter::new(file))
}

/// Writes failure logs as CSV to any writer.
///
/// # Errors
///
/// Returns a [`DataError`] if writing fails.
pub fn write_failures_csv<'a>(
    logs: impl IntoIterator<Item = &'a FailureLog>,
    writer: impl Write,
) -> Result<(), DataError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(FAILURE_HEADER.split(','))?;

    for event in logs.into_iter().flat_map(|log| log.iter()) {
        wtr.write_record(&[
            event.scenario.to_string(),
            event.time.to_string(),
            event.component.clone(),
            event.kind.to_string(),
            event.failure_index.map(|i| i.to_string()).unwrap_or_default(),
            format!("{:.4}", event.downtime),
            format!("{:.4}", event.labor_hours),
            format!("{:.4}", event.new_life),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::OperatingMode;
    use crate::sim::event::{EventKind, FailureEvent};
    use crate::sim::types::StartType;

    fn make_step(t: usize) -> StepRecord {
        StepRecord {
            timestep: t,
            time_hr: t as f64,
            mode: OperatingMode::OnlineOngoing,
            start: StartType::None,
            commanded_kw: 400_000.0,
            power_kw: 400_000.0,
            capacity: 1.0,
            efficiency: 0.98,
            turbine_capacity: 1.0,
            turbine_efficiency: 0.999,
            ramp_multiplier: 1.0,
            trains_online: 2,
            components_down: 0,
            failures: 0,
            repairs: 0,
        }
    }

    fn make_log(scenario: usize) -> FailureLog {
        let mut log = FailureLog::new();
        log.push(FailureEvent {
            scenario,
            time: 12,
            component: "WP1".into(),
            kind: EventKind::Failure,
            failure_index: Some(2),
            downtime: 3.5,
            labor_hours: 3.5,
            new_life: 1.0e6,
        });
        log.push(FailureEvent::maintenance(scenario, 40, true, 24.0));
        log
    }

    #[test]
    fn header_and_row_count() {
        let records: Vec<StepRecord> = (0..24).map(make_step).collect();
        let mut buf = Vec::new();
        assert!(write_steps_csv(&records, &mut buf).is_ok());
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 25);
        assert!(lines[0].starts_with("timestep,time_hr,mode,start"));
        assert!(lines[1].starts_with("0,0.00,OO,"));
    }

    #[test]
    fn deterministic_output() {
        let records: Vec<StepRecord> = (0..5).map(make_step).collect();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        assert!(write_steps_csv(&records, &mut buf1).is_ok());
        assert!(write_steps_csv(&records, &mut buf2).is_ok());
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn step_columns_parse_back() {
        let records: Vec<StepRecord> = (0..3).map(make_step).collect();
        let mut buf = Vec::new();
        assert!(write_steps_csv(&records, &mut buf).is_ok());

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().cloned().ok();
        assert_eq!(headers.as_ref().map(csv::StringRecord::len), Some(15));
        let mut rows = 0;
        for record in rdr.records() {
            let Ok(rec) = record else {
                panic!("every row should parse");
            };
            for i in 4..11 {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should be numeric");
            }
            rows += 1;
        }
        assert_eq!(rows, 3);
    }

    #[test]
    fn failure_rows_follow_log_order() {
        let logs = [make_log(0), make_log(1)];
        let mut buf = Vec::new();
        assert!(write_failures_csv(&logs, &mut buf).is_ok());
        let output = String::from_utf8(buf).unwrap_or_default();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("0,12,WP1,"));
        assert!(lines[1].contains(",2,3.5000,"));
        assert!(lines[4].starts_with("1,40,MAINTENANCE,"));
        // maintenance rows have no failure index
        assert!(lines[4].contains(",,"));
    }
}
