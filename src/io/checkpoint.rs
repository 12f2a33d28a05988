//! JSON persistence of per-scenario checkpoints, for resumed runs.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::DataError;
use crate::sim::orchestrator::ScenarioCheckpoint;

pub type Checkpoints = BTreeMap<usize, ScenarioCheckpoint>;

/// Writes checkpoints to `path` as pretty-printed JSON.
///
/// # Errors
///
/// Returns a [`DataError`] if the file cannot be written.
pub fn save_checkpoints(checkpoints: &Checkpoints, path: &Path) -> Result<(), DataError> {
    let file = File::create(path)?;
    write_checkpoints(checkpoints, io::BufWriter::new(file))
}

/// # Errors
///
/// Returns a [`DataError`] if serialization or writing fails.
pub fn write_checkpoints(checkpoints: &Checkpoints, mut writer: impl Write) -> Result<(), DataError> {
    serde_json::to_writer_pretty(&mut writer, checkpoints)?;
    writer.flush()?;
    Ok(())
}

/// Loads checkpoints written by [`save_checkpoints`].
///
/// # Errors
///
/// Returns a [`DataError`] if the file cannot be read or parsed.
pub fn load_checkpoints(path: &Path) -> Result<Checkpoints, DataError> {
    let file = File::open(path)?;
    read_checkpoints(io::BufReader::new(file))
}

/// # Errors
///
/// Returns a [`DataError`] if the input is not valid checkpoint JSON.
pub fn read_checkpoints(reader: impl Read) -> Result<Checkpoints, DataError> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::catalog::{Topology, build_components};
    use crate::random::RngSet;
    use crate::sim::capacity::CondenserTables;
    use crate::sim::engine::{PlantParams, PowerCycle};

    fn checkpoint(scenario: usize) -> ScenarioCheckpoint {
        let mut plant = PowerCycle::new(
            build_components(&Topology::default()).unwrap(),
            PlantParams::default(),
            CondenserTables::proportional(2, 20.0),
        )
        .unwrap_or_else(|e| panic!("{e}"));
        let mut rngs = RngSet::for_scenario(7, scenario);
        plant.reset(&mut rngs);
        let (plant, components) = plant.snapshot();
        ScenarioCheckpoint {
            plant,
            components,
            rngs,
        }
    }

    #[test]
    fn checkpoints_survive_json() {
        let mut cps = Checkpoints::new();
        cps.insert(0, checkpoint(0));
        cps.insert(3, checkpoint(3));
        let mut buf = Vec::new();
        assert!(write_checkpoints(&cps, &mut buf).is_ok());
        let back = read_checkpoints(buf.as_slice());
        assert_eq!(back.ok(), Some(cps));
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("checkpoints.json");
        let mut cps = Checkpoints::new();
        cps.insert(1, checkpoint(1));
        assert!(save_checkpoints(&cps, &path).is_ok());
        assert_eq!(load_checkpoints(&path).ok(), Some(cps));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(read_checkpoints("not json".as_bytes()), Err(DataError::Json(_))));
    }
}
