//! Rollback at first failure, checkpoint persistence and failure-log replay.

mod common;

use cycle_avail_sim::error::SetupError;
use cycle_avail_sim::io::checkpoint::{load_checkpoints, save_checkpoints};
use cycle_avail_sim::sim::types::SimulationParams;

fn stopping_params() -> SimulationParams {
    SimulationParams {
        stop_at_first_failure: true,
        ..common::params(300, 11)
    }
}

#[test]
fn rolled_back_scenario_keeps_its_starting_checkpoint() {
    let mut orch = common::fragile_orchestrator(stopping_params());
    let r = orch.run_scenario(0).unwrap().clone();
    assert!(r.pending_failure);
    assert!(r.log.is_empty());
    assert_eq!(r.labor_cost, 0.0);
    let tf = r.last_failure.unwrap_or_else(|| panic!("scenario should fail"));
    // The tail repeats the failure step.
    assert!(r.records[tf..].iter().all(|s| s.capacity == r.records[tf].capacity));

    // Running again from the stored checkpoint hits the same failure.
    let again = orch.run_scenario(0).unwrap().clone();
    assert_eq!(again, r);
    assert_eq!(orch.summary().rolled_back, 1);
}

#[test]
fn completed_scenario_checkpoints_survive_a_file_round_trip() {
    let mut orch = common::fragile_orchestrator(common::params(120, 23));
    orch.run_all(3).unwrap();

    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
    let path = dir.path().join("cp.json");
    assert!(save_checkpoints(orch.checkpoints(), &path).is_ok());
    let loaded = load_checkpoints(&path).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(&loaded, orch.checkpoints());

    // Two resumed runs from the same checkpoints agree with each other and
    // continue from the end state rather than restarting.
    let mut a = common::fragile_orchestrator(common::params(120, 23)).with_checkpoints(loaded.clone()).unwrap();
    let mut b = common::fragile_orchestrator(common::params(120, 23)).with_checkpoints(loaded).unwrap();
    a.run_all(3).unwrap();
    b.run_all_parallel(3).unwrap();
    assert_eq!(a.results(), b.results());
    assert_ne!(a.results(), orch.results());
}

#[test]
fn checkpoints_from_another_plant_are_a_setup_error() {
    let mut orch = common::preset_orchestrator("baseline", 1);
    orch.run_all(1).unwrap();
    let mut foreign = orch.checkpoints().clone();
    if let Some(cp) = foreign.get_mut(&0) {
        cp.components.pop();
    }

    let r = common::preset_orchestrator("baseline", 1).with_checkpoints(foreign);
    assert!(matches!(r, Err(SetupError::StatusMismatch { .. })));

    // A smaller plant rejects the baseline's checkpoints outright.
    let r = common::fragile_orchestrator(common::params(120, 23)).with_checkpoints(orch.checkpoints().clone());
    assert!(matches!(r, Err(SetupError::StatusMismatch { .. })));
}

#[test]
fn replayed_window_reproduces_the_recorded_capacity() {
    let recorded = {
        let mut orch = common::fragile_orchestrator(common::params(200, 31));
        orch.run_scenario(0).unwrap().clone()
    };
    assert!(recorded.failure_count() > 0);

    let params = SimulationParams {
        read_periods: 120,
        sim_length: 80,
        ..common::params(80, 31)
    };
    let mut orch = common::fragile_orchestrator(params);
    orch.set_replay_log(0, recorded.log.clone());
    let replayed = orch.run_scenario(0).unwrap().clone();

    assert_eq!(replayed.records.len(), 200);
    for t in 0..120 {
        assert_eq!(
            replayed.records[t].capacity, recorded.records[t].capacity,
            "capacity differs at replayed step {t}"
        );
        assert_eq!(replayed.records[t].failures, 0);
    }
    // Replayed events are not logged again.
    assert!(replayed.log.iter().all(|e| e.time >= 120));
}
