//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use cycle_avail_sim::components::catalog::condenser_train;
use cycle_avail_sim::components::{ComponentKind, FailureMode};
use cycle_avail_sim::config::ScenarioConfig;
use cycle_avail_sim::random::Distribution;
use cycle_avail_sim::sim::capacity::CondenserTables;
use cycle_avail_sim::sim::engine::{PlantParams, PowerCycle};
use cycle_avail_sim::sim::orchestrator::Orchestrator;
use cycle_avail_sim::sim::schedule::DispatchSchedule;
use cycle_avail_sim::sim::types::SimulationParams;

/// Cold ambient used by the constant schedules (below the 20 °C threshold).
pub const COLD_AMBIENT_C: f64 = 10.0;

/// Simulation parameters for `steps` steps, no replay window.
pub fn params(steps: usize, seed: u32) -> SimulationParams {
    SimulationParams {
        sim_length: steps,
        seed,
        ..SimulationParams::default()
    }
}

/// Full-load, always-online schedule in cold weather.
pub fn full_load(steps: usize) -> DispatchSchedule {
    DispatchSchedule::constant(steps, PlantParams::default().nameplate_kw, COLD_AMBIENT_C)
}

/// The catalog's first condenser train (two fans, standby-repaired, 15.55 h
/// mean repair) with an extra short-lived failure type on the train.
///
/// The cold table is `[0, 1]`, so the plant delivers nothing while the
/// train is down and full output otherwise.
pub fn fragile_condenser(mean_life_hr: f64) -> PowerCycle {
    let mut comps = condenser_train(1, 2, 0).unwrap_or_else(|e| panic!("{e}"));
    for c in &mut comps {
        if c.kind() == ComponentKind::CondenserTrain {
            c.add_failure_type(
                "Tube bundle",
                FailureMode::All,
                Distribution::Exponential { scale: mean_life_hr },
            )
            .unwrap_or_else(|e| panic!("{e}"));
        }
    }
    let tables = CondenserTables::new(vec![0.0, 1.0], vec![0.0, 1.0], 20.0, 1)
        .unwrap_or_else(|e| panic!("{e}"));
    PowerCycle::new(comps, PlantParams::default(), tables).unwrap_or_else(|e| panic!("{e}"))
}

/// Orchestrator over [`fragile_condenser`] at full load.
pub fn fragile_orchestrator(params: SimulationParams) -> Orchestrator {
    let schedule = full_load(params.horizon());
    Orchestrator::new(fragile_condenser(40.0), schedule, params).unwrap_or_else(|e| panic!("{e}"))
}

/// Orchestrator for a named preset with `scenarios` scenarios.
pub fn preset_orchestrator(name: &str, scenarios: usize) -> Orchestrator {
    let mut cfg = ScenarioConfig::from_preset(name).unwrap_or_else(|e| panic!("{e}"));
    cfg.simulation.num_scenarios = scenarios;
    cfg.build_orchestrator().unwrap_or_else(|e| panic!("{e}"))
}
