//! Multi-scenario Monte Carlo runs with per-scenario checkpoints.
//!
//! Each scenario owns a private copy of the plant and its own generator
//! streams, so scenarios can run on any thread in any order and still
//! reproduce bit-for-bit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::components::ComponentStatus;
use crate::error::SetupResult;
use crate::random::RngSet;

use super::engine::{PlantState, PowerCycle};
use super::event::FailureLog;
use super::kpi::Summary;
use super::schedule::DispatchSchedule;
use super::types::{SimulationParams, StepRecord};

/// Complete mutable state of one scenario at a scenario boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioCheckpoint {
    pub plant: PlantState,
    pub components: Vec<ComponentStatus>,
    pub rngs: RngSet,
}

/// Output of one scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResult {
    pub scenario: usize,
    pub records: Vec<StepRecord>,
    /// Failure and maintenance events generated by this run.
    pub log: FailureLog,
    pub labor_cost: f64,
    /// Aged, availability-weighted turbine capacity at the last step.
    pub turbine_capacity: f64,
    pub turbine_efficiency: f64,
    /// Step of the first new failure, if any.
    pub last_failure: Option<usize>,
    /// A failure occurred and the scenario was rolled back to its starting
    /// checkpoint; the caller is expected to re-plan from that step.
    pub pending_failure: bool,
    /// Step of the first completed repair, if any.
    pub last_repair: Option<usize>,
}

impl ScenarioResult {
    pub fn capacity(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.capacity).collect()
    }

    pub fn efficiency(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.efficiency).collect()
    }

    pub fn failure_count(&self) -> usize {
        self.log.failure_count()
    }
}

/// Runs scenarios of one plant against one dispatch schedule.
pub struct Orchestrator {
    plant: PowerCycle,
    schedule: DispatchSchedule,
    params: SimulationParams,
    checkpoints: BTreeMap<usize, ScenarioCheckpoint>,
    replay: BTreeMap<usize, FailureLog>,
    results: BTreeMap<usize, ScenarioResult>,
    cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    /// # Errors
    ///
    /// Returns [`crate::error::SetupError::DispatchLength`] if the schedule
    /// does not cover the horizon.
    pub fn new(plant: PowerCycle, schedule: DispatchSchedule, params: SimulationParams) -> SetupResult<Self> {
        schedule.covers(params.horizon())?;
        Ok(Self {
            plant,
            schedule,
            params,
            checkpoints: BTreeMap::new(),
            replay: BTreeMap::new(),
            results: BTreeMap::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Starts scenarios from previously saved checkpoints instead of an
    /// as-new plant.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SetupError::StatusMismatch`] if a checkpoint
    /// was taken from a plant with different components or failure types.
    pub fn with_checkpoints(mut self, checkpoints: BTreeMap<usize, ScenarioCheckpoint>) -> SetupResult<Self> {
        for (index, cp) in &checkpoints {
            if let Err(e) = self.plant.clone().restore(cp.plant.clone(), cp.components.clone()) {
                warn!(scenario = *index, error = %e, "checkpoint does not fit the plant");
                return Err(e);
            }
        }
        self.checkpoints = checkpoints;
        Ok(self)
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn plant(&self) -> &PowerCycle {
        &self.plant
    }

    /// Starting checkpoint of every scenario that has one.
    pub fn checkpoints(&self) -> &BTreeMap<usize, ScenarioCheckpoint> {
        &self.checkpoints
    }

    pub fn results(&self) -> &BTreeMap<usize, ScenarioResult> {
        &self.results
    }

    /// Replaces the dispatch schedule, e.g. after re-planning following a
    /// rolled-back failure.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SetupError::DispatchLength`] if the schedule
    /// does not cover the horizon.
    pub fn set_schedule(&mut self, schedule: DispatchSchedule) -> SetupResult<()> {
        schedule.covers(self.params.horizon())?;
        self.schedule = schedule;
        Ok(())
    }

    /// Failure log replayed during the read-in window of `scenario`.
    pub fn set_replay_log(&mut self, scenario: usize, log: FailureLog) {
        self.replay.insert(scenario, log);
    }

    /// Flag that stops a run before its next scenario starts.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Starting checkpoint of `index`: the stored one, or an as-new plant
    /// seeded from the scenario's own streams.
    fn starting_checkpoint(&self, index: usize) -> ScenarioCheckpoint {
        if let Some(cp) = self.checkpoints.get(&index) {
            return cp.clone();
        }
        let mut rngs = RngSet::for_scenario(self.params.seed, index);
        let mut plant = self.plant.clone();
        plant.reset(&mut rngs);
        let (plant_state, components) = plant.snapshot();
        ScenarioCheckpoint {
            plant: plant_state,
            components,
            rngs,
        }
    }

    /// Runs scenario `index` without touching shared state.
    fn execute(&self, index: usize) -> SetupResult<(ScenarioResult, ScenarioCheckpoint)> {
        let start = self.starting_checkpoint(index);
        let mut plant = self.plant.clone();
        plant.restore(start.plant.clone(), start.components.clone())?;
        let mut rngs = start.rngs.clone();
        let run = plant.run(
            &self.schedule,
            &self.params,
            index,
            &mut rngs,
            self.replay.get(&index),
        );

        let last = run.records.last();
        let turbine_capacity = last.map_or(1.0, |r| r.turbine_capacity);
        let turbine_efficiency = last.map_or(1.0, |r| r.turbine_efficiency);

        if self.params.stop_at_first_failure && run.first_failure.is_some() {
            warn!(
                scenario = index,
                t = run.first_failure,
                "new failure, rolling scenario back to its starting checkpoint"
            );
            let result = ScenarioResult {
                scenario: index,
                records: run.records,
                log: FailureLog::new(),
                labor_cost: 0.0,
                turbine_capacity,
                turbine_efficiency,
                last_failure: run.first_failure,
                pending_failure: true,
                last_repair: run.first_repair,
            };
            return Ok((result, start));
        }

        let labor_cost = run.log.labor_cost(self.params.hourly_labor_cost);
        info!(
            scenario = index,
            failures = run.log.failure_count(),
            labor_cost,
            "scenario complete"
        );
        let (plant_state, components) = plant.snapshot();
        let end = ScenarioCheckpoint {
            plant: plant_state,
            components,
            rngs,
        };
        let result = ScenarioResult {
            scenario: index,
            records: run.records,
            log: run.log,
            labor_cost,
            turbine_capacity,
            turbine_efficiency,
            last_failure: run.first_failure,
            pending_failure: false,
            last_repair: run.first_repair,
        };
        Ok((result, end))
    }

    fn commit(&mut self, result: ScenarioResult, checkpoint: ScenarioCheckpoint) {
        let index = result.scenario;
        self.checkpoints.insert(index, checkpoint);
        self.results.insert(index, result);
    }

    /// Runs one scenario and stores its result and next checkpoint.
    ///
    /// A rolled-back scenario keeps its starting checkpoint; any other run
    /// leaves its end state as the next starting point.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::SetupError::StatusMismatch`] if the starting
    /// checkpoint does not fit the plant.
    pub fn run_scenario(&mut self, index: usize) -> SetupResult<&ScenarioResult> {
        let (result, checkpoint) = self.execute(index)?;
        self.commit(result, checkpoint);
        Ok(&self.results[&index])
    }

    /// Runs scenarios `0..n` in order, stopping early if cancelled.
    ///
    /// # Returns
    ///
    /// The number of scenarios completed.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::run_scenario`].
    pub fn run_all(&mut self, n: usize) -> SetupResult<usize> {
        let mut done = 0;
        for index in 0..n {
            if self.is_cancelled() {
                warn!(completed = done, requested = n, "run cancelled");
                break;
            }
            self.run_scenario(index)?;
            done += 1;
        }
        Ok(done)
    }

    /// Runs scenarios `0..n` on the rayon pool. Scenarios not yet started
    /// when the cancel flag is raised are skipped.
    ///
    /// # Returns
    ///
    /// The number of scenarios completed.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::run_scenario`]. Nothing is stored if any scenario
    /// fails to start.
    pub fn run_all_parallel(&mut self, n: usize) -> SetupResult<usize> {
        let outcomes: Vec<(ScenarioResult, ScenarioCheckpoint)> = (0..n)
            .into_par_iter()
            .filter_map(|index| {
                if self.is_cancelled() {
                    None
                } else {
                    Some(self.execute(index))
                }
            })
            .collect::<SetupResult<_>>()?;
        let done = outcomes.len();
        if done < n {
            warn!(completed = done, requested = n, "run cancelled");
        }
        for (result, checkpoint) in outcomes {
            self.commit(result, checkpoint);
        }
        Ok(done)
    }

    /// Cross-scenario averages of the stored results.
    pub fn summary(&self) -> Summary {
        Summary::from_results(self.results.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::catalog::{build_components, condenser_train};
    use crate::components::{FailureMode, Topology};
    use crate::random::Distribution;
    use crate::sim::capacity::CondenserTables;
    use crate::error::SetupError;
    use crate::sim::engine::PlantParams;

    fn orchestrator(steps: usize, stop: bool) -> Orchestrator {
        let plant = PowerCycle::new(
            build_components(&Topology::default()).unwrap(),
            PlantParams::default(),
            CondenserTables::proportional(2, 20.0),
        )
        .unwrap_or_else(|e| panic!("{e}"));
        let params = SimulationParams {
            sim_length: steps,
            seed: 99,
            stop_at_first_failure: stop,
            ..SimulationParams::default()
        };
        Orchestrator::new(plant, DispatchSchedule::constant(steps, 400_000.0, 18.0), params)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    fn fragile(stop: bool) -> Orchestrator {
        let mut comps = condenser_train(1, 0, 0).unwrap();
        comps[0]
            .add_failure_type("short", FailureMode::All, Distribution::Exponential { scale: 3.0 })
            .unwrap_or_else(|e| panic!("{e}"));
        let plant = PowerCycle::new(comps, PlantParams::default(), CondenserTables::proportional(1, 20.0))
            .unwrap_or_else(|e| panic!("{e}"));
        let params = SimulationParams {
            sim_length: 200,
            seed: 5,
            stop_at_first_failure: stop,
            ..SimulationParams::default()
        };
        Orchestrator::new(plant, DispatchSchedule::constant(200, 500_000.0, 10.0), params)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn short_schedule_is_rejected() {
        let plant = PowerCycle::new(vec![], PlantParams::default(), CondenserTables::proportional(0, 20.0))
            .unwrap_or_else(|e| panic!("{e}"));
        let params = SimulationParams {
            sim_length: 10,
            ..SimulationParams::default()
        };
        assert!(Orchestrator::new(plant, DispatchSchedule::constant(9, 1.0, 10.0), params).is_err());
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut seq = orchestrator(96, false);
        let mut par = orchestrator(96, false);
        assert_eq!(seq.run_all(4).unwrap(), 4);
        assert_eq!(par.run_all_parallel(4).unwrap(), 4);
        assert_eq!(seq.results(), par.results());
        assert_eq!(seq.checkpoints(), par.checkpoints());
    }

    #[test]
    fn rerun_from_same_checkpoint_is_identical() {
        let mut first = orchestrator(96, false);
        first.run_scenario(0).unwrap();
        let mut a = orchestrator(96, false).with_checkpoints(first.checkpoints().clone()).unwrap();
        let mut b = orchestrator(96, false).with_checkpoints(first.checkpoints().clone()).unwrap();
        assert_eq!(a.run_scenario(0).unwrap(), b.run_scenario(0).unwrap());
    }

    #[test]
    fn mismatched_checkpoint_is_rejected_before_running() {
        let o = orchestrator(24, false);
        let mut cp = o.starting_checkpoint(0);
        cp.components.pop();
        let found = cp.components.len();
        let r = orchestrator(24, false).with_checkpoints(BTreeMap::from([(0, cp)]));
        assert_eq!(
            r.err(),
            Some(SetupError::StatusMismatch {
                component: "plant".to_string(),
                expected: found + 1,
                found,
            })
        );
    }

    #[test]
    fn checkpoint_with_wrong_lifetimes_is_rejected() {
        let o = fragile(false);
        let mut cp = o.starting_checkpoint(0);
        cp.components[0].lifetimes.push(1.0);
        assert!(matches!(
            fragile(false).with_checkpoints(BTreeMap::from([(0, cp)])),
            Err(SetupError::StatusMismatch { .. })
        ));
    }

    #[test]
    fn completed_run_advances_checkpoint() {
        let mut o = fragile(false);
        let before = o.starting_checkpoint(0);
        let r = o.run_scenario(0).unwrap().clone();
        assert!(!r.pending_failure);
        assert!(r.failure_count() > 0);
        assert!(r.labor_cost > 0.0);
        assert_ne!(o.checkpoints().get(&0), Some(&before));
    }

    #[test]
    fn first_failure_rolls_back_to_start() {
        let mut o = fragile(true);
        let before = o.starting_checkpoint(0);
        let r = o.run_scenario(0).unwrap().clone();
        assert!(r.pending_failure);
        assert!(r.log.is_empty());
        assert_eq!(r.labor_cost, 0.0);
        let t = r.last_failure.unwrap_or_else(|| panic!("expected a failure"));
        let cap = r.capacity();
        assert!(cap[t..].iter().all(|&c| c == cap[t]));
        assert_eq!(o.checkpoints().get(&0), Some(&before));
    }

    #[test]
    fn cancelled_run_starts_nothing() {
        let mut o = orchestrator(24, false);
        o.cancel_token().store(true, Ordering::Relaxed);
        assert_eq!(o.run_all(3).unwrap(), 0);
        assert_eq!(o.run_all_parallel(3).unwrap(), 0);
        assert!(o.results().is_empty());
    }

    #[test]
    fn scenarios_use_distinct_streams() {
        let o = orchestrator(24, false);
        assert_ne!(o.starting_checkpoint(0), o.starting_checkpoint(1));
        assert_eq!(o.starting_checkpoint(1), o.starting_checkpoint(1));
    }
}
