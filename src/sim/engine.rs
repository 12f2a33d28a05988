//! Plant operating-mode state machine and the per-step dispatch loop.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::components::{Component, ComponentKind, ComponentStatus, EventContext, OperatingMode};
use crate::error::{SetupError, SetupResult};
use crate::random::{JohnsonSb, RngSet, Well512};

use super::capacity::{CondenserTables, CycleCapacity, aggregate};
use super::clock::Clock;
use super::event::{EventKind, FailureEvent, FailureLog};
use super::schedule::DispatchSchedule;
use super::types::{SimulationParams, StartType, StepRecord};

const HOT_START: JohnsonSb = JohnsonSb::new(0.995066, 0.252898, 4.139e-5, 4.489e-4);
const WARM_START: JohnsonSb = JohnsonSb::new(2.220435, 0.623145, 2.914e-5, 1.773e-3);
const COLD_START: JohnsonSb = JohnsonSb::new(0.469391, 0.581813, 3.691e-5, 2.369e-4);

/// Static plant ratings and operating thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlantParams {
    /// Cycle rating (kW).
    pub nameplate_kw: f64,
    /// Online hours between planned maintenance outages.
    pub maintenance_interval: f64,
    /// Length of a planned maintenance outage (h).
    pub maintenance_duration: f64,
    /// Outage length (h) up to which a restart counts as warm.
    pub downtime_threshold: f64,
    /// Capacity below which a running plant is taken down for repair.
    pub shutdown_capacity: f64,
    /// Capacity below which an idle plant stays down until repaired.
    pub no_restart_capacity: f64,
    /// Efficiency below which a running plant is taken down. 0 disables.
    pub shutdown_efficiency: f64,
    /// Efficiency below which an idle plant stays down. 0 disables.
    pub no_restart_efficiency: f64,
    /// Output change, as a fraction of nameplate, that the ramp thresholds
    /// are scaled from.
    pub ramp_base_fraction: f64,
    pub ramp_min_factor: f64,
    pub ramp_max_factor: f64,
    /// Life-consumption multiplier at the minimum ramp threshold.
    pub ramp_penalty_min: f64,
    /// Multiplier cap, reached at the maximum ramp threshold.
    pub ramp_penalty_max: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            nameplate_kw: 500_000.0,
            maintenance_interval: 5000.0,
            maintenance_duration: 24.0,
            downtime_threshold: 24.0,
            shutdown_capacity: 0.45,
            no_restart_capacity: 0.9,
            shutdown_efficiency: 0.0,
            no_restart_efficiency: 0.0,
            ramp_base_fraction: 0.2,
            ramp_min_factor: 1.1,
            ramp_max_factor: 2.0,
            ramp_penalty_min: 2.0,
            ramp_penalty_max: 8.0,
        }
    }
}

impl PlantParams {
    /// Output change (kW) at which ramp wear starts.
    pub fn ramp_threshold_min(&self) -> f64 {
        self.ramp_min_factor * self.ramp_base_fraction * self.nameplate_kw
    }

    /// Output change (kW) at which ramp wear is capped.
    pub fn ramp_threshold_max(&self) -> f64 {
        self.ramp_max_factor * self.ramp_base_fraction * self.nameplate_kw
    }
}

/// Hazard-rate increases applied on hot, warm and cold starts.
///
/// All three come from one shared percentile so a scenario that is unlucky
/// on one start type is unlucky on all of them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StartPenalties {
    pub hot: f64,
    pub warm: f64,
    pub cold: f64,
}

impl StartPenalties {
    pub fn draw(rng: &mut Well512) -> Self {
        let u = rng.next_uniform();
        Self {
            hot: HOT_START.inverse_cdf(u),
            warm: WARM_START.inverse_cdf(u),
            cold: COLD_START.inverse_cdf(u),
        }
    }

    pub fn penalty(&self, start: StartType) -> f64 {
        match start {
            StartType::None => 0.0,
            StartType::Hot => self.hot,
            StartType::Warm => self.warm,
            StartType::Cold => self.cold,
        }
    }
}

/// Mutable plant-level state, snapshotted with each checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    pub is_online: bool,
    pub is_on_standby: bool,
    /// Hours since the current online period began.
    pub time_online: f64,
    /// Hours since the current standby period began.
    pub time_in_standby: f64,
    /// Hours the plant has been fully off.
    pub downtime: f64,
    pub hours_to_maintenance: f64,
    /// Output realized in the previous step (kW).
    pub power_output: f64,
    pub penalties: StartPenalties,
}

impl PlantState {
    fn initial(params: &PlantParams, penalties: StartPenalties) -> Self {
        Self {
            is_online: false,
            is_on_standby: false,
            time_online: 0.0,
            time_in_standby: 0.0,
            downtime: 0.0,
            hours_to_maintenance: params.maintenance_interval,
            power_output: 0.0,
            penalties,
        }
    }
}

/// Outcome of one pass over the dispatch horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRun {
    /// One record per horizon step.
    pub records: Vec<StepRecord>,
    /// Events generated after the replay window.
    pub log: FailureLog,
    /// Step of the first new component failure.
    pub first_failure: Option<usize>,
    /// Step of the first completed repair.
    pub first_repair: Option<usize>,
    /// The run ended at a stop condition and the tail was filled in.
    pub stopped_early: bool,
}

/// Number of condenser-train components in `components`.
pub fn condenser_trains(components: &[Component]) -> usize {
    components
        .iter()
        .filter(|c| c.kind() == ComponentKind::CondenserTrain)
        .count()
}

/// A power block: its components, ratings and plant-level state.
#[derive(Debug, Clone)]
pub struct PowerCycle {
    components: Vec<Component>,
    params: PlantParams,
    tables: CondenserTables,
    state: PlantState,
}

impl PowerCycle {
    /// # Errors
    ///
    /// Returns [`SetupError::DuplicateComponent`] if two components share a
    /// name, or [`SetupError::CondenserTable`] if the tables are not sized
    /// for the number of condenser trains installed.
    pub fn new(
        components: Vec<Component>,
        params: PlantParams,
        tables: CondenserTables,
    ) -> SetupResult<Self> {
        let mut seen = HashSet::new();
        for c in &components {
            if !seen.insert(c.name()) {
                return Err(SetupError::DuplicateComponent(c.name().to_string()));
            }
        }
        tables.check_trains(condenser_trains(&components))?;
        let state = PlantState::initial(&params, StartPenalties::default());
        Ok(Self {
            components,
            params,
            tables,
            state,
        })
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    pub fn tables(&self) -> &CondenserTables {
        &self.tables
    }

    pub fn state(&self) -> &PlantState {
        &self.state
    }

    /// Returns the plant to an as-new state: fresh start penalties, fresh
    /// component lives and a full maintenance interval.
    pub fn reset(&mut self, rngs: &mut RngSet) {
        let penalties = StartPenalties::draw(&mut rngs.life);
        for c in &mut self.components {
            c.reset(&mut rngs.life);
        }
        self.state = PlantState::initial(&self.params, penalties);
    }

    /// Plant and component state, for checkpointing.
    pub fn snapshot(&self) -> (PlantState, Vec<ComponentStatus>) {
        (
            self.state.clone(),
            self.components.iter().map(|c| c.status().clone()).collect(),
        )
    }

    /// Restores a [`PowerCycle::snapshot`].
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::StatusMismatch`] if the snapshot was taken from
    /// a plant with different components.
    pub fn restore(&mut self, plant: PlantState, statuses: Vec<ComponentStatus>) -> SetupResult<()> {
        if statuses.len() != self.components.len() {
            return Err(SetupError::StatusMismatch {
                component: "plant".to_string(),
                expected: self.components.len(),
                found: statuses.len(),
            });
        }
        for (c, status) in self.components.iter_mut().zip(statuses) {
            c.restore_status(status)?;
        }
        self.state = plant;
        Ok(())
    }

    /// Current capacity and efficiency at `ambient_c`.
    pub fn capacity(&self, ambient_c: f64) -> CycleCapacity {
        aggregate(&self.components, &self.tables, ambient_c)
    }

    /// Classifies the transition commanded by `power_kw`.
    pub fn start_type(&self, power_kw: f64, eps: f64) -> StartType {
        if power_kw <= eps || self.state.is_online {
            StartType::None
        } else if self.state.is_on_standby {
            StartType::Hot
        } else if self.state.downtime <= self.params.downtime_threshold {
            StartType::Warm
        } else {
            StartType::Cold
        }
    }

    /// Operating mode commanded by `power_kw` and `standby`.
    pub fn operating_mode(&self, power_kw: f64, standby: bool, eps: f64) -> OperatingMode {
        if power_kw > eps {
            match (self.state.is_online, self.state.time_online <= 1.0 - eps) {
                (false, _) => OperatingMode::OnlineStart,
                (true, true) => OperatingMode::OnlineFirst,
                (true, false) => OperatingMode::OnlineOngoing,
            }
        } else if standby {
            match (self.state.is_on_standby, self.state.time_in_standby <= 1.0 - eps) {
                (false, _) => OperatingMode::StandbyStart,
                (true, true) => OperatingMode::StandbyFirst,
                (true, false) => OperatingMode::StandbyOngoing,
            }
        } else {
            OperatingMode::Off
        }
    }

    /// Life-consumption multiplier for moving from last step's output to
    /// `power_kw`.
    pub fn ramp_multiplier(&self, power_kw: f64, eps: f64) -> f64 {
        if power_kw <= eps {
            return 1.0;
        }
        let delta = (power_kw - self.state.power_output).abs();
        let min = self.params.ramp_threshold_min();
        let max = self.params.ramp_threshold_max();
        if delta < min {
            return 1.0;
        }
        let (lo, hi) = (self.params.ramp_penalty_min, self.params.ramp_penalty_max);
        if max <= min {
            return hi;
        }
        (lo + (hi - lo) * (delta - min) / (max - min)).min(hi)
    }

    fn max_component_downtime(&self) -> f64 {
        self.components
            .iter()
            .map(Component::downtime_remaining)
            .fold(0.0, f64::max)
    }

    /// Takes every component down. Planned outages also restore component
    /// age and hazard rate and restart the maintenance countdown.
    fn maintenance_shutdown(&mut self, planned: bool, duration: f64) {
        for c in &mut self.components {
            if planned {
                c.perform_maintenance(duration);
            } else {
                c.shutdown(duration);
            }
        }
        if planned {
            self.state.hours_to_maintenance = self.params.maintenance_interval;
        }
    }

    /// Applies the recorded events of step `t` from a prior run.
    fn replay_step(&mut self, replay: &FailureLog, t: usize) {
        for event in replay.at(t) {
            match event.kind {
                EventKind::PlannedMaintenance => {
                    self.maintenance_shutdown(true, self.params.maintenance_duration);
                }
                EventKind::UnplannedMaintenance => self.maintenance_shutdown(false, event.downtime),
                EventKind::Failure => {
                    let target = self.components.iter_mut().find(|c| c.name() == event.component);
                    match (target, event.failure_index) {
                        (Some(c), Some(idx)) => c.read_failure(idx, event.downtime, event.new_life),
                        _ => warn!(
                            t,
                            component = %event.component,
                            "replayed failure does not match any component"
                        ),
                    }
                }
            }
        }
    }

    /// Advances plant counters for `mode`.
    fn update_plant_state(&mut self, mode: OperatingMode, steplength: f64) {
        let s = &mut self.state;
        match mode {
            OperatingMode::Off => {
                s.is_online = false;
                s.is_on_standby = false;
                s.downtime += steplength;
                s.time_in_standby = 0.0;
                s.time_online = 0.0;
            }
            OperatingMode::StandbyStart => {
                s.is_online = false;
                s.is_on_standby = true;
                s.time_in_standby = steplength;
                s.downtime = 0.0;
                s.time_online = 0.0;
            }
            OperatingMode::StandbyFirst | OperatingMode::StandbyOngoing => {
                s.time_in_standby += steplength;
            }
            OperatingMode::OnlineStart => {
                s.is_online = true;
                s.is_on_standby = false;
                s.time_in_standby = 0.0;
                s.downtime = 0.0;
                s.time_online = steplength;
                s.hours_to_maintenance -= steplength;
            }
            OperatingMode::OnlineFirst | OperatingMode::OnlineOngoing => {
                s.time_online += steplength;
                s.hours_to_maintenance -= steplength;
            }
        }
    }

    /// Runs the dispatch horizon once from the current state.
    ///
    /// Steps before `params.read_periods` replay `replay` (if given) and
    /// generate no new failures. Later steps test for failures, take forced
    /// outages and operate every component.
    ///
    /// # Panics
    ///
    /// Panics if the schedule is shorter than the horizon, or if a component
    /// reaches an impossible state (see [`Component::operate`]).
    pub fn run(
        &mut self,
        schedule: &DispatchSchedule,
        params: &SimulationParams,
        scenario: usize,
        rngs: &mut RngSet,
        replay: Option<&FailureLog>,
    ) -> ScenarioRun {
        let horizon = params.horizon();
        assert!(
            schedule.len() >= horizon,
            "scenario {scenario}: dispatch covers {} steps, horizon is {horizon}",
            schedule.len()
        );
        let eps = params.epsilon;
        let dt = params.steplength;
        let mut run = ScenarioRun {
            records: Vec::with_capacity(horizon),
            log: FailureLog::new(),
            first_failure: None,
            first_repair: None,
            stopped_early: false,
        };

        let mut clock = Clock::new(horizon, dt);
        while let Some(t) = clock.tick() {
            let read_only = t < params.read_periods;
            let ambient = schedule.ambient_temperature[t];

            if read_only {
                if let Some(log) = replay {
                    self.replay_step(log, t);
                }
            } else if self.state.hours_to_maintenance <= 0.0 {
                let duration = self.params.maintenance_duration;
                self.maintenance_shutdown(true, duration);
                info!(scenario, t, duration, "planned maintenance");
                run.log.push(FailureEvent::maintenance(scenario, t, true, duration));
            }

            let commanded = schedule.cycle_power[t];
            let mut power = commanded;
            let mut cap = self.capacity(ambient);
            let mut mode = self.operating_mode(power, schedule.standby[t], eps);
            if cap.capacity < eps {
                power = 0.0;
                mode = OperatingMode::Off;
            }
            let start = self.start_type(power, eps);
            let ramp = self.ramp_multiplier(power, eps);
            let hazard_increase = self.state.penalties.penalty(start);

            let mut failures = 0;
            if !read_only {
                let mut ctx = EventContext {
                    scenario,
                    time: t,
                    rng: &mut *rngs,
                    log: &mut run.log,
                };
                for c in &mut self.components {
                    if c.test_for_failure(&mut ctx, dt, ramp, hazard_increase, mode) {
                        failures += 1;
                    }
                }

                cap = self.capacity(ambient);
                if cap.capacity < eps {
                    power = 0.0;
                    mode = OperatingMode::Off;
                } else if self.forced_outage(&cap, mode) {
                    let duration = self.max_component_downtime();
                    warn!(
                        scenario,
                        t,
                        capacity = cap.capacity,
                        efficiency = cap.efficiency,
                        duration,
                        "unplanned maintenance shutdown"
                    );
                    self.maintenance_shutdown(false, duration);
                    run.log.push(FailureEvent::maintenance(scenario, t, false, duration));
                    power = 0.0;
                    mode = OperatingMode::Off;
                    cap = self.capacity(ambient);
                }
            }

            power = power.min(cap.capacity * self.params.nameplate_kw);
            self.state.power_output = power;
            self.update_plant_state(mode, dt);

            let repairs = {
                let ctx = EventContext {
                    scenario,
                    time: t,
                    rng: &mut *rngs,
                    log: &mut run.log,
                };
                let mut repairs = 0;
                for c in &mut self.components {
                    if c.is_operational() {
                        c.operate(&ctx, dt, ramp, hazard_increase, mode, read_only);
                    } else if c.advance_downtime(dt, mode) {
                        debug!(scenario, t, component = %c.name(), "component repaired");
                        repairs += 1;
                    } else if mode.is_online() && !c.can_be_repaired(mode) {
                        c.rearm_repair();
                    }
                }
                repairs
            };

            let record = StepRecord {
                timestep: t,
                time_hr: clock.time_of(t),
                mode,
                start: if mode == OperatingMode::Off { StartType::None } else { start },
                commanded_kw: commanded,
                power_kw: power,
                capacity: cap.capacity,
                efficiency: cap.efficiency,
                turbine_capacity: cap.turbine_capacity,
                turbine_efficiency: cap.turbine_efficiency,
                ramp_multiplier: ramp,
                trains_online: cap.trains_online,
                components_down: self.components.iter().filter(|c| !c.is_operational()).count(),
                failures,
                repairs,
            };
            run.records.push(record);

            if failures > 0 && run.first_failure.is_none() {
                run.first_failure = Some(t);
            }
            if repairs > 0 && !read_only && run.first_repair.is_none() {
                run.first_repair = Some(t);
            }
            let stop = (params.stop_at_first_failure && failures > 0)
                || (params.stop_at_first_repair && repairs > 0 && !read_only);
            if stop && clock.remaining() > 0 {
                fill_remaining(&mut run.records, &clock);
                clock.stop();
                run.stopped_early = true;
            }
        }
        run
    }

    fn forced_outage(&self, cap: &CycleCapacity, mode: OperatingMode) -> bool {
        let p = &self.params;
        let low = cap.capacity < p.shutdown_capacity || cap.efficiency < p.shutdown_efficiency;
        let idle_low = mode == OperatingMode::Off
            && (cap.capacity < p.no_restart_capacity || cap.efficiency < p.no_restart_efficiency);
        (low || idle_low) && self.max_component_downtime() > 0.0
    }
}

/// Repeats the last record over the steps the clock has not yet yielded.
fn fill_remaining(records: &mut Vec<StepRecord>, clock: &Clock) {
    let Some(last) = records.last().cloned() else {
        return;
    };
    let start = last.timestep + 1;
    for t in start..start + clock.remaining() {
        records.push(StepRecord {
            timestep: t,
            time_hr: clock.time_of(t),
            failures: 0,
            repairs: 0,
            ..last.clone()
        });
    }
}
