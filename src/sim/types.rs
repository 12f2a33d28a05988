//! Core simulation types: run parameters and per-step records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::OperatingMode;

/// Run-level parameters shared by every scenario.
///
/// # Examples
///
/// ```
/// use cycle_avail_sim::sim::types::SimulationParams;
///
/// let params = SimulationParams {
///     read_periods: 24,
///     sim_length: 48,
///     ..SimulationParams::default()
/// };
/// assert_eq!(params.horizon(), 72);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationParams {
    /// Leading steps replayed from a prior failure log instead of simulated.
    pub read_periods: usize,
    /// Steps simulated after the replay window.
    pub sim_length: usize,
    /// Step length (h).
    pub steplength: f64,
    /// Tolerance below which power and capacity count as zero.
    pub epsilon: f64,
    /// Master seed; each scenario derives its own streams from it.
    pub seed: u32,
    pub num_scenarios: usize,
    /// Labor cost per repair hour.
    pub hourly_labor_cost: f64,
    /// Abandon a scenario at its first new failure and roll it back.
    pub stop_at_first_failure: bool,
    /// Stop a scenario at its first completed repair.
    pub stop_at_first_repair: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            read_periods: 0,
            sim_length: 168,
            steplength: 1.0,
            epsilon: 1e-10,
            seed: 42,
            num_scenarios: 10,
            hourly_labor_cost: 50.0,
            stop_at_first_failure: false,
            stop_at_first_repair: false,
        }
    }
}

impl SimulationParams {
    /// Total steps per scenario, replay window included.
    pub fn horizon(&self) -> usize {
        self.read_periods + self.sim_length
    }
}

/// How the cycle is entering production or standby this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartType {
    /// Not a start (already online, or no power commanded).
    None,
    /// Start from standby.
    Hot,
    /// Start after a short outage.
    Warm,
    /// Start after a long outage.
    Cold,
}

impl StartType {
    pub fn code(self) -> &'static str {
        match self {
            Self::None => "-",
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
        }
    }
}

/// Realized plant output and state for one timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub timestep: usize,
    /// Simulation time at the start of the step (h).
    pub time_hr: f64,
    pub mode: OperatingMode,
    pub start: StartType,
    /// Commanded cycle output (kW).
    pub commanded_kw: f64,
    /// Delivered output after capacity limits (kW).
    pub power_kw: f64,
    /// Capacity fraction of nameplate, in `[0, 1]`.
    pub capacity: f64,
    /// Efficiency fraction, in `[0, 1]`.
    pub efficiency: f64,
    pub turbine_capacity: f64,
    pub turbine_efficiency: f64,
    pub ramp_multiplier: f64,
    pub trains_online: usize,
    /// Components with outstanding downtime at the end of the step.
    pub components_down: usize,
    /// New failures logged this step.
    pub failures: usize,
    /// Components returned to service this step.
    pub repairs: usize,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} ({:>6.1}h) | {:<3} start={:<4} | cmd={:>10.1} kW  out={:>10.1} kW | \
             cap={:.4}  eff={:.4}  ramp={:.2} | trains={} down={} fail={} rep={}",
            self.timestep,
            self.time_hr,
            self.mode.code(),
            self.start.code(),
            self.commanded_kw,
            self.power_kw,
            self.capacity,
            self.efficiency,
            self.ramp_multiplier,
            self.trains_online,
            self.components_down,
            self.failures,
            self.repairs,
        )
    }
}
