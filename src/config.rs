//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::components::{
    Component, ComponentKind, ComponentSpec, FailureMode, Topology, build_components, parse_component_table,
};
use crate::error::{DataError, SetupError, SetupResult};
use crate::io::dispatch::import_dispatch_csv;
use crate::random::Distribution;
use crate::sim::capacity::CondenserTables;
use crate::sim::engine::{PlantParams, PowerCycle, condenser_trains};
use crate::sim::orchestrator::Orchestrator;
use crate::sim::schedule::{DailyProfile, DispatchSchedule};
use crate::sim::types::SimulationParams;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections are optional. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or start from a named preset with
/// [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Horizon, seeding and stop conditions.
    #[serde(default)]
    pub simulation: SimulationParams,
    /// Plant ratings, maintenance and ramping.
    #[serde(default)]
    pub plant: PlantParams,
    /// Equipment counts of the standard power block.
    #[serde(default)]
    pub topology: Topology,
    #[serde(default)]
    pub condenser: CondenserConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Extra components beyond the standard topology.
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    /// Extra components as `;`/newline separated text records.
    #[serde(default)]
    pub component_table: Option<String>,
    /// Failure types attached to components by name.
    #[serde(default)]
    pub failure_types: Vec<FailureTypeConfig>,
}

/// Condenser efficiency tables. Missing tables are linear in trains up.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CondenserConfig {
    /// Efficiency by trains up, used below `temp_threshold`.
    pub cold: Option<Vec<f64>>,
    pub hot: Option<Vec<f64>>,
    /// Ambient temperature (°C) at and above which `hot` applies.
    pub temp_threshold: f64,
}

impl Default for CondenserConfig {
    fn default() -> Self {
        Self {
            cold: None,
            hot: None,
            temp_threshold: 20.0,
        }
    }
}

impl CondenserConfig {
    /// Builds the lookup tables for a plant with `trains` condenser trains.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::CondenserTable`] if a table has the wrong size.
    pub fn tables(&self, trains: usize) -> SetupResult<CondenserTables> {
        if self.cold.is_none() && self.hot.is_none() {
            return Ok(CondenserTables::proportional(trains, self.temp_threshold));
        }
        let linear: Vec<f64> = (0..=trains)
            .map(|k| k as f64 / trains.max(1) as f64)
            .collect();
        CondenserTables::new(
            self.cold.clone().unwrap_or_else(|| linear.clone()),
            self.hot.clone().unwrap_or(linear),
            self.temp_threshold,
            trains,
        )
    }
}

/// Where the dispatch schedule comes from.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// CSV schedule; when absent `profile` generates one.
    pub file: Option<PathBuf>,
    /// Tile the CSV schedule to the horizon.
    pub repeat: bool,
    pub profile: DailyProfile,
}

/// One failure type attached to a named component.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailureTypeConfig {
    pub component: String,
    pub id: String,
    pub mode: FailureMode,
    pub distribution: Distribution,
}

/// A validation or parse error for a scenario configuration field.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted path to the offending field (e.g. `"plant.shutdown_capacity"`).
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

fn err(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError {
        field: field.to_string(),
        message: message.into(),
    }
}

fn check_fraction(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(err(field, "must be in [0.0, 1.0]"));
    }
}

fn check_positive(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(value > 0.0) {
        errors.push(err(field, "must be > 0"));
    }
}

fn check_hour(errors: &mut Vec<ConfigError>, field: &str, value: f64) {
    if !(0.0..24.0).contains(&value) {
        errors.push(err(field, "must be in [0, 24)"));
    }
}

impl ScenarioConfig {
    /// The default plant: two condenser trains that each carry the full
    /// load in cold weather, a daily 12 h cycling schedule.
    pub fn baseline() -> Self {
        Self {
            condenser: CondenserConfig {
                cold: Some(vec![0.0, 1.0, 1.0]),
                hot: Some(vec![0.0, 0.95, 1.0]),
                temp_threshold: 20.0,
            },
            ..Self::default()
        }
    }

    /// A single condenser train with no redundancy.
    pub fn single_train() -> Self {
        Self {
            topology: Topology {
                condenser_trains: 1,
                ..Topology::default()
            },
            condenser: CondenserConfig {
                cold: Some(vec![0.0, 1.0]),
                hot: Some(vec![0.0, 0.9]),
                temp_threshold: 20.0,
            },
            ..Self::default()
        }
    }

    /// Short daily online windows with long standby periods, two weeks.
    pub fn high_cycling() -> Self {
        let mut cfg = Self::baseline();
        cfg.simulation.sim_length = 336;
        cfg.simulation.num_scenarios = 25;
        cfg.dispatch.profile = DailyProfile {
            power_fraction: 0.8,
            online_start_hour: 10.0,
            online_end_hour: 16.0,
            standby_hours: 3.0,
            ..DailyProfile::default()
        };
        cfg
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "single_train", "high_cycling"];

    /// Loads a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "single_train" => Ok(Self::single_train()),
            "high_cycling" => Ok(Self::high_cycling()),
            _ => Err(err(
                "preset",
                format!(
                    "unknown preset \"{name}\", expected one of: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file. A relative `dispatch.file` is
    /// resolved against the scenario file's directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| err("file", format!("{}: {e}", path.display())))?;
        let mut cfg = Self::from_toml_str(&content)?;
        if let (Some(file), Some(dir)) = (&cfg.dispatch.file, path.parent()) {
            if file.is_relative() {
                cfg.dispatch.file = Some(dir.join(file));
            }
        }
        Ok(cfg)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| err("toml", e.to_string()))
    }

    /// Validates all fields and returns every violation found.
    ///
    /// Returns an empty vector if the configuration is valid. Errors that
    /// need the component list (duplicates, unknown names) surface from
    /// [`ScenarioConfig::build_plant`] instead.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if s.sim_length == 0 {
            errors.push(err("simulation.sim_length", "must be > 0"));
        }
        if s.num_scenarios == 0 {
            errors.push(err("simulation.num_scenarios", "must be > 0"));
        }
        check_positive(&mut errors, "simulation.steplength", s.steplength);
        if !(s.epsilon >= 0.0) {
            errors.push(err("simulation.epsilon", "must be >= 0"));
        }
        if !(s.hourly_labor_cost >= 0.0) {
            errors.push(err("simulation.hourly_labor_cost", "must be >= 0"));
        }

        let p = &self.plant;
        check_positive(&mut errors, "plant.nameplate_kw", p.nameplate_kw);
        check_positive(&mut errors, "plant.maintenance_interval", p.maintenance_interval);
        if !(p.maintenance_duration >= 0.0) {
            errors.push(err("plant.maintenance_duration", "must be >= 0"));
        }
        if !(p.downtime_threshold >= 0.0) {
            errors.push(err("plant.downtime_threshold", "must be >= 0"));
        }
        check_fraction(&mut errors, "plant.shutdown_capacity", p.shutdown_capacity);
        check_fraction(&mut errors, "plant.no_restart_capacity", p.no_restart_capacity);
        check_fraction(&mut errors, "plant.shutdown_efficiency", p.shutdown_efficiency);
        check_fraction(&mut errors, "plant.no_restart_efficiency", p.no_restart_efficiency);
        check_positive(&mut errors, "plant.ramp_base_fraction", p.ramp_base_fraction);
        if p.ramp_min_factor >= p.ramp_max_factor {
            errors.push(err("plant.ramp_min_factor", "must be < plant.ramp_max_factor"));
        }
        if p.ramp_penalty_min > p.ramp_penalty_max {
            errors.push(err("plant.ramp_penalty_min", "must be <= plant.ramp_penalty_max"));
        }

        let trains = self.topology.condenser_trains
            + self
                .components
                .iter()
                .filter(|c| c.kind == ComponentKind::CondenserTrain)
                .count();
        for (field, table) in [
            ("condenser.cold", &self.condenser.cold),
            ("condenser.hot", &self.condenser.hot),
        ] {
            let Some(table) = table else { continue };
            if table.len() != trains + 1 {
                errors.push(err(
                    field,
                    format!(
                        "has {} entries, expected {} (condenser trains + 1)",
                        table.len(),
                        trains + 1
                    ),
                ));
            }
            if table.iter().any(|v| !(0.0..=1.0).contains(v)) {
                errors.push(err(field, "entries must be in [0.0, 1.0]"));
            }
        }

        let d = &self.dispatch.profile;
        check_fraction(&mut errors, "dispatch.profile.power_fraction", d.power_fraction);
        check_hour(&mut errors, "dispatch.profile.online_start_hour", d.online_start_hour);
        check_hour(&mut errors, "dispatch.profile.online_end_hour", d.online_end_hour);
        check_hour(&mut errors, "dispatch.profile.standby_hours", d.standby_hours);
        if !(d.ambient_noise_std_c >= 0.0) {
            errors.push(err("dispatch.profile.ambient_noise_std_c", "must be >= 0"));
        }
        if self.dispatch.repeat && self.dispatch.file.is_none() {
            errors.push(err("dispatch.repeat", "requires dispatch.file"));
        }

        for (i, ft) in self.failure_types.iter().enumerate() {
            if let Err(e) = ft.distribution.validate() {
                errors.push(err(&format!("failure_types[{i}].distribution"), e.to_string()));
            }
        }

        errors
    }

    /// Builds the plant: standard topology, then extra components, then
    /// extra failure types.
    ///
    /// # Errors
    ///
    /// Returns a [`SetupError`] for a malformed record, a reserved or
    /// duplicate name, a failure type on an unknown component, or a
    /// condenser table of the wrong size.
    pub fn build_plant(&self) -> SetupResult<PowerCycle> {
        let mut components = build_components(&self.topology)?;
        let mut specs = self.components.clone();
        if let Some(table) = &self.component_table {
            specs.extend(parse_component_table(table)?);
        }
        for spec in specs {
            components.push(Component::new(spec)?);
        }
        for ft in &self.failure_types {
            let component = components
                .iter_mut()
                .find(|c| c.name() == ft.component)
                .ok_or_else(|| SetupError::UnknownComponent(ft.component.clone()))?;
            component.add_failure_type(&ft.id, ft.mode, ft.distribution)?;
        }
        let tables = self.condenser.tables(condenser_trains(&components))?;
        PowerCycle::new(components, self.plant.clone(), tables)
    }

    /// Dispatch schedule for the full horizon.
    ///
    /// # Errors
    ///
    /// Returns a [`DataError`] if the CSV cannot be read or is shorter than
    /// the horizon.
    pub fn schedule(&self) -> Result<DispatchSchedule, DataError> {
        let horizon = self.simulation.horizon();
        let Some(path) = &self.dispatch.file else {
            return Ok(DispatchSchedule::daily(
                &self.dispatch.profile,
                self.plant.nameplate_kw,
                horizon,
                self.simulation.steplength,
                u64::from(self.simulation.seed),
            ));
        };
        let mut schedule = import_dispatch_csv(path)?;
        if self.dispatch.repeat && !schedule.is_empty() {
            schedule = schedule.tiled(horizon);
        }
        schedule.covers(horizon)?;
        Ok(schedule)
    }

    /// Plant, schedule and parameters wired into a ready-to-run orchestrator.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`ScenarioConfig::build_plant`] and
    /// [`ScenarioConfig::schedule`].
    pub fn build_orchestrator(&self) -> Result<Orchestrator, DataError> {
        let plant = self.build_plant()?;
        let schedule = self.schedule()?;
        Ok(Orchestrator::new(plant, schedule, self.simulation.clone())?)
    }
}
