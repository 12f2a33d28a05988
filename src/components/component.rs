//! Repairable plant equipment: failure testing, life accounting and repair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::failure::{FailureMode, FailureType, OperatingMode};
use crate::error::{SetupError, SetupResult};
use crate::random::{Distribution, RngSet, Well512};
use crate::sim::event::{FailureEvent, EventKind, FailureLog, MAINTENANCE, UNPLANNED_MAINTENANCE};

/// Turbine capacity lost per online hour of age.
const AGE_CAPACITY_LOSS_PER_HOUR: f64 = 0.005 / 5000.0;
/// Turbine efficiency lost per online hour of age.
const AGE_EFFICIENCY_LOSS_PER_HOUR: f64 = 0.002 / 5000.0;

/// When a down component may consume repair time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RepairPolicy {
    /// `A`: in any plant mode.
    Anytime,
    /// `S`: while the plant is in standby or off.
    Standby,
    /// `D`: only while the plant is off.
    Downtime,
}

impl RepairPolicy {
    pub fn allows(self, mode: OperatingMode) -> bool {
        match self {
            Self::Anytime => true,
            Self::Standby => mode == OperatingMode::Off || mode.is_standby(),
            Self::Downtime => mode == OperatingMode::Off,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Anytime => "A",
            Self::Standby => "S",
            Self::Downtime => "D",
        }
    }
}

impl FromStr for RepairPolicy {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::Anytime),
            "S" => Ok(Self::Standby),
            "D" => Ok(Self::Downtime),
            _ => Err(SetupError::UnknownPolicy(s.to_string())),
        }
    }
}

impl TryFrom<String> for RepairPolicy {
    type Error = SetupError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RepairPolicy> for String {
    fn from(p: RepairPolicy) -> Self {
        p.code().to_string()
    }
}

/// Equipment class. Decides how a component enters capacity aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ComponentKind {
    CondenserTrain,
    CondenserFan,
    SaltToSteamTrain,
    FeedwaterHeater,
    SaltPump,
    WaterPump,
    Turbine,
    /// Any other equipment; a plain availability multiplier.
    Auxiliary,
}

impl ComponentKind {
    const ALL: [ComponentKind; 8] = [
        Self::CondenserTrain,
        Self::CondenserFan,
        Self::SaltToSteamTrain,
        Self::FeedwaterHeater,
        Self::SaltPump,
        Self::WaterPump,
        Self::Turbine,
        Self::Auxiliary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CondenserTrain => "Condenser train",
            Self::CondenserFan => "Condenser fan",
            Self::SaltToSteamTrain => "Salt-to-steam train",
            Self::FeedwaterHeater => "Feedwater heater",
            Self::SaltPump => "Molten salt pump",
            Self::WaterPump => "Water pump",
            Self::Turbine => "Turbine",
            Self::Auxiliary => "Auxiliary",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComponentKind {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "Water pump", "water_pump" and "water-pump" all name the same kind.
        let key = normalize_kind(s);
        Self::ALL
            .into_iter()
            .find(|k| normalize_kind(k.name()) == key)
            .ok_or_else(|| SetupError::UnknownKind(s.to_string()))
    }
}

fn normalize_kind(s: &str) -> String {
    s.trim()
        .chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

impl TryFrom<String> for ComponentKind {
    type Error = SetupError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ComponentKind> for String {
    fn from(k: ComponentKind) -> Self {
        k.name().to_string()
    }
}

/// Static ratings of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSpec {
    pub name: String,
    pub kind: ComponentKind,
    /// Mean of the exponential repair time (h).
    pub mean_repair_time: f64,
    /// Fixed time (h) added after every repair.
    #[serde(default)]
    pub cooldown: f64,
    /// Capacity fraction lost while down (or contributed while up, for
    /// parallel-redundant kinds).
    pub capacity_weight: f64,
    /// Efficiency fraction contributed while up, for turbines.
    #[serde(default)]
    pub efficiency_weight: f64,
    #[serde(default)]
    pub repair_cost: f64,
    pub policy: RepairPolicy,
}

/// Mutable state of a component, one lifetime per failure type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    pub lifetimes: Vec<f64>,
    pub hazard_rate: f64,
    pub downtime_remaining: f64,
    /// Full downtime drawn at the last failure or shutdown.
    pub repair_event_time: f64,
    /// Online hours since last maintenance.
    pub age: f64,
}

impl ComponentStatus {
    fn as_new(failure_types: usize) -> Self {
        Self {
            lifetimes: vec![0.0; failure_types],
            hazard_rate: 1.0,
            downtime_remaining: 0.0,
            repair_event_time: 0.0,
            age: 0.0,
        }
    }
}

/// Where a component records what happens to it during one step.
pub struct EventContext<'a> {
    pub scenario: usize,
    pub time: usize,
    pub rng: &'a mut RngSet,
    pub log: &'a mut FailureLog,
}

/// A repairable unit of equipment.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    spec: ComponentSpec,
    repair: Distribution,
    failure_types: Vec<FailureType>,
    status: ComponentStatus,
}

impl Component {
    /// Creates a component with no failure types.
    ///
    /// # Errors
    ///
    /// Returns a [`SetupError`] if the name is reserved for maintenance
    /// events or any rating is out of range.
    pub fn new(spec: ComponentSpec) -> SetupResult<Self> {
        if spec.name == MAINTENANCE || spec.name == UNPLANNED_MAINTENANCE {
            return Err(SetupError::ReservedName(spec.name));
        }
        if spec.name.trim().is_empty() {
            return Err(SetupError::InvalidComponent("name must not be empty".into()));
        }
        let non_negative = [
            ("cooldown", spec.cooldown),
            ("capacity_weight", spec.capacity_weight),
            ("efficiency_weight", spec.efficiency_weight),
            ("repair_cost", spec.repair_cost),
        ];
        for (field, v) in non_negative {
            if !(v.is_finite() && v >= 0.0) {
                return Err(SetupError::InvalidComponent(format!(
                    "{}: {field} must be >= 0, got {v}",
                    spec.name
                )));
            }
        }
        let repair = Distribution::Exponential {
            scale: spec.mean_repair_time,
        };
        repair.validate().map_err(|_| {
            SetupError::InvalidComponent(format!(
                "{}: mean_repair_time must be > 0, got {}",
                spec.name, spec.mean_repair_time
            ))
        })?;
        Ok(Self {
            spec,
            repair,
            failure_types: Vec::new(),
            status: ComponentStatus::as_new(0),
        })
    }

    /// Adds a failure type. Its life is drawn at the next [`Component::reset`].
    ///
    /// # Errors
    ///
    /// Returns a [`SetupError`] if the mode and distribution disagree.
    pub fn add_failure_type(
        &mut self,
        id: &str,
        mode: FailureMode,
        distribution: Distribution,
    ) -> SetupResult<()> {
        let ft = FailureType::new(&self.spec.name, id, mode, distribution)?;
        self.failure_types.push(ft);
        self.status.lifetimes.push(0.0);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.spec.kind
    }

    pub fn spec(&self) -> &ComponentSpec {
        &self.spec
    }

    pub fn failure_types(&self) -> &[FailureType] {
        &self.failure_types
    }

    pub fn status(&self) -> &ComponentStatus {
        &self.status
    }

    pub fn is_operational(&self) -> bool {
        self.status.downtime_remaining == 0.0
    }

    pub fn downtime_remaining(&self) -> f64 {
        self.status.downtime_remaining
    }

    pub fn capacity_weight(&self) -> f64 {
        self.spec.capacity_weight
    }

    pub fn efficiency_weight(&self) -> f64 {
        self.spec.efficiency_weight
    }

    /// Capacity retained after aging; only turbines age.
    pub fn capacity_factor(&self) -> f64 {
        match self.spec.kind {
            ComponentKind::Turbine => (1.0 - self.status.age * AGE_CAPACITY_LOSS_PER_HOUR).max(0.0),
            _ => 1.0,
        }
    }

    /// Efficiency retained after aging; only turbines age.
    pub fn efficiency_factor(&self) -> f64 {
        match self.spec.kind {
            ComponentKind::Turbine => {
                (1.0 - self.status.age * AGE_EFFICIENCY_LOSS_PER_HOUR).max(0.0)
            }
            _ => 1.0,
        }
    }

    /// Replaces the status with a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::StatusMismatch`] if the snapshot does not hold
    /// one lifetime per failure type.
    pub fn restore_status(&mut self, status: ComponentStatus) -> SetupResult<()> {
        if status.lifetimes.len() != self.failure_types.len() {
            return Err(SetupError::StatusMismatch {
                component: self.spec.name.clone(),
                expected: self.failure_types.len(),
                found: status.lifetimes.len(),
            });
        }
        self.status = status;
        Ok(())
    }

    /// Returns the component to an as-new state with fresh lives.
    pub fn reset(&mut self, rng: &mut Well512) {
        let lifetimes = self.failure_types.iter().map(|ft| ft.draw(rng)).collect();
        self.status = ComponentStatus {
            lifetimes,
            ..ComponentStatus::as_new(self.failure_types.len())
        };
    }

    /// Checks every on-start failure type for `start`.
    ///
    /// Fails the component on the first check whose uniform draw is at most
    /// `probability * hazard_rate`.
    ///
    /// # Returns
    ///
    /// `true` if the component failed.
    pub fn test_for_binary_failure(&mut self, ctx: &mut EventContext<'_>, start: OperatingMode) -> bool {
        for idx in 0..self.failure_types.len() {
            if !self.failure_types[idx].checked_on_start(start) {
                continue;
            }
            let u = ctx.rng.binary.next_uniform();
            if u <= self.status.lifetimes[idx] * self.status.hazard_rate {
                self.fail(ctx, idx);
                return true;
            }
        }
        false
    }

    /// Tests whether operating for `elapsed` hours in `mode` would exhaust
    /// any life, and fails the component if so.
    ///
    /// Start modes first run the on-start checks, then evaluate continuous
    /// lives against the first-hour submode. `hazard_increase` is the start
    /// penalty of this step; it is not applied to the stored hazard rate.
    ///
    /// # Returns
    ///
    /// `true` if the component failed.
    pub fn test_for_failure(
        &mut self,
        ctx: &mut EventContext<'_>,
        elapsed: f64,
        ramp_multiplier: f64,
        hazard_increase: f64,
        mode: OperatingMode,
    ) -> bool {
        if mode == OperatingMode::Off || !self.is_operational() {
            return false;
        }
        if mode.is_start() && self.test_for_binary_failure(ctx, mode) {
            return true;
        }
        let running = mode.running_submode();
        let consumption = elapsed * (self.status.hazard_rate + hazard_increase) * ramp_multiplier;
        for idx in 0..self.failure_types.len() {
            if self.failure_types[idx].consumes_in(running) && consumption > self.status.lifetimes[idx] {
                self.fail(ctx, idx);
                return true;
            }
        }
        false
    }

    /// Consumes life for `elapsed` hours of operation in `mode`.
    ///
    /// The step's start penalty is added to the hazard rate permanently.
    /// In read-only replay, lives that would go negative stop at zero.
    ///
    /// # Panics
    ///
    /// Panics if the component is down, or if a life would go negative
    /// outside replay; both mean a failure test was skipped.
    pub fn operate(
        &mut self,
        ctx: &EventContext<'_>,
        elapsed: f64,
        ramp_multiplier: f64,
        hazard_increase: f64,
        mode: OperatingMode,
        read_only: bool,
    ) {
        assert!(
            self.is_operational(),
            "scenario {}, step {}: cannot operate {} with {:.3}h downtime remaining",
            ctx.scenario,
            ctx.time,
            self.spec.name,
            self.status.downtime_remaining
        );
        if mode == OperatingMode::Off {
            return;
        }
        self.status.hazard_rate += hazard_increase;
        let running = mode.running_submode();
        let consumption = elapsed * self.status.hazard_rate * ramp_multiplier;
        for (idx, ft) in self.failure_types.iter().enumerate() {
            if !ft.consumes_in(running) {
                continue;
            }
            let left = self.status.lifetimes[idx] - consumption;
            if left < 0.0 {
                assert!(
                    read_only,
                    "scenario {}, step {}: life of {} / {} would go negative ({left})",
                    ctx.scenario, ctx.time, self.spec.name, ft.id
                );
                self.status.lifetimes[idx] = 0.0;
            } else {
                self.status.lifetimes[idx] = left;
            }
        }
        if running.is_online() {
            self.status.age += elapsed;
        }
    }

    /// Takes the component down for failure type `fail_idx` and logs it.
    pub fn fail(&mut self, ctx: &mut EventContext<'_>, fail_idx: usize) {
        let downtime = self.repair.sample_duration(&mut ctx.rng.repair) + self.spec.cooldown;
        let new_life = self.failure_types[fail_idx].draw(&mut ctx.rng.life);
        self.status.downtime_remaining = downtime;
        self.status.repair_event_time = downtime;
        self.status.lifetimes[fail_idx] = new_life;
        self.status.hazard_rate = 1.0;

        debug!(
            scenario = ctx.scenario,
            t = ctx.time,
            component = %self.spec.name,
            failure = %self.failure_types[fail_idx].id,
            downtime,
            "component failed"
        );
        ctx.log.push(FailureEvent {
            scenario: ctx.scenario,
            time: ctx.time,
            component: self.spec.name.clone(),
            kind: EventKind::Failure,
            failure_index: Some(fail_idx),
            downtime,
            labor_hours: (downtime - self.spec.cooldown).max(0.0),
            new_life,
        });
    }

    /// Applies a failure recorded in an earlier run, without drawing.
    pub fn read_failure(&mut self, fail_idx: usize, downtime: f64, new_life: f64) {
        self.status.downtime_remaining = downtime.max(0.0);
        self.status.repair_event_time = self.status.downtime_remaining;
        if let Some(life) = self.status.lifetimes.get_mut(fail_idx) {
            *life = new_life;
        }
        self.status.hazard_rate = 1.0;
    }

    /// Consumes repair time if the policy allows it in `mode`.
    ///
    /// # Returns
    ///
    /// `true` if the component came back into service this call.
    pub fn advance_downtime(&mut self, elapsed: f64, mode: OperatingMode) -> bool {
        if self.is_operational() || !self.spec.policy.allows(mode) {
            return false;
        }
        self.status.downtime_remaining -= elapsed;
        if self.status.downtime_remaining <= 0.0 {
            self.status.downtime_remaining = 0.0;
            return true;
        }
        false
    }

    /// Whether repair would progress in `mode`.
    pub fn can_be_repaired(&self, mode: OperatingMode) -> bool {
        self.spec.policy.allows(mode)
    }

    /// Restores a partially repaired unit's downtime to the full drawn value.
    pub fn rearm_repair(&mut self) {
        if !self.is_operational() {
            self.status.downtime_remaining = self.status.repair_event_time;
        }
    }

    /// Holds the component down for at least `duration` hours.
    pub fn shutdown(&mut self, duration: f64) {
        let downtime = self.status.downtime_remaining.max(duration);
        self.status.downtime_remaining = downtime;
        self.status.repair_event_time = downtime;
    }

    /// Planned maintenance: shutdown plus restoring age and hazard rate.
    pub fn perform_maintenance(&mut self, duration: f64) {
        self.shutdown(duration);
        self.status.hazard_rate = 1.0;
        self.status.age = 0.0;
    }
}
