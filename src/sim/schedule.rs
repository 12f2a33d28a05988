//! Dispatch schedules consumed by the plant loop.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::error::{SetupError, SetupResult};

/// Thermal input per unit of cycle output, used to fill the pass-through
/// thermal series of synthetic schedules.
const NOMINAL_CYCLE_EFFICIENCY: f64 = 0.41;

/// Per-step commands and conditions from the dispatch optimizer.
///
/// Read-only during a run; every scenario shares one schedule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatchSchedule {
    /// Commanded cycle output (kW).
    pub cycle_power: Vec<f64>,
    /// Thermal power delivered to the cycle (kW). Carried through, not used
    /// for capacity.
    pub thermal_power: Vec<f64>,
    pub standby: Vec<bool>,
    /// Ambient dry-bulb temperature (°C).
    pub ambient_temperature: Vec<f64>,
}

impl DispatchSchedule {
    /// Builds a schedule from equal-length series.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DispatchLength`] if any series differs in length
    /// from `cycle_power`.
    pub fn new(
        cycle_power: Vec<f64>,
        thermal_power: Vec<f64>,
        standby: Vec<bool>,
        ambient_temperature: Vec<f64>,
    ) -> SetupResult<Self> {
        let expected = cycle_power.len();
        let lengths = [
            ("thermal_power", thermal_power.len()),
            ("standby", standby.len()),
            ("ambient_temperature", ambient_temperature.len()),
        ];
        for (series, found) in lengths {
            if found != expected {
                return Err(SetupError::DispatchLength {
                    series,
                    expected,
                    found,
                });
            }
        }
        Ok(Self {
            cycle_power,
            thermal_power,
            standby,
            ambient_temperature,
        })
    }

    /// Constant output at `power_kw` and fixed ambient temperature.
    pub fn constant(steps: usize, power_kw: f64, ambient_c: f64) -> Self {
        Self {
            cycle_power: vec![power_kw; steps],
            thermal_power: vec![power_kw / NOMINAL_CYCLE_EFFICIENCY; steps],
            standby: vec![false; steps],
            ambient_temperature: vec![ambient_c; steps],
        }
    }

    pub fn len(&self) -> usize {
        self.cycle_power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycle_power.is_empty()
    }

    /// Checks that the schedule covers `horizon` steps.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DispatchLength`] if it is shorter.
    pub fn covers(&self, horizon: usize) -> SetupResult<()> {
        if self.len() < horizon {
            return Err(SetupError::DispatchLength {
                series: "cycle_power",
                expected: horizon,
                found: self.len(),
            });
        }
        Ok(())
    }

    /// Repeats (or truncates) every series to exactly `horizon` steps, e.g.
    /// to run a representative day for a full week.
    pub fn tiled(&self, horizon: usize) -> Self {
        Self {
            cycle_power: repeat_to_horizon(&self.cycle_power, horizon),
            thermal_power: repeat_to_horizon(&self.thermal_power, horizon),
            standby: repeat_to_horizon(&self.standby, horizon),
            ambient_temperature: repeat_to_horizon(&self.ambient_temperature, horizon),
        }
    }

    /// Synthetic daily cycling schedule.
    ///
    /// # Arguments
    ///
    /// * `profile` - Daily operating window and ambient model
    /// * `nameplate_kw` - Cycle rating; commanded output is a fraction of it
    /// * `steps` - Number of steps to generate
    /// * `steplength` - Step length (h)
    /// * `seed` - Seed for ambient temperature noise
    pub fn daily(
        profile: &DailyProfile,
        nameplate_kw: f64,
        steps: usize,
        steplength: f64,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut schedule = Self {
            cycle_power: Vec::with_capacity(steps),
            thermal_power: Vec::with_capacity(steps),
            standby: Vec::with_capacity(steps),
            ambient_temperature: Vec::with_capacity(steps),
        };
        for t in 0..steps {
            let hour = (t as f64 * steplength) % 24.0;
            let online = profile.is_online(hour);
            let power = if online {
                profile.power_fraction * nameplate_kw
            } else {
                0.0
            };
            let standby = !online && profile.is_standby(hour);
            let ambient = profile.ambient_mean_c
                + profile.ambient_swing_c * (2.0 * PI * (hour - 9.0) / 24.0).sin()
                + gaussian_noise(&mut rng, profile.ambient_noise_std_c);

            schedule.cycle_power.push(power);
            schedule.thermal_power.push(power / NOMINAL_CYCLE_EFFICIENCY);
            schedule.standby.push(standby);
            schedule.ambient_temperature.push(ambient);
        }
        schedule
    }
}

/// Daily operating pattern for synthetic schedules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DailyProfile {
    /// Commanded output while online, as a fraction of nameplate.
    pub power_fraction: f64,
    /// Hour of day the cycle comes online (inclusive).
    pub online_start_hour: f64,
    /// Hour of day the cycle goes offline (exclusive). Equal to the start
    /// hour means always online.
    pub online_end_hour: f64,
    /// Standby hours immediately before each online window.
    pub standby_hours: f64,
    pub ambient_mean_c: f64,
    /// Half peak-to-peak daily temperature swing, peaking mid-afternoon.
    pub ambient_swing_c: f64,
    pub ambient_noise_std_c: f64,
}

impl Default for DailyProfile {
    fn default() -> Self {
        Self {
            power_fraction: 1.0,
            online_start_hour: 8.0,
            online_end_hour: 20.0,
            standby_hours: 1.0,
            ambient_mean_c: 18.0,
            ambient_swing_c: 6.0,
            ambient_noise_std_c: 1.0,
        }
    }
}

impl DailyProfile {
    /// Always online at `power_fraction`.
    pub fn baseload(power_fraction: f64, ambient_mean_c: f64) -> Self {
        Self {
            power_fraction,
            online_start_hour: 0.0,
            online_end_hour: 0.0,
            standby_hours: 0.0,
            ambient_mean_c,
            ambient_swing_c: 0.0,
            ambient_noise_std_c: 0.0,
        }
    }

    fn is_online(&self, hour: f64) -> bool {
        in_window(hour, self.online_start_hour, self.online_end_hour)
    }

    fn is_standby(&self, hour: f64) -> bool {
        if self.standby_hours <= 0.0 {
            return false;
        }
        let start = (self.online_start_hour - self.standby_hours).rem_euclid(24.0);
        in_window(hour, start, self.online_start_hour)
    }
}

/// Whether `hour` lies in `[start, end)` on a 24 h clock, wrapping midnight.
fn in_window(hour: f64, start: f64, end: f64) -> bool {
    if start == end {
        true
    } else if start < end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Repeats or truncates `baseline` to exactly `horizon` values.
pub fn repeat_to_horizon<T: Copy + Default>(baseline: &[T], horizon: usize) -> Vec<T> {
    if baseline.is_empty() {
        return vec![T::default(); horizon];
    }
    baseline.iter().copied().cycle().take(horizon).collect()
}

/// Zero-mean Gaussian noise by the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos() * std_dev
}
