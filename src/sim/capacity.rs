//! Plant capacity and efficiency from component availability.
//!
//! Turbines and salt-to-steam trains are parallel-redundant: each operational
//! unit contributes its weight. Condenser efficiency comes from a cold/hot
//! table indexed by the number of operational trains, less a fixed loss per
//! failed fan. Every other failed component subtracts its weight from a
//! shared remaining-efficiency pool.

use serde::{Deserialize, Serialize};

use crate::components::{Component, ComponentKind};
use crate::error::{SetupError, SetupResult};

/// Condenser efficiency by number of operational trains (index 0 = none up).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondenserTables {
    cold: Vec<f64>,
    hot: Vec<f64>,
    /// Ambient temperature (°C) at and above which the hot table applies.
    temp_threshold: f64,
}

impl CondenserTables {
    /// # Errors
    ///
    /// Returns [`SetupError::CondenserTable`] unless both tables hold
    /// `trains + 1` entries.
    pub fn new(cold: Vec<f64>, hot: Vec<f64>, temp_threshold: f64, trains: usize) -> SetupResult<Self> {
        let tables = Self {
            cold,
            hot,
            temp_threshold,
        };
        tables.check_trains(trains)?;
        Ok(tables)
    }

    /// Linear tables: `k` trains up gives `k / trains`.
    pub fn proportional(trains: usize, temp_threshold: f64) -> Self {
        let table: Vec<f64> = (0..=trains)
            .map(|k| k as f64 / trains.max(1) as f64)
            .collect();
        Self {
            cold: table.clone(),
            hot: table,
            temp_threshold,
        }
    }

    pub fn temp_threshold(&self) -> f64 {
        self.temp_threshold
    }

    /// Number of condenser trains the tables are sized for.
    pub fn trains(&self) -> usize {
        self.cold.len().saturating_sub(1)
    }

    /// Checks that the tables cover exactly `trains` trains.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::CondenserTable`] naming the first table of the
    /// wrong size.
    pub fn check_trains(&self, trains: usize) -> SetupResult<()> {
        let expected = trains + 1;
        for (table, values) in [("cold", &self.cold), ("hot", &self.hot)] {
            if values.len() != expected {
                return Err(SetupError::CondenserTable {
                    table,
                    expected,
                    found: values.len(),
                });
            }
        }
        Ok(())
    }

    /// Table value for `trains_up` operational trains at `ambient_c`.
    ///
    /// # Panics
    ///
    /// Panics if `trains_up` exceeds the train count the tables were sized
    /// for. [`PowerCycle::new`](crate::sim::engine::PowerCycle::new) rejects
    /// such plants.
    pub fn lookup(&self, trains_up: usize, ambient_c: f64) -> f64 {
        let table = if ambient_c < self.temp_threshold {
            &self.cold
        } else {
            &self.hot
        };
        table[trains_up]
    }
}

/// Realized output multipliers for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleCapacity {
    /// Fraction of nameplate the cycle can deliver, in `[0, 1]`.
    pub capacity: f64,
    /// Fraction of design efficiency, in `[0, 1]`.
    pub efficiency: f64,
    pub turbine_capacity: f64,
    pub turbine_efficiency: f64,
    pub trains_online: usize,
}

impl CycleCapacity {
    pub const ZERO: CycleCapacity = CycleCapacity {
        capacity: 0.0,
        efficiency: 0.0,
        turbine_capacity: 0.0,
        turbine_efficiency: 0.0,
        trains_online: 0,
    };
}

#[derive(Default)]
struct Tally {
    installed: usize,
    up: usize,
    capacity: f64,
    efficiency: f64,
}

impl Tally {
    fn add(&mut self, c: &Component, capacity: f64, efficiency: f64) {
        self.installed += 1;
        if c.is_operational() {
            self.up += 1;
            self.capacity += capacity;
            self.efficiency += efficiency;
        }
    }

    /// Parallel term; a class with no installed units does not constrain.
    fn parallel(&self) -> (f64, f64) {
        if self.installed == 0 {
            (1.0, 1.0)
        } else {
            (self.capacity, self.efficiency)
        }
    }

    fn all_down(&self) -> bool {
        self.installed > 0 && self.up == 0
    }
}

/// Aggregates component availability into plant capacity and efficiency.
pub fn aggregate(components: &[Component], tables: &CondenserTables, ambient_c: f64) -> CycleCapacity {
    let mut turbines = Tally::default();
    let mut salt_steam = Tally::default();
    let mut trains = Tally::default();
    let mut heaters = Tally::default();
    let mut fan_loss = 0.0;
    let mut remaining = 1.0;

    for c in components {
        match c.kind() {
            ComponentKind::Turbine => turbines.add(
                c,
                c.capacity_weight() * c.capacity_factor(),
                c.efficiency_weight() * c.efficiency_factor(),
            ),
            ComponentKind::SaltToSteamTrain => salt_steam.add(c, c.capacity_weight(), 0.0),
            ComponentKind::CondenserTrain => trains.add(c, 0.0, 0.0),
            ComponentKind::CondenserFan => {
                if !c.is_operational() {
                    fan_loss += c.capacity_weight();
                }
            }
            kind => {
                if kind == ComponentKind::FeedwaterHeater {
                    heaters.add(c, 0.0, 0.0);
                }
                if !c.is_operational() {
                    remaining -= c.capacity_weight();
                }
            }
        }
    }

    let (turbine_capacity, turbine_efficiency) = turbines.parallel();
    if trains.all_down() || heaters.all_down() {
        return CycleCapacity {
            turbine_capacity,
            turbine_efficiency,
            ..CycleCapacity::ZERO
        };
    }

    let (sst, _) = salt_steam.parallel();
    let condenser = if trains.installed == 0 {
        1.0 - fan_loss
    } else {
        tables.lookup(trains.up, ambient_c) - fan_loss
    };
    let common = condenser.max(0.0) * remaining.max(0.0);
    CycleCapacity {
        capacity: (turbine_capacity.min(sst) * common).clamp(0.0, 1.0),
        efficiency: (turbine_efficiency.min(sst) * common).clamp(0.0, 1.0),
        turbine_capacity,
        turbine_efficiency,
        trains_online: trains.up,
    }
}
