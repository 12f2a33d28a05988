//! Standard power-block equipment with default ratings and failure modes,
//! plus the plain-text component record parser.

use serde::Deserialize;

use super::component::{Component, ComponentKind, ComponentSpec, RepairPolicy};
use super::failure::{FailureMode, OperatingMode};
use crate::error::{SetupError, SetupResult};
use crate::random::Distribution;

/// Repair cost charged per repair event, all default equipment.
pub const DEFAULT_REPAIR_COST: f64 = 7.777;

/// Leak modes shared by heat exchangers and water pumps: (id, shape, scale).
const LEAKS: [(&str, f64, f64); 4] = [
    ("Large shell leak", 0.3, 75e6),
    ("Large tube leak", 0.3, 1e7),
    ("Small shell leak", 0.5, 1e7),
    ("Small tube leak", 0.3, 1.2e6),
];

const HEAT_EXCHANGERS: [&str; 4] = ["Boiler", "Economizer", "Reheater", "Superheater"];

/// Equipment counts of a power block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Topology {
    pub condenser_trains: usize,
    pub fans_per_train: usize,
    pub radiators_per_train: usize,
    pub salt_steam_trains: usize,
    pub feedwater_heaters: usize,
    pub salt_pumps: usize,
    pub water_pumps: usize,
    pub turbines: usize,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            condenser_trains: 2,
            fans_per_train: 30,
            radiators_per_train: 1,
            salt_steam_trains: 2,
            feedwater_heaters: 6,
            salt_pumps: 2,
            water_pumps: 2,
            turbines: 1,
        }
    }
}

fn gamma(shape: f64, scale: f64) -> Distribution {
    Distribution::Gamma { shape, scale }
}

fn spec(
    name: String,
    kind: ComponentKind,
    mean_repair_time: f64,
    cooldown: f64,
    capacity_weight: f64,
    policy: RepairPolicy,
) -> ComponentSpec {
    ComponentSpec {
        name,
        kind,
        mean_repair_time,
        cooldown,
        capacity_weight,
        efficiency_weight: 0.0,
        repair_cost: DEFAULT_REPAIR_COST,
        policy,
    }
}

/// Builds condenser train `k` (1-based): its fans followed by the train.
///
/// # Errors
///
/// Propagates [`SetupError`] from component construction.
pub fn condenser_train(k: usize, fans: usize, radiators: usize) -> SetupResult<Vec<Component>> {
    let mut out = Vec::with_capacity(fans + 1);
    for i in 1..=fans {
        let mut fan = Component::new(spec(
            format!("C{k}-F{i}"),
            ComponentKind::CondenserFan,
            35.5,
            0.0,
            0.01,
            RepairPolicy::Standby,
        ))?;
        fan.add_failure_type("Fan failure", FailureMode::Online, gamma(1.0, 841_188.0))?;
        out.push(fan);
    }
    let mut train = Component::new(spec(
        format!("C{k}-T"),
        ComponentKind::CondenserTrain,
        15.55,
        0.0,
        0.0,
        RepairPolicy::Standby,
    ))?;
    for i in 1..=radiators {
        train.add_failure_type(
            &format!("Radiator {i} failure"),
            FailureMode::Online,
            gamma(1.0, 698_976.0),
        )?;
    }
    out.push(train);
    Ok(out)
}

/// Builds salt-to-steam train `n` with parallel weight `weight`.
///
/// # Errors
///
/// Propagates [`SetupError`] from component construction.
pub fn salt_to_steam_train(n: usize, weight: f64) -> SetupResult<Component> {
    let mut c = Component::new(spec(
        format!("SST{n}"),
        ComponentKind::SaltToSteamTrain,
        2.14,
        72.0,
        weight,
        RepairPolicy::Anytime,
    ))?;
    for hx in HEAT_EXCHANGERS {
        for (leak, shape, scale) in LEAKS {
            c.add_failure_type(&format!("{hx} {}", leak.to_lowercase()), FailureMode::All, gamma(shape, scale))?;
        }
    }
    Ok(c)
}

/// Builds feedwater heater `n`.
///
/// # Errors
///
/// Propagates [`SetupError`] from component construction.
pub fn feedwater_heater(n: usize) -> SetupResult<Component> {
    let mut c = Component::new(spec(
        format!("FWH{n}"),
        ComponentKind::FeedwaterHeater,
        2.14,
        48.0,
        0.05,
        RepairPolicy::Anytime,
    ))?;
    for (leak, shape, scale) in LEAKS {
        c.add_failure_type(leak, FailureMode::Online, gamma(shape, scale))?;
    }
    Ok(c)
}

/// Builds molten salt pump `n`.
///
/// # Errors
///
/// Propagates [`SetupError`] from component construction.
pub fn salt_pump(n: usize) -> SetupResult<Component> {
    let mut c = Component::new(spec(
        format!("SP{n}"),
        ComponentKind::SaltPump,
        0.5,
        0.0,
        1.0,
        RepairPolicy::Downtime,
    ))?;
    c.add_failure_type("External leak large", FailureMode::All, gamma(0.3, 3.75e7))?;
    c.add_failure_type("External leak small", FailureMode::All, gamma(1.0, 8.33e6))?;
    c.add_failure_type(
        "Fail to run first hour",
        FailureMode::Exact(OperatingMode::OnlineFirst),
        gamma(1.5, 3750.0),
    )?;
    c.add_failure_type(
        "Fail to run ongoing",
        FailureMode::Exact(OperatingMode::OnlineOngoing),
        gamma(0.5, 83_300.0),
    )?;
    c.add_failure_type(
        "Fail to start",
        FailureMode::Exact(OperatingMode::OnlineStart),
        Distribution::Beta {
            shape1: 0.9,
            shape2: 599.0,
        },
    )?;
    Ok(c)
}

/// Builds water pump `n`.
///
/// # Errors
///
/// Propagates [`SetupError`] from component construction.
pub fn water_pump(n: usize) -> SetupResult<Component> {
    let mut c = Component::new(spec(
        format!("WP{n}"),
        ComponentKind::WaterPump,
        0.5,
        0.0,
        1.0,
        RepairPolicy::Downtime,
    ))?;
    for (leak, shape, scale) in LEAKS {
        c.add_failure_type(leak, FailureMode::Online, gamma(shape, scale))?;
    }
    Ok(c)
}

/// Builds turbine `n` with parallel capacity and efficiency weight `weight`.
///
/// # Errors
///
/// Propagates [`SetupError`] from component construction.
pub fn turbine(n: usize, weight: f64) -> SetupResult<Component> {
    let mut s = spec(
        format!("T{n}"),
        ComponentKind::Turbine,
        32.7,
        72.0,
        weight,
        RepairPolicy::Downtime,
    );
    s.efficiency_weight = weight;
    let mut c = Component::new(s)?;
    c.add_failure_type("MBTF", FailureMode::Online, gamma(1.0, 51_834.319_53))?;
    Ok(c)
}

/// Builds every component of `topology` with default ratings.
///
/// Parallel salt-to-steam trains and turbines each get weight `1/N`.
///
/// # Errors
///
/// Propagates [`SetupError`] from component construction.
pub fn build_components(topology: &Topology) -> SetupResult<Vec<Component>> {
    let mut out = Vec::new();
    for k in 1..=topology.condenser_trains {
        out.extend(condenser_train(
            k,
            topology.fans_per_train,
            topology.radiators_per_train,
        )?);
    }
    let sst_weight = 1.0 / topology.salt_steam_trains.max(1) as f64;
    for n in 1..=topology.salt_steam_trains {
        out.push(salt_to_steam_train(n, sst_weight)?);
    }
    for n in 1..=topology.feedwater_heaters {
        out.push(feedwater_heater(n)?);
    }
    for n in 1..=topology.salt_pumps {
        out.push(salt_pump(n)?);
    }
    for n in 1..=topology.water_pumps {
        out.push(water_pump(n)?);
    }
    let turbine_weight = 1.0 / topology.turbines.max(1) as f64;
    for n in 1..=topology.turbines {
        out.push(turbine(n, turbine_weight)?);
    }
    Ok(out)
}

/// Parses component records of the form
/// `name,type,mean_repair_time,cooldown,capacity_weight,repair_cost,policy`.
///
/// Records are separated by `;` or newlines; blank records are skipped.
///
/// # Errors
///
/// Returns [`SetupError::MalformedRecord`] for a record with the wrong number
/// of fields or an unparseable number, and the matching error for an unknown
/// type or policy.
pub fn parse_component_table(text: &str) -> SetupResult<Vec<ComponentSpec>> {
    let mut specs = Vec::new();
    let records = text
        .split([';', '\n'])
        .map(str::trim)
        .filter(|r| !r.is_empty());
    for (index, record) in records.enumerate() {
        let fields: Vec<&str> = record.split(',').map(str::trim).collect();
        if fields.len() != 7 {
            return Err(SetupError::MalformedRecord {
                index,
                reason: format!("expected 7 fields, found {}", fields.len()),
            });
        }
        let number = |i: usize, what: &str| {
            fields[i]
                .parse::<f64>()
                .map_err(|_| SetupError::MalformedRecord {
                    index,
                    reason: format!("{what} \"{}\" is not a number", fields[i]),
                })
        };
        let kind: ComponentKind = fields[1].parse()?;
        let capacity_weight = number(4, "capacity_weight")?;
        specs.push(ComponentSpec {
            name: fields[0].to_string(),
            kind,
            mean_repair_time: number(2, "mean_repair_time")?,
            cooldown: number(3, "cooldown")?,
            capacity_weight,
            efficiency_weight: if kind == ComponentKind::Turbine {
                capacity_weight
            } else {
                0.0
            },
            repair_cost: number(5, "repair_cost")?,
            policy: fields[6].parse()?,
        });
    }
    Ok(specs)
}
