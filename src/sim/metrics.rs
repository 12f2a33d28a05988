//! Named objective metrics over a [`Summary`], for downstream optimizers.

use std::fmt;
use std::str::FromStr;

use super::kpi::Summary;

/// A scalar figure an outer loop can request by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    AverageCapacity,
    AverageEfficiency,
    AverageLaborCost,
    TurbineCapacity,
    TurbineEfficiency,
    AverageFailures,
}

type Evaluator = fn(&Summary) -> f64;

impl Metric {
    pub const ALL: [Metric; 6] = [
        Self::AverageCapacity,
        Self::AverageEfficiency,
        Self::AverageLaborCost,
        Self::TurbineCapacity,
        Self::TurbineEfficiency,
        Self::AverageFailures,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::AverageCapacity => "avg_capacity",
            Self::AverageEfficiency => "avg_efficiency",
            Self::AverageLaborCost => "avg_labor_cost",
            Self::TurbineCapacity => "turbine_capacity",
            Self::TurbineEfficiency => "turbine_efficiency",
            Self::AverageFailures => "avg_failures",
        }
    }

    pub fn evaluator(self) -> Evaluator {
        match self {
            Self::AverageCapacity => Summary::mean_capacity,
            Self::AverageEfficiency => Summary::mean_efficiency,
            Self::AverageLaborCost => |s| s.avg_labor_cost,
            Self::TurbineCapacity => |s| s.turbine_capacity,
            Self::TurbineEfficiency => |s| s.turbine_efficiency,
            Self::AverageFailures => |s| s.avg_failures,
        }
    }

    pub fn evaluate(self, summary: &Summary) -> f64 {
        (self.evaluator())(summary)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized metric name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric \"{0}\" (expected one of: avg_capacity, avg_efficiency, avg_labor_cost, turbine_capacity, turbine_efficiency, avg_failures)")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.name() == key)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}
