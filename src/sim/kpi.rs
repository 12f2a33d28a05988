//! Cross-scenario aggregation of scenario results.

use std::fmt;

use super::orchestrator::ScenarioResult;

/// Averages over all completed scenarios.
///
/// Per-step series are averaged across scenarios step by step; scalar
/// figures are plain means over scenarios.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub scenarios: usize,
    /// Mean capacity fraction per step.
    pub avg_capacity: Vec<f64>,
    /// Mean efficiency fraction per step.
    pub avg_efficiency: Vec<f64>,
    pub avg_labor_cost: f64,
    /// Mean end-of-run turbine capacity.
    pub turbine_capacity: f64,
    pub turbine_efficiency: f64,
    /// Mean number of component failures per scenario.
    pub avg_failures: f64,
    /// Scenarios that were rolled back at their first failure.
    pub rolled_back: usize,
}

impl Summary {
    /// Aggregates `results`. An empty input gives an all-zero summary with
    /// full turbine capacity.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ScenarioResult>) -> Self {
        let mut n = 0_usize;
        let mut cap_sum: Vec<f64> = Vec::new();
        let mut eff_sum: Vec<f64> = Vec::new();
        let mut labor = 0.0;
        let mut turb_cap = 0.0;
        let mut turb_eff = 0.0;
        let mut failures = 0_usize;
        let mut rolled_back = 0_usize;

        for r in results {
            n += 1;
            if cap_sum.len() < r.records.len() {
                cap_sum.resize(r.records.len(), 0.0);
                eff_sum.resize(r.records.len(), 0.0);
            }
            for (i, step) in r.records.iter().enumerate() {
                cap_sum[i] += step.capacity;
                eff_sum[i] += step.efficiency;
            }
            labor += r.labor_cost;
            turb_cap += r.turbine_capacity;
            turb_eff += r.turbine_efficiency;
            failures += r.failure_count();
            if r.pending_failure {
                rolled_back += 1;
            }
        }

        if n == 0 {
            return Self {
                scenarios: 0,
                avg_capacity: Vec::new(),
                avg_efficiency: Vec::new(),
                avg_labor_cost: 0.0,
                turbine_capacity: 1.0,
                turbine_efficiency: 1.0,
                avg_failures: 0.0,
                rolled_back: 0,
            };
        }

        let nf = n as f64;
        Self {
            scenarios: n,
            avg_capacity: cap_sum.into_iter().map(|s| s / nf).collect(),
            avg_efficiency: eff_sum.into_iter().map(|s| s / nf).collect(),
            avg_labor_cost: labor / nf,
            turbine_capacity: turb_cap / nf,
            turbine_efficiency: turb_eff / nf,
            avg_failures: failures as f64 / nf,
            rolled_back,
        }
    }

    /// Time-averaged capacity over the horizon.
    pub fn mean_capacity(&self) -> f64 {
        mean(&self.avg_capacity)
    }

    /// Time-averaged efficiency over the horizon.
    pub fn mean_efficiency(&self) -> f64 {
        mean(&self.avg_efficiency)
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Availability Report ---")?;
        writeln!(f, "Scenarios:             {}", self.scenarios)?;
        writeln!(f, "Average capacity:      {:.4}", self.mean_capacity())?;
        writeln!(f, "Average efficiency:    {:.4}", self.mean_efficiency())?;
        writeln!(f, "Average labor cost:    {:.2}", self.avg_labor_cost)?;
        writeln!(f, "Average failures:      {:.2}", self.avg_failures)?;
        writeln!(
            f,
            "Turbine capacity:      {:.4} (efficiency {:.4})",
            self.turbine_capacity, self.turbine_efficiency
        )?;
        write!(f, "Rolled back:           {}", self.rolled_back)
    }
}
