//! Closed family of variate distributions used for lifetimes, repair times,
//! start penalties and on-start failure probabilities.

use std::f64::consts::E;

use serde::{Deserialize, Serialize};

use super::well512::Well512;
use crate::error::{SetupError, SetupResult};

/// Four-parameter bounded Johnson (S_B) distribution.
///
/// Support is `[xi, xi + lambda]`. Sampled by inverting the standard normal
/// CDF and applying the logistic transform, which lets several correlated
/// variates share a single percentile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JohnsonSb {
    pub gamma: f64,
    pub delta: f64,
    pub xi: f64,
    pub lambda: f64,
}

impl JohnsonSb {
    pub const fn new(gamma: f64, delta: f64, xi: f64, lambda: f64) -> Self {
        Self {
            gamma,
            delta,
            xi,
            lambda,
        }
    }

    /// Value at percentile `u` in `[0, 1)`.
    pub fn inverse_cdf(&self, u: f64) -> f64 {
        let z = normal_inverse_cdf(u);
        self.xi + self.lambda / (1.0 + (-(z - self.gamma) / self.delta).exp())
    }
}

/// A probability distribution bound to a failure mode, a repair process or a
/// start penalty.
///
/// `Beta` is the only probability-valued ("binary") family; the rest produce
/// durations in hours of weighted operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Distribution {
    Exponential { scale: f64 },
    Gamma { shape: f64, scale: f64 },
    BoundedJohnson(JohnsonSb),
    Beta { shape1: f64, shape2: f64 },
}

impl Distribution {
    /// Checks that every parameter is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::InvalidDistribution`] describing the first bad
    /// parameter.
    pub fn validate(&self) -> SetupResult<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(SetupError::InvalidDistribution(format!(
                    "{name} must be finite and > 0, got {v}"
                )))
            }
        };
        match *self {
            Self::Exponential { scale } => positive("exponential scale", scale),
            Self::Gamma { shape, scale } => {
                positive("gamma shape", shape)?;
                positive("gamma scale", scale)
            }
            Self::BoundedJohnson(sb) => {
                positive("johnson delta", sb.delta)?;
                positive("johnson lambda", sb.lambda)?;
                if sb.gamma.is_finite() && sb.xi.is_finite() {
                    Ok(())
                } else {
                    Err(SetupError::InvalidDistribution(
                        "johnson gamma and xi must be finite".into(),
                    ))
                }
            }
            Self::Beta { shape1, shape2 } => {
                positive("beta shape1", shape1)?;
                positive("beta shape2", shape2)
            }
        }
    }

    /// `true` when the variate is a probability rather than a duration.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Beta { .. })
    }

    /// Draws one variate.
    pub fn sample(&self, rng: &mut Well512) -> f64 {
        match *self {
            Self::Exponential { scale } => -scale * (1.0 - rng.next_uniform()).ln(),
            Self::Gamma { shape, scale } => gamma_variate(shape, scale, rng),
            Self::BoundedJohnson(sb) => sb.inverse_cdf(rng.next_uniform()),
            Self::Beta { shape1, shape2 } => {
                let x = gamma_variate(shape1, 1.0, rng);
                let y = gamma_variate(shape2, 1.0, rng);
                if x + y > 0.0 { x / (x + y) } else { 0.0 }
            }
        }
    }

    /// Draws a duration.
    ///
    /// # Panics
    ///
    /// Panics if the distribution is binary.
    pub fn sample_duration(&self, rng: &mut Well512) -> f64 {
        assert!(
            !self.is_binary(),
            "requested a duration from binary distribution {self:?}"
        );
        self.sample(rng)
    }

    /// Draws a probability.
    ///
    /// # Panics
    ///
    /// Panics if the distribution is duration-valued.
    pub fn sample_probability(&self, rng: &mut Well512) -> f64 {
        assert!(
            self.is_binary(),
            "requested a probability from duration distribution {self:?}"
        );
        self.sample(rng)
    }

    /// Analytic mean, where one exists in closed form.
    pub fn mean(&self) -> Option<f64> {
        match *self {
            Self::Exponential { scale } => Some(scale),
            Self::Gamma { shape, scale } => Some(shape * scale),
            Self::Beta { shape1, shape2 } => Some(shape1 / (shape1 + shape2)),
            Self::BoundedJohnson(_) => None,
        }
    }
}

/// Gamma variate by Fishman's rejection schemes.
///
/// Shape below one uses the Ahrens-Dieter GS algorithm; above one the
/// Cheng-Feast ratio-of-uniforms GKM1 (shape < 2.5) or GKM2 (shape >= 2.5).
fn gamma_variate(shape: f64, scale: f64, rng: &mut Well512) -> f64 {
    if shape == 1.0 {
        return -scale * (1.0 - rng.next_uniform()).ln();
    }

    if shape < 1.0 {
        let b = (E + shape) / E;
        loop {
            let p = b * rng.next_open_uniform();
            let u = rng.next_uniform();
            if p <= 1.0 {
                let x = p.powf(1.0 / shape);
                if u <= (-x).exp() {
                    return scale * x;
                }
            } else {
                let x = -((b - p) / shape).ln();
                if u <= x.powf(shape - 1.0) {
                    return scale * x;
                }
            }
        }
    }

    let a = shape - 1.0;
    let b = (shape - 1.0 / (6.0 * shape)) / a;
    let m = 2.0 / a;
    let d = m + 2.0;
    let root = shape.sqrt();
    loop {
        let (x, y) = if shape < 2.5 {
            (rng.next_open_uniform(), rng.next_open_uniform())
        } else {
            loop {
                let x = rng.next_uniform();
                let y = rng.next_open_uniform();
                let xp = y + (1.0 - 1.857_764 * x) / root;
                if xp > 0.0 && xp < 1.0 {
                    break (xp, y);
                }
            }
        };
        let v = b * y / x;
        if m * x - d + v + 1.0 / v <= 0.0 || m * x.ln() - v.ln() + v - 1.0 <= 0.0 {
            return scale * a * v;
        }
    }
}

/// Standard normal quantile by Acklam's rational approximation
/// (relative error below 1.2e-9).
pub fn normal_inverse_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    let p = p.clamp(1e-16, 1.0 - 1e-16);
    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mean(dist: Distribution, n: usize, seed: u32) -> f64 {
        let mut rng = Well512::new(seed);
        (0..n).map(|_| dist.sample(&mut rng)).sum::<f64>() / n as f64
    }

    #[test]
    fn exponential_mean_matches_scale() {
        let mean = sample_mean(Distribution::Exponential { scale: 15.55 }, 40_000, 1);
        assert!((mean / 15.55 - 1.0).abs() < 0.03, "mean = {mean}");
    }

    #[test]
    fn gamma_means_match_shape_times_scale() {
        for (i, shape) in [0.3, 0.5, 1.0, 1.5, 2.5, 4.0].into_iter().enumerate() {
            let dist = Distribution::Gamma { shape, scale: 10.0 };
            let mean = sample_mean(dist, 40_000, 100 + i as u32);
            let expected = shape * 10.0;
            assert!(
                (mean / expected - 1.0).abs() < 0.05,
                "shape {shape}: mean {mean}, expected {expected}"
            );
        }
    }

    #[test]
    fn gamma_variates_are_non_negative() {
        let mut rng = Well512::new(9);
        for shape in [0.3, 0.9, 1.0, 1.7, 6.0] {
            for _ in 0..2_000 {
                assert!(gamma_variate(shape, 3.0, &mut rng) >= 0.0);
            }
        }
    }

    #[test]
    fn beta_mean_matches_ratio() {
        let dist = Distribution::Beta {
            shape1: 0.9,
            shape2: 599.0,
        };
        let mean = sample_mean(dist, 20_000, 4);
        let expected = 0.9 / 599.9;
        assert!((mean / expected - 1.0).abs() < 0.1, "mean = {mean}");
    }

    #[test]
    fn beta_is_binary_others_are_not() {
        assert!(
            Distribution::Beta {
                shape1: 1.0,
                shape2: 2.0
            }
            .is_binary()
        );
        assert!(!Distribution::Exponential { scale: 1.0 }.is_binary());
        assert!(
            !Distribution::Gamma {
                shape: 1.0,
                scale: 1.0
            }
            .is_binary()
        );
        assert!(!Distribution::BoundedJohnson(JohnsonSb::new(0.0, 1.0, 0.0, 1.0)).is_binary());
    }

    #[test]
    #[should_panic(expected = "binary distribution")]
    fn duration_from_binary_panics() {
        let mut rng = Well512::new(1);
        Distribution::Beta {
            shape1: 1.0,
            shape2: 1.0,
        }
        .sample_duration(&mut rng);
    }

    #[test]
    #[should_panic(expected = "duration distribution")]
    fn probability_from_duration_panics() {
        let mut rng = Well512::new(1);
        Distribution::Exponential { scale: 1.0 }.sample_probability(&mut rng);
    }

    #[test]
    fn normal_quantiles() {
        assert!(normal_inverse_cdf(0.5).abs() < 1e-9);
        assert!((normal_inverse_cdf(0.975) - 1.959_963_985).abs() < 1e-6);
        assert!((normal_inverse_cdf(0.01) + 2.326_347_874).abs() < 1e-6);
        for p in [0.001, 0.2, 0.4] {
            assert!((normal_inverse_cdf(p) + normal_inverse_cdf(1.0 - p)).abs() < 1e-8);
        }
        assert!(normal_inverse_cdf(0.0).is_finite());
    }

    #[test]
    fn johnson_stays_within_bounds_and_is_monotone() {
        let sb = JohnsonSb::new(0.995_066, 0.252_898, 4.139e-5, 4.489e-4);
        let mut last = f64::NEG_INFINITY;
        for i in 0..=100 {
            let u = i as f64 / 100.0;
            let x = sb.inverse_cdf(u);
            assert!(x >= sb.xi && x <= sb.xi + sb.lambda);
            assert!(x >= last);
            last = x;
        }
    }

    #[test]
    fn validate_rejects_non_positive_parameters() {
        assert!(Distribution::Exponential { scale: 0.0 }.validate().is_err());
        assert!(
            Distribution::Gamma {
                shape: -1.0,
                scale: 1.0
            }
            .validate()
            .is_err()
        );
        assert!(
            Distribution::Beta {
                shape1: 1.0,
                shape2: f64::NAN
            }
            .validate()
            .is_err()
        );
        assert!(
            Distribution::Gamma {
                shape: 0.3,
                scale: 7.5e7
            }
            .validate()
            .is_ok()
        );
    }

    #[test]
    fn deserializes_from_tagged_toml() {
        let d: Result<Distribution, _> = toml::from_str("type = \"gamma\"\nshape = 1.5\nscale = 3750.0");
        assert_eq!(
            d.ok(),
            Some(Distribution::Gamma {
                shape: 1.5,
                scale: 3750.0
            })
        );
        let j: Result<Distribution, _> =
            toml::from_str("type = \"bounded_johnson\"\ngamma = 1.0\ndelta = 0.5\nxi = 0.0\nlambda = 2.0");
        assert!(matches!(j.ok(), Some(Distribution::BoundedJohnson(_))));
    }
}
