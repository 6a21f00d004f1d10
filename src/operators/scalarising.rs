//! Scalarising functions and distance measures.
//!
//! Selector enums parse from their names with [`std::str::FromStr`]; an
//! unknown name is a configuration error that aborts the run.
//!
//! # Scalarising functions (minimisation)
//!
//! With weights clamped to at least `1e-6`:
//!
//! | Function | Value |
//! |---|---|
//! | `WeightedSum` | `Σ wᵢ·fᵢ` |
//! | `WeightedChebyshev` | `max wᵢ·fᵢ` |
//! | `WeightedChebyshevAugmented` | `max wᵢ·fᵢ + 0.05·Σ wᵢ·fᵢ` |
//! | `WeightedLp` | `(Σ (wᵢ·fᵢ)ᵖ)^(1/p)` |

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigErrorKind;

/// Smallest weight a scalarising function uses.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Coefficient of the sum term in the augmented Chebyshev function.
pub const AUGMENTED_CONSTANT: f64 = 0.05;

/// How an objective vector collapses into one cost.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarisationType {
    #[default]
    WeightedSum,
    WeightedChebyshev,
    WeightedChebyshevAugmented,
    /// Weighted Lp norm with exponent `p`.
    WeightedLp(f64),
}

impl ScalarisationType {
    /// Scalar value of `objectives` under `weights`.
    ///
    /// Only the common prefix of both vectors is used.
    pub fn scalarise(&self, weights: &[f64], objectives: &[f64]) -> f64 {
        let terms = weights
            .iter()
            .zip(objectives)
            .map(|(w, f)| w.max(WEIGHT_EPSILON) * f);
        match *self {
            ScalarisationType::WeightedSum => terms.sum(),
            ScalarisationType::WeightedChebyshev => terms.fold(f64::NEG_INFINITY, f64::max),
            ScalarisationType::WeightedChebyshevAugmented => {
                let (max, sum) = terms.fold((f64::NEG_INFINITY, 0.0), |(m, s), t| (m.max(t), s + t));
                max + AUGMENTED_CONSTANT * sum
            }
            ScalarisationType::WeightedLp(p) => {
                let p = if p > 0.0 { p } else { 1.0 };
                terms.map(|t| t.abs().powf(p)).sum::<f64>().powf(1.0 / p)
            }
        }
    }
}

impl FromStr for ScalarisationType {
    type Err = ConfigErrorKind;

    /// Parses a function name. `WeightedLp` defaults to `p = 2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WeightedSum" => Ok(ScalarisationType::WeightedSum),
            "WeightedChebyshev" => Ok(ScalarisationType::WeightedChebyshev),
            "WeightedChebyshevAugmented" => Ok(ScalarisationType::WeightedChebyshevAugmented),
            "WeightedLp" => Ok(ScalarisationType::WeightedLp(2.0)),
            other => Err(ConfigErrorKind::UnrecognisedScalarisation(other.to_string())),
        }
    }
}

impl fmt::Display for ScalarisationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarisationType::WeightedSum => f.write_str("WeightedSum"),
            ScalarisationType::WeightedChebyshev => f.write_str("WeightedChebyshev"),
            ScalarisationType::WeightedChebyshevAugmented => f.write_str("WeightedChebyshevAugmented"),
            ScalarisationType::WeightedLp(p) => write!(f, "WeightedLp({p})"),
        }
    }
}

/// Distance between two vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceMeasure {
    #[default]
    Euclidean,
    Manhattan,
    /// Angle in radians between the vectors.
    Angle,
}

impl DistanceMeasure {
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            DistanceMeasure::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
            DistanceMeasure::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
            DistanceMeasure::Angle => {
                let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
                let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    return 0.0;
                }
                (dot / (na * nb)).clamp(-1.0, 1.0).acos()
            }
        }
    }
}

impl FromStr for DistanceMeasure {
    type Err = ConfigErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Euclidean" | "EuclideanDistance" => Ok(DistanceMeasure::Euclidean),
            "Manhattan" | "ManhattanDistance" => Ok(DistanceMeasure::Manhattan),
            "Angle" | "AngleDistance" => Ok(DistanceMeasure::Angle),
            other => Err(ConfigErrorKind::UnrecognisedDistance(other.to_string())),
        }
    }
}

/// Generalised-decomposition transform of a weight vector.
///
/// Each weight becomes `1 / (w + 0.01)`, then the vector is normalised to
/// sum to one.
pub fn generalised_decomposition(weights: &[f64]) -> Vec<f64> {
    let inv: Vec<f64> = weights.iter().map(|w| 1.0 / (w + 0.01)).collect();
    let total: f64 = inv.iter().sum();
    if total <= 0.0 {
        return inv;
    }
    inv.into_iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_sum() {
        let v = ScalarisationType::WeightedSum.scalarise(&[0.5, 0.5], &[2.0, 4.0]);
        assert!((v - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_chebyshev_and_augmented() {
        let w = [0.25, 0.75];
        let f = [4.0, 2.0];
        let cheb = ScalarisationType::WeightedChebyshev.scalarise(&w, &f);
        assert!((cheb - 1.5).abs() < 1e-12);
        let aug = ScalarisationType::WeightedChebyshevAugmented.scalarise(&w, &f);
        assert!((aug - (1.5 + 0.05 * 2.5)).abs() < 1e-12);
    }

    #[test]
    fn test_lp_norm() {
        let v = ScalarisationType::WeightedLp(2.0).scalarise(&[1.0, 1.0], &[3.0, 4.0]);
        assert!((v - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weight_is_clamped() {
        let v = ScalarisationType::WeightedSum.scalarise(&[0.0, 1.0], &[1000.0, 1.0]);
        assert!((v - (1.0 + 1000.0 * WEIGHT_EPSILON)).abs() < 1e-9);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("WeightedChebyshev".parse::<ScalarisationType>(), Ok(ScalarisationType::WeightedChebyshev));
        assert_eq!("WeightedLp".parse::<ScalarisationType>(), Ok(ScalarisationType::WeightedLp(2.0)));
        assert_eq!(
            "Nope".parse::<ScalarisationType>(),
            Err(ConfigErrorKind::UnrecognisedScalarisation("Nope".into()))
        );
        assert_eq!("AngleDistance".parse::<DistanceMeasure>(), Ok(DistanceMeasure::Angle));
        assert!("Chebyshev".parse::<DistanceMeasure>().is_err());
    }

    #[test]
    fn test_distances() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert!((DistanceMeasure::Euclidean.distance(&a, &b) - 5.0).abs() < 1e-12);
        assert!((DistanceMeasure::Manhattan.distance(&a, &b) - 7.0).abs() < 1e-12);
        let angle = DistanceMeasure::Angle.distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_generalised_decomposition_normalises() {
        let w = generalised_decomposition(&[0.0, 1.0]);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w[0] > w[1]);
    }
}
