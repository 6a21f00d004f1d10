//! Mutation of adopted sets, in place.
//!
//! Both operators adopt the sets tagged `FOR_PERTURBATION` upstream and
//! modify their members directly. A changed solution loses its evaluation
//! and cost.

use rand::Rng;

use super::{require_output, Operator};
use crate::error::{ConfigErrorKind, NodeStatus, PipelineError, PipelineResult};
use crate::model::{Element, ElementKind, ElementSpec, ProblemDefinition, SolutionHandle, Tag};
use crate::pipeline::{NodeContext, OperatorTags};

/// Applies `mutate` to the decision vector of every member of every output
/// set, writing back only changed vectors.
fn perturb_outputs<F>(ctx: &mut NodeContext<'_>, mut mutate: F)
where
    F: FnMut(&mut [Element], &[ElementSpec], &mut rand::rngs::StdRng),
{
    let specs = &ctx.problem().decision;
    let members: Vec<SolutionHandle> = ctx
        .output_sets()
        .into_iter()
        .filter_map(|id| ctx.set(id))
        .flat_map(|s| s.iter().cloned())
        .collect();
    let rng = ctx.rng();
    for h in members {
        let mut s = h.write();
        let mut x = s.decision().to_vec();
        mutate(&mut x, specs, &mut *rng);
        if x.as_slice() != s.decision() {
            s.define_decision(&x);
            s.clear_cost();
        }
    }
}

/// Bounded polynomial mutation on one variable.
pub fn polynomial_step<R: Rng + ?Sized>(y: f64, lower: f64, upper: f64, eta: f64, rng: &mut R) -> f64 {
    let range = upper - lower;
    if range <= 0.0 {
        return y;
    }
    let d1 = (y - lower) / range;
    let d2 = (upper - y) / range;
    let exponent = 1.0 / (eta + 1.0);
    let u: f64 = rng.random();
    let dq = if u < 0.5 {
        let v = 2.0 * u + (1.0 - 2.0 * u) * (1.0 - d1).powf(eta + 1.0);
        v.powf(exponent) - 1.0
    } else {
        let v = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * (1.0 - d2).powf(eta + 1.0);
        1.0 - v.powf(exponent)
    };
    (y + dq * range).clamp(lower, upper)
}

fn check_probability(operator: &str, p: f64) -> PipelineResult<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(PipelineError::config(
            operator,
            ConfigErrorKind::InvalidParameter {
                name: "variable_probability",
                reason: format!("must lie in [0, 1], got {p}"),
            },
        ))
    }
}

// ============================================================================
// PolynomialMutation
// ============================================================================

/// Polynomial mutation of real and integer variables.
#[derive(Debug, Clone)]
pub struct PolynomialMutation {
    distribution_index: f64,
    variable_probability: f64,
}

impl Default for PolynomialMutation {
    fn default() -> Self {
        Self {
            distribution_index: 20.0,
            variable_probability: 0.1,
        }
    }
}

impl PolynomialMutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distribution_index(mut self, eta: f64) -> Self {
        self.distribution_index = eta;
        self
    }

    pub fn with_variable_probability(mut self, p: f64) -> Self {
        self.variable_probability = p;
        self
    }
}

impl Operator for PolynomialMutation {
    fn name(&self) -> &str {
        "PolynomialMutation"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::adopting(&[], &[Tag::FOR_PERTURBATION])
    }

    fn validate(&self, _problem: &ProblemDefinition) -> PipelineResult<()> {
        check_probability(self.name(), self.variable_probability)?;
        if !(self.distribution_index >= 0.0) {
            return Err(PipelineError::config(
                self.name(),
                ConfigErrorKind::InvalidParameter {
                    name: "distribution_index",
                    reason: format!("must be non-negative, got {}", self.distribution_index),
                },
            ));
        }
        Ok(())
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_output(ctx));
        let eta = self.distribution_index;
        let p = self.variable_probability;
        perturb_outputs(ctx, |x, specs, rng| {
            for (e, spec) in x.iter_mut().zip(specs) {
                let numeric = matches!(spec.kind, ElementKind::Real | ElementKind::Integer);
                if !numeric || e.kind() != spec.kind || !rng.random_bool(p) {
                    continue;
                }
                *e = spec.clamp(polynomial_step(e.as_f64(), spec.lower, spec.upper, eta, rng));
            }
        });
        Ok(NodeStatus::Completed)
    }
}

// ============================================================================
// CategoricalPerturbation
// ============================================================================

/// Perturbation of ordinal and nominal variables.
///
/// An ordinal variable moves one level up or down; a nominal variable
/// jumps to a uniformly chosen different category.
#[derive(Debug, Clone)]
pub struct CategoricalPerturbation {
    variable_probability: f64,
}

impl Default for CategoricalPerturbation {
    fn default() -> Self {
        Self {
            variable_probability: 0.1,
        }
    }
}

impl CategoricalPerturbation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable_probability(mut self, p: f64) -> Self {
        self.variable_probability = p;
        self
    }
}

fn perturb_category<R: Rng + ?Sized>(e: Element, spec: &ElementSpec, rng: &mut R) -> Element {
    let lo = spec.lower as i64;
    let hi = spec.upper as i64;
    if hi <= lo {
        return e;
    }
    match e {
        Element::Ordinal(v) => {
            let step = if v <= lo {
                1
            } else if v >= hi {
                -1
            } else if rng.random_bool(0.5) {
                1
            } else {
                -1
            };
            Element::Ordinal(v + step)
        }
        Element::Nominal(v) => {
            // Draw among the other categories, skipping the current one.
            let mut c = rng.random_range(lo..hi);
            if c >= v {
                c += 1;
            }
            Element::Nominal(c)
        }
        other => other,
    }
}

impl Operator for CategoricalPerturbation {
    fn name(&self) -> &str {
        "CategoricalPerturbation"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::adopting(&[], &[Tag::FOR_PERTURBATION])
    }

    fn validate(&self, _problem: &ProblemDefinition) -> PipelineResult<()> {
        check_probability(self.name(), self.variable_probability)
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_output(ctx));
        let p = self.variable_probability;
        perturb_outputs(ctx, |x, specs, rng| {
            for (e, spec) in x.iter_mut().zip(specs) {
                let categorical = matches!(spec.kind, ElementKind::Ordinal | ElementKind::Nominal);
                if !categorical || e.kind() != spec.kind || !rng.random_bool(p) {
                    continue;
                }
                *e = perturb_category(*e, spec, rng);
            }
        });
        Ok(NodeStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Solution;
    use crate::operators::testing::{evaluated, Fixed};
    use crate::pipeline::{Pipeline, PipelineConfig};
    use crate::random::create_rng;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn pipeline(decision: Vec<ElementSpec>) -> Pipeline {
        let problem = ProblemDefinition::new(2)
            .with_decision(decision)
            .with_real_function(|x| vec![x[0], 1.0 - x[0]]);
        Pipeline::new(Arc::new(problem), &PipelineConfig::default().with_seed(8)).expect("valid")
    }

    fn mixed(values: [i64; 2]) -> Solution {
        let mut s = Solution::from_parts(
            vec![Element::Ordinal(values[0]), Element::Nominal(values[1])],
            2,
            0,
            Vec::new(),
        );
        s.define_objectives(&[1.0, 1.0]);
        s.define_evaluated(true);
        s
    }

    #[test]
    fn test_polynomial_mutation_in_place() {
        let mut p = pipeline(vec![ElementSpec::real(0.0, 1.0); 4]);
        let source = p.push(Fixed::new(
            &[Tag::FOR_PERTURBATION],
            vec![evaluated(&[0.5; 4], &[1.0, 1.0])],
        ));
        p.push(PolynomialMutation::new().with_variable_probability(1.0));
        p.evaluate().expect("runs");

        let sets = p.owned_sets(source).expect("known node");
        let s = sets[0].get(0).expect("member").read();
        assert!(!s.is_evaluated());
        assert!(s.decision().iter().all(|e| (0.0..=1.0).contains(&e.as_f64())));
        assert!(s.decision().iter().any(|e| e.as_f64() != 0.5));
    }

    #[test]
    fn test_zero_probability_keeps_evaluation() {
        let mut p = pipeline(vec![ElementSpec::real(0.0, 1.0)]);
        let source = p.push(Fixed::new(&[Tag::FOR_PERTURBATION], vec![evaluated(&[0.5], &[1.0, 1.0])]));
        p.push(PolynomialMutation::new().with_variable_probability(0.0));
        p.evaluate().expect("runs");
        let sets = p.owned_sets(source).expect("known node");
        assert!(sets[0].iter().all(|h| h.read().is_evaluated()));
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let mut p = pipeline(vec![ElementSpec::real(0.0, 1.0)]);
        p.push(CategoricalPerturbation::new().with_variable_probability(1.5));
        assert!(matches!(p.evaluate(), Err(PipelineError::Configuration { .. })));
    }

    #[test]
    fn test_categorical_perturbation() {
        let mut p = pipeline(vec![ElementSpec::ordinal(5), ElementSpec::nominal(3)]);
        let source = p.push(Fixed::new(&[Tag::FOR_PERTURBATION], vec![mixed([0, 1]), mixed([4, 2])]));
        p.push(CategoricalPerturbation::new().with_variable_probability(1.0));
        p.evaluate().expect("runs");

        let sets = p.owned_sets(source).expect("known node");
        let x: Vec<Vec<Element>> = sets[0].iter().map(|h| h.read().decision().to_vec()).collect();
        assert_eq!(x[0][0], Element::Ordinal(1));
        assert_ne!(x[0][1], Element::Nominal(1));
        assert_eq!(x[1][0], Element::Ordinal(3));
        assert_ne!(x[1][1], Element::Nominal(2));
    }

    #[test]
    fn test_mutation_skips_without_targets() {
        let mut p = pipeline(vec![ElementSpec::real(0.0, 1.0)]);
        p.push(PolynomialMutation::new());
        assert!(p.evaluate().expect("runs").is_skipped());
    }

    proptest! {
        #[test]
        fn prop_polynomial_step_within_bounds(y in -3.0f64..3.0, seed in 0u64..1000) {
            let mut rng = create_rng(seed);
            let v = polynomial_step(y, -3.0, 3.0, 20.0, &mut rng);
            prop_assert!((-3.0..=3.0).contains(&v));
        }

        #[test]
        fn prop_nominal_always_changes(v in 0i64..6, seed in 0u64..1000) {
            let mut rng = create_rng(seed);
            let spec = ElementSpec::nominal(6);
            let out = perturb_category(Element::Nominal(v), &spec, &mut rng);
            prop_assert_ne!(out, Element::Nominal(v));
            prop_assert!(matches!(out, Element::Nominal(c) if (0..6).contains(&c)));
        }
    }
}
