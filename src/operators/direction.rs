//! Recombination.
//!
//! # References
//!
//! - Deb & Agrawal (1995), "Simulated Binary Crossover for Continuous
//!   Search Space"

use rand::Rng;

use super::{require_input, Operator};
use crate::error::{ConfigErrorKind, NodeStatus, PipelineError, PipelineResult};
use crate::model::{Element, ElementKind, ElementSpec, ProblemDefinition, SolutionHandle, SolutionSet, Tag};
use crate::pipeline::{NodeContext, OperatorTags};

/// Simulated binary crossover.
///
/// Each input set is a parent group; it produces one output set with one
/// child per parent. Parents are paired in order `(0, 1), (2, 3), …`; an
/// unpaired last parent is copied. Children start as duplicates of their
/// parents, so parents are never modified.
///
/// A pair recombines with probability `solution_probability`, then each
/// variable with probability `variable_probability`: real and integer
/// variables by SBX, ordinal and nominal ones by swapping.
///
/// # Examples
///
/// ```
/// use u_moea::operators::SbxCrossover;
///
/// let sbx = SbxCrossover::default()
///     .with_distribution_index(20.0)
///     .with_solution_probability(1.0);
/// assert_eq!(sbx.distribution_index(), 20.0);
/// ```
#[derive(Debug, Clone)]
pub struct SbxCrossover {
    distribution_index: f64,
    solution_probability: f64,
    variable_probability: f64,
}

impl Default for SbxCrossover {
    fn default() -> Self {
        Self {
            distribution_index: 15.0,
            solution_probability: 0.9,
            variable_probability: 0.5,
        }
    }
}

impl SbxCrossover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distribution_index(mut self, eta: f64) -> Self {
        self.distribution_index = eta;
        self
    }

    /// Probability that a parent pair recombines at all (clamped to `[0, 1]`).
    pub fn with_solution_probability(mut self, p: f64) -> Self {
        self.solution_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Per-variable recombination probability (clamped to `[0, 1]`).
    pub fn with_variable_probability(mut self, p: f64) -> Self {
        self.variable_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn distribution_index(&self) -> f64 {
        self.distribution_index
    }

    fn recombine<R: Rng>(&self, a: &mut [Element], b: &mut [Element], specs: &[ElementSpec], rng: &mut R) {
        for ((x, y), spec) in a.iter_mut().zip(b.iter_mut()).zip(specs) {
            if x.kind() != spec.kind || y.kind() != spec.kind {
                continue;
            }
            if !rng.random_bool(self.variable_probability) {
                continue;
            }
            match spec.kind {
                ElementKind::Real | ElementKind::Integer => {
                    let (c1, c2) = sbx_pair(
                        x.as_f64(),
                        y.as_f64(),
                        spec.lower,
                        spec.upper,
                        self.distribution_index,
                        rng,
                    );
                    *x = spec.clamp(c1);
                    *y = spec.clamp(c2);
                }
                ElementKind::Ordinal | ElementKind::Nominal => std::mem::swap(x, y),
            }
        }
    }
}

/// Bounded SBX on one variable.
pub fn sbx_pair<R: Rng + ?Sized>(
    p1: f64,
    p2: f64,
    lower: f64,
    upper: f64,
    eta: f64,
    rng: &mut R,
) -> (f64, f64) {
    if (p1 - p2).abs() < 1e-14 {
        return (p1, p2);
    }
    let (y1, y2) = if p1 < p2 { (p1, p2) } else { (p2, p1) };
    let gap = y2 - y1;
    let exponent = 1.0 / (eta + 1.0);
    let u: f64 = rng.random();

    let spread = |to_bound: f64| {
        let beta = 1.0 + 2.0 * to_bound.max(0.0) / gap;
        let alpha = 2.0 - beta.powf(-(eta + 1.0));
        if u <= 1.0 / alpha {
            (u * alpha).powf(exponent)
        } else {
            (1.0 / (2.0 - u * alpha)).powf(exponent)
        }
    };

    let c1 = (0.5 * ((y1 + y2) - spread(y1 - lower) * gap)).clamp(lower, upper);
    let c2 = (0.5 * ((y1 + y2) + spread(upper - y2) * gap)).clamp(lower, upper);
    if rng.random_bool(0.5) {
        (c2, c1)
    } else {
        (c1, c2)
    }
}

impl Operator for SbxCrossover {
    fn name(&self) -> &str {
        "SbxCrossover"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[Tag::FOR_DIRECTION], &[Tag::OFFSPRING])
            .with_additional(&[Tag::FOR_PERTURBATION, Tag::FOR_EVALUATION])
    }

    fn validate(&self, _problem: &ProblemDefinition) -> PipelineResult<()> {
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
        skip_unless!(require_input(ctx));
        let specs = &ctx.problem().decision;
        ctx.clear_output_sets();

        for id in ctx.input_sets() {
            let parents: Vec<SolutionHandle> = ctx
                .set(id)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            let mut children: Vec<_> = parents.iter().map(|p| p.read().duplicate()).collect();

            let rng = ctx.rng();
            for pair in children.chunks_mut(2) {
                let [a, b] = pair else { continue };
                if !rng.random_bool(self.solution_probability) {
                    continue;
                }
                let mut xa = a.decision().to_vec();
                let mut xb = b.decision().to_vec();
                self.recombine(&mut xa, &mut xb, specs, rng);
                if xa.as_slice() != a.decision() {
                    a.define_decision(&xa);
                }
                if xb.as_slice() != b.decision() {
                    b.define_decision(&xb);
                }
            }
            for c in &mut children {
                c.clear_cost();
            }

            let offspring: SolutionSet = children.into_iter().map(SolutionHandle::new).collect();
            ctx.append_existing_output_set(offspring);
        }
        Ok(NodeStatus::Completed)
    }
}
