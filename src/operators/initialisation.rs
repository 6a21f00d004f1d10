//! Initial population.
//!
//! Both operators run once, on their first evaluation, and own the main
//! population for the rest of the run. The population set is persistent
//! and tagged for evaluation so the first evaluator downstream picks it up.

use rand::Rng;
use tracing::debug;

use super::Operator;
use crate::error::{ConfigErrorKind, NodeStatus, PipelineError, PipelineResult};
use crate::model::{Element, ElementKind, ProblemDefinition, Solution, SolutionHandle, SolutionSet, Tag};
use crate::pipeline::{NodeContext, OperatorTags};

/// Samples a uniformly random solution within the problem bounds.
pub fn random_solution<R: Rng + ?Sized>(problem: &ProblemDefinition, rng: &mut R) -> Solution {
    let decision = problem
        .decision
        .iter()
        .map(|spec| match spec.kind {
            ElementKind::Real => Element::Real(rng.random_range(spec.lower..=spec.upper)),
            kind => {
                let lo = spec.lower.ceil() as i64;
                let hi = (spec.upper.floor() as i64).max(lo);
                Element::from_f64(kind, rng.random_range(lo..=hi) as f64)
            }
        })
        .collect();
    let parameters = problem
        .parameters
        .iter()
        .map(|p| rng.random_range(p.lower..=p.upper))
        .collect();
    Solution::from_parts(
        decision,
        problem.objective_count,
        problem.constraint_count(),
        parameters,
    )
}

fn seed_population(ctx: &mut NodeContext<'_>, solutions: Vec<Solution>) {
    let set: SolutionSet = solutions.into_iter().map(SolutionHandle::new).collect();
    let id = ctx.append_existing_output_set(set);
    ctx.mark_persistent(id);
}

// ============================================================================
// RandomInit
// ============================================================================

/// Creates `population_size` uniformly random solutions.
#[derive(Debug, Clone)]
pub struct RandomInit {
    population_size: usize,
}

impl RandomInit {
    pub fn new(population_size: usize) -> Self {
        Self { population_size }
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }
}

impl Operator for RandomInit {
    fn name(&self) -> &str {
        "RandomInit"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[], &[Tag::MAIN_OPTIMIZATION_SET]).with_additional(&[Tag::FOR_EVALUATION])
    }

    fn validate(&self, _problem: &ProblemDefinition) -> PipelineResult<()> {
        if self.population_size == 0 {
            return Err(PipelineError::config(
                self.name(),
                ConfigErrorKind::InvalidParameter {
                    name: "population_size",
                    reason: "must be at least 1".into(),
                },
            ));
        }
        Ok(())
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        if !ctx.owned_sets().is_empty() {
            return Ok(NodeStatus::Completed);
        }
        let problem = ctx.problem();
        let rng = ctx.rng();
        let solutions: Vec<Solution> = (0..self.population_size)
            .map(|_| random_solution(problem, rng))
            .collect();
        seed_population(ctx, solutions);
        debug!(size = self.population_size, "random population created");
        Ok(NodeStatus::Completed)
    }
}

// ============================================================================
// WeightVectorInit
// ============================================================================

/// Creates a random population with one simplex-lattice weight vector per
/// solution, for decomposition-based algorithms.
///
/// The lattice uses `H` points per dimension, where `H` is either given or
/// the smallest value whose lattice has at least `population_size` points.
/// The population size becomes the lattice size.
#[derive(Debug, Clone)]
pub struct WeightVectorInit {
    population_size: usize,
    points_per_dimension: Option<usize>,
}

impl WeightVectorInit {
    pub fn new(population_size: usize) -> Self {
        Self {
            population_size,
            points_per_dimension: None,
        }
    }

    /// Fixes `H` instead of deriving it from the population size.
    pub fn with_points_per_dimension(mut self, h: usize) -> Self {
        self.points_per_dimension = Some(h.max(1));
        self
    }
}

impl Operator for WeightVectorInit {
    fn name(&self) -> &str {
        "WeightVectorInit"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[], &[Tag::MAIN_OPTIMIZATION_SET]).with_additional(&[Tag::FOR_EVALUATION])
    }

    fn validate(&self, problem: &ProblemDefinition) -> PipelineResult<()> {
        if problem.objective_count < 2 {
            return Err(PipelineError::config(
                self.name(),
                ConfigErrorKind::InvalidParameter {
                    name: "objective_count",
                    reason: "weight vectors need at least two objectives".into(),
                },
            ));
        }
        if self.population_size == 0 && self.points_per_dimension.is_none() {
            return Err(PipelineError::config(
                self.name(),
                ConfigErrorKind::InvalidParameter {
                    name: "population_size",
                    reason: "must be at least 1".into(),
                },
            ));
        }
        Ok(())
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        if !ctx.owned_sets().is_empty() {
            return Ok(NodeStatus::Completed);
        }
        let problem = ctx.problem();
        let m = problem.objective_count;
        let h = self
            .points_per_dimension
            .unwrap_or_else(|| points_for_population(self.population_size, m));
        let weights = simplex_lattice(m, h);

        let rng = ctx.rng();
        let solutions: Vec<Solution> = weights
            .into_iter()
            .map(|w| {
                let mut s = random_solution(problem, rng);
                s.define_weights(w);
                s
            })
            .collect();
        debug!(size = solutions.len(), h, "weighted population created");
        seed_population(ctx, solutions);
        Ok(NodeStatus::Completed)
    }
}

/// Number of points of the simplex lattice with `m` objectives and `h`
/// divisions: `C(h + m - 1, m - 1)`.
pub fn lattice_size(m: usize, h: usize) -> usize {
    if m == 0 {
        return 0;
    }
    let k = m - 1;
    let n = h + k;
    // C(n, k) computed incrementally; each partial product is an integer.
    (1..=k).fold(1usize, |acc, i| acc.saturating_mul(n - k + i) / i)
}

/// Smallest `h >= 1` whose lattice holds at least `population` points.
pub fn points_for_population(population: usize, m: usize) -> usize {
    let mut h = 1;
    while m >= 2 && lattice_size(m, h) < population {
        h += 1;
    }
    h
}

/// All weight vectors of `m` non-negative multiples of `1/h` summing to 1,
/// in lexicographic order of the first components.
pub fn simplex_lattice(m: usize, h: usize) -> Vec<Vec<f64>> {
    if m == 0 || h == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(lattice_size(m, h));
    let mut counts = vec![0usize; m];
    fill(&mut counts, 0, h, h, &mut out);
    out
}

fn fill(counts: &mut [usize], pos: usize, left: usize, h: usize, out: &mut Vec<Vec<f64>>) {
    if pos == counts.len() - 1 {
        counts[pos] = left;
        out.push(counts.iter().map(|&c| c as f64 / h as f64).collect());
        return;
    }
    for c in 0..=left {
        counts[pos] = c;
        fill(counts, pos + 1, left - c, h, out);
    }
}
