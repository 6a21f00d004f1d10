//! Fitness assignment: costs from weights or from Pareto ranks.

use tracing::debug;

use super::scalarising::ScalarisationType;
use super::{collect_inputs, require_input, Operator};
use crate::error::{ConfigErrorKind, NodeStatus, PipelineError, PipelineResult};
use crate::model::{Cost, ProblemDefinition, SolutionSet, Tag};
use crate::pipeline::{NodeContext, OperatorTags};
use crate::ranking::{DominanceRelation, RankingPolicy};

// ============================================================================
// Scalarization
// ============================================================================

/// Sets each input solution's cost to its scalarised objective vector.
///
/// The weights are the solution's own weight vector, or uniform weights
/// when it has none. With normalisation enabled, objectives are first
/// mapped onto `[0, 1]` with the run's ideal and anti-ideal vectors.
#[derive(Debug, Clone, Default)]
pub struct Scalarization {
    scalarisation: ScalarisationType,
    normalise: bool,
}

impl Scalarization {
    pub fn new(scalarisation: ScalarisationType) -> Self {
        Self {
            scalarisation,
            normalise: false,
        }
    }

    pub fn with_normalisation(mut self, normalise: bool) -> Self {
        self.normalise = normalise;
        self
    }

    pub fn scalarisation(&self) -> ScalarisationType {
        self.scalarisation
    }
}

impl Operator for Scalarization {
    fn name(&self) -> &str {
        "Scalarization"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[Tag::MAIN_OPTIMIZATION_SET], &[])
    }

    fn validate(&self, _problem: &ProblemDefinition) -> PipelineResult<()> {
        match self.scalarisation {
            ScalarisationType::WeightedLp(p) if !(p > 0.0) => Err(PipelineError::config(
                self.name(),
                ConfigErrorKind::InvalidParameter {
                    name: "p",
                    reason: format!("Lp exponent must be positive, got {p}"),
                },
            )),
            _ => Ok(()),
        }
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_input(ctx));
        let m = ctx.problem().objective_count;
        let uniform = vec![1.0 / m as f64; m];
        let members = collect_inputs(ctx);
        for h in &members {
            let mut s = h.write();
            let objectives = if self.normalise {
                ctx.bookkeeping().normalise(s.objectives())
            } else {
                s.objectives().to_vec()
            };
            let weights = if s.weights().is_empty() {
                &uniform[..]
            } else {
                s.weights()
            };
            let value = self.scalarisation.scalarise(weights, &objectives);
            s.define_cost(Cost::Exact(value));
            s.define_scalarised(true);
        }
        debug!(count = members.len(), function = %self.scalarisation, "costs scalarised");
        Ok(NodeStatus::Completed)
    }
}

// ============================================================================
// NonDominanceRanking
// ============================================================================

/// Ranks the union of the input sets and emits one output set per rank.
///
/// Feasible solutions come first, ranked by non-dominance (on goal-clipped
/// objectives when the problem has goals); infeasible ones follow by
/// violation score. Each solution's cost becomes its 0-based rank. With
/// parametric bins enabled, solutions in different external-parameter
/// cells are never compared.
#[derive(Debug, Clone, Default)]
pub struct NonDominanceRanking {
    relation: DominanceRelation,
    parametric_bins: Option<usize>,
}

impl NonDominanceRanking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relation(mut self, relation: DominanceRelation) -> Self {
        self.relation = relation;
        self
    }

    /// Enables parametric ranking with `bins` bins per external parameter.
    pub fn with_parametric_bins(mut self, bins: usize) -> Self {
        self.parametric_bins = Some(bins.max(1));
        self
    }

    fn policy(&self, problem: &ProblemDefinition) -> RankingPolicy {
        let policy = RankingPolicy::from_problem(problem, self.relation);
        match self.parametric_bins {
            Some(bins) => policy.with_parametric(problem, bins),
            None => policy,
        }
    }
}

impl Operator for NonDominanceRanking {
    fn name(&self) -> &str {
        "NonDominanceRanking"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[Tag::FOR_FITNESS], &[Tag::RANKED])
    }

    fn validate(&self, problem: &ProblemDefinition) -> PipelineResult<()> {
        if self.parametric_bins.is_some() && problem.external_parameters().is_empty() {
            return Err(PipelineError::config(
                self.name(),
                ConfigErrorKind::InvalidParameter {
                    name: "parametric_bins",
                    reason: "the problem has no external parameters".into(),
                },
            ));
        }
        Ok(())
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_input(ctx));
        let union = SolutionSet::from_handles(collect_inputs(ctx));
        let fronts = self.policy(ctx.problem()).rank_set(&union);

        ctx.clear_output_sets();
        for (rank, front) in fronts.into_iter().enumerate() {
            for h in &front {
                h.write().define_cost(Cost::Exact(rank as f64));
            }
            ctx.append_existing_output_set(front);
        }
        debug!(fronts = ctx.output_set_count(), size = union.len(), "population ranked");
        Ok(NodeStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementSpec, Solution};
    use crate::operators::testing::{evaluated, weighted, Fixed};
    use crate::pipeline::{Pipeline, PipelineConfig};
    use std::sync::Arc;

    fn pipeline() -> Pipeline {
        let problem = ProblemDefinition::new(2)
            .with_decision(vec![ElementSpec::real(0.0, 1.0)])
            .with_real_function(|x| vec![x[0], 1.0 - x[0]]);
        Pipeline::new(Arc::new(problem), &PipelineConfig::default()).expect("valid")
    }

    fn points(objectives: &[[f64; 2]]) -> Vec<Solution> {
        objectives.iter().map(|o| evaluated(&[0.5], o)).collect()
    }

    fn costs(p: &Pipeline, tag: Tag) -> Vec<f64> {
        p.sets_with_tag(tag)[0]
            .iter()
            .map(|h| h.read().cost_value())
            .collect()
    }

    // ---- Scalarization ----

    #[test]
    fn test_scalarization_uses_solution_weights() {
        let mut p = pipeline();
        p.push(Fixed::new(
            &[Tag::MAIN_OPTIMIZATION_SET],
            vec![
                weighted(&[0.5], &[2.0, 4.0], &[1.0, 0.0]),
                weighted(&[0.5], &[2.0, 4.0], &[0.5, 0.5]),
            ],
        ));
        p.push(Scalarization::new(ScalarisationType::WeightedSum));
        p.evaluate().expect("runs");
        let c = costs(&p, Tag::MAIN_OPTIMIZATION_SET);
        assert!((c[0] - (2.0 + 4.0e-6)).abs() < 1e-9);
        assert!((c[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_scalarization_defaults_to_uniform_weights() {
        let mut p = pipeline();
        p.push(Fixed::new(&[Tag::MAIN_OPTIMIZATION_SET], points(&[[1.0, 3.0]])));
        p.push(Scalarization::new(ScalarisationType::WeightedChebyshev));
        p.evaluate().expect("runs");
        assert!((costs(&p, Tag::MAIN_OPTIMIZATION_SET)[0] - 1.5).abs() < 1e-12);
        assert!(p.sets_with_tag(Tag::MAIN_OPTIMIZATION_SET)[0]
            .iter()
            .all(|h| h.read().is_scalarised()));
    }

    #[test]
    fn test_scalarization_rejects_bad_exponent() {
        let mut p = pipeline();
        p.push(Scalarization::new(ScalarisationType::WeightedLp(0.0)));
        assert!(matches!(
            p.evaluate(),
            Err(PipelineError::Configuration { .. })
        ));
    }

    // ---- NonDominanceRanking ----

    #[test]
    fn test_ranking_emits_one_set_per_front() {
        let mut p = pipeline();
        p.push(Fixed::new(
            &[Tag::FOR_FITNESS],
            points(&[[1.0, 4.0], [2.0, 2.0], [3.0, 1.0], [4.0, 5.0]]),
        ));
        let ranking = p.push(NonDominanceRanking::new());
        p.evaluate().expect("runs");

        let fronts = p.output_sets(ranking).expect("known node");
        assert_eq!(fronts.len(), 2);
        assert_eq!(fronts[0].len(), 3);
        assert_eq!(fronts[1].len(), 1);
        assert!(fronts.iter().all(|s| s.has_tag(Tag::RANKED)));
        assert_eq!(costs(&p, Tag::FOR_FITNESS), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_ranking_replaces_fronts_each_iteration() {
        let mut p = pipeline();
        p.push(Fixed::new(&[Tag::FOR_FITNESS], points(&[[1.0, 1.0], [2.0, 2.0]])));
        let ranking = p.push(NonDominanceRanking::new());
        p.evaluate().expect("runs");
        p.increment_iteration();
        p.evaluate().expect("runs");
        assert_eq!(p.owned_sets(ranking).expect("known node").len(), 2);
    }

    #[test]
    fn test_ranking_skips_without_input() {
        let mut p = pipeline();
        let id = p.push(NonDominanceRanking::new());
        assert!(p.evaluate().expect("runs").is_skipped());
        assert!(p.output_sets(id).expect("known node").is_empty());
    }

    #[test]
    fn test_parametric_ranking_requires_external_parameters() {
        let mut p = pipeline();
        p.push(NonDominanceRanking::new().with_parametric_bins(4));
        assert!(p.evaluate().is_err());
    }
}
