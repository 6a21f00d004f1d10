//! Writing offspring back into the population.

use tracing::debug;

use super::scalarising::{generalised_decomposition, ScalarisationType};
use super::{require_input, Operator};
use crate::error::{ConfigErrorKind, Mismatch, NodeStatus, PipelineError, PipelineResult};
use crate::model::{Cost, ProblemDefinition, SolutionHandle, Tag};
use crate::pipeline::{NodeContext, OperatorTags, SetId};

/// MOEA/D neighbourhood replacement.
///
/// Child sets (tagged `FOR_MOEAD_UPDATE`) and neighbourhood sets (tagged
/// `NEIGHBOURHOODS`) are walked in lock-step: the children of the `i`-th
/// child set compete against the members of the `i`-th neighbourhood.
/// Neighbours are visited in random order. A neighbour is overwritten by
/// the child when the child's scalarised cost under the neighbour's weight
/// vector is lower; at most `max_replacements` neighbours are overwritten
/// per child. Objectives are normalised with the run's ideal and
/// anti-ideal vectors before scalarisation.
///
/// Overwriting keeps the neighbour's identity and weights, so every set
/// that references it sees the new values.
#[derive(Debug, Clone)]
pub struct MoeadNeighbourhoodUpdate {
    scalarisation: ScalarisationType,
    max_replacements: usize,
    generalised_decomposition: bool,
}

impl Default for MoeadNeighbourhoodUpdate {
    fn default() -> Self {
        Self {
            scalarisation: ScalarisationType::default(),
            max_replacements: 2,
            generalised_decomposition: false,
        }
    }
}

impl MoeadNeighbourhoodUpdate {
    pub fn new(scalarisation: ScalarisationType) -> Self {
        Self {
            scalarisation,
            ..Self::default()
        }
    }

    pub fn with_max_replacements(mut self, n: usize) -> Self {
        self.max_replacements = n;
        self
    }

    /// Uses generalised-decomposition weights instead of the raw weights.
    pub fn with_generalised_decomposition(mut self, enabled: bool) -> Self {
        self.generalised_decomposition = enabled;
        self
    }

    pub fn scalarisation(&self) -> ScalarisationType {
        self.scalarisation
    }

    fn weights_of(&self, weights: &[f64], m: usize) -> Vec<f64> {
        let w = if weights.is_empty() {
            vec![1.0 / m as f64; m]
        } else {
            weights.to_vec()
        };
        if self.generalised_decomposition {
            generalised_decomposition(&w)
        } else {
            w
        }
    }
}

impl Operator for MoeadNeighbourhoodUpdate {
    fn name(&self) -> &str {
        "MoeadNeighbourhoodUpdate"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[Tag::FOR_MOEAD_UPDATE, Tag::NEIGHBOURHOODS], &[])
    }

    fn validate(&self, _problem: &ProblemDefinition) -> PipelineResult<()> {
        if self.max_replacements == 0 {
            return Err(PipelineError::config(
                self.name(),
                ConfigErrorKind::InvalidParameter {
                    name: "max_replacements",
                    reason: "must be at least 1".into(),
                },
            ));
        }
        Ok(())
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_input(ctx));

        let (neighbourhoods, children): (Vec<SetId>, Vec<SetId>) = ctx
            .input_sets()
            .into_iter()
            .partition(|id| ctx.set(*id).is_some_and(|s| s.has_tag(Tag::NEIGHBOURHOODS)));
        if neighbourhoods.is_empty() || children.is_empty() {
            return Ok(NodeStatus::Skipped(Mismatch::UnresolvedTags));
        }
        if neighbourhoods.len() != children.len() {
            return Ok(NodeStatus::Skipped(Mismatch::SizeMismatch));
        }

        let m = ctx.problem().objective_count;
        let bookkeeping = ctx.bookkeeping().clone();
        let mut replaced = 0usize;

        for (child_id, nb_id) in children.into_iter().zip(neighbourhoods) {
            let offspring: Vec<SolutionHandle> = ctx
                .set(child_id)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            let neighbours: Vec<SolutionHandle> = ctx
                .set(nb_id)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();

            for child in &offspring {
                let (decision, objectives, constraints) = {
                    let c = child.read();
                    if !c.is_evaluated() {
                        continue;
                    }
                    (c.decision().to_vec(), c.objectives().to_vec(), c.constraints().to_vec())
                };
                let child_norm = bookkeeping.normalise(&objectives);

                let mut count = 0;
                for k in ctx.random().permutation(neighbours.len()) {
                    if count >= self.max_replacements {
                        break;
                    }
                    let neighbour = &neighbours[k];
                    if neighbour.ptr_eq(child) {
                        continue;
                    }
                    let mut n = neighbour.write();
                    let w = self.weights_of(n.weights(), m);
                    let child_cost = self.scalarisation.scalarise(&w, &child_norm);
                    let current = self
                        .scalarisation
                        .scalarise(&w, &bookkeeping.normalise(n.objectives()));
                    if child_cost < current {
                        n.define_decision(&decision);
                        n.define_objectives(&objectives);
                        n.define_constraints(&constraints);
                        n.define_evaluated(true);
                        n.define_cost(Cost::Exact(child_cost));
                        count += 1;
                    }
                }
                replaced += count;
            }
        }
        debug!(replaced, "neighbourhoods updated");
        Ok(NodeStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ElementSpec, Solution};
    use crate::operators::testing::{weighted, Fixed};
    use crate::pipeline::{Pipeline, PipelineConfig};
    use std::sync::Arc;

    fn pipeline() -> Pipeline {
        let problem = ProblemDefinition::new(2)
            .with_decision(vec![ElementSpec::real(0.0, 1.0)])
            .with_real_function(|x| vec![x[0], 1.0 - x[0]]);
        Pipeline::new(Arc::new(problem), &PipelineConfig::default().with_seed(2)).expect("valid")
    }

    fn neighbourhood(n: usize, objectives: [f64; 2]) -> Vec<Solution> {
        (0..n).map(|_| weighted(&[0.9], &objectives, &[0.5, 0.5])).collect()
    }

    fn replaced_count(p: &Pipeline) -> usize {
        p.sets_with_tag(Tag::NEIGHBOURHOODS)[0]
            .iter()
            .filter(|h| h.read().decision()[0] == Element::Real(0.1))
            .count()
    }

    fn with_child(child: [f64; 2], update: MoeadNeighbourhoodUpdate) -> Pipeline {
        let mut p = pipeline();
        p.push(Fixed::new(&[Tag::NEIGHBOURHOODS], neighbourhood(3, [2.0, 2.0])));
        p.push(Fixed::new(&[Tag::FOR_MOEAD_UPDATE], vec![weighted(&[0.1], &child, &[0.5, 0.5])]));
        p.push(update);
        p.evaluate().expect("runs");
        p
    }

    #[test]
    fn test_better_child_replaces_up_to_limit() {
        let p = with_child([1.0, 1.0], MoeadNeighbourhoodUpdate::default());
        assert_eq!(replaced_count(&p), 2);
        let set = p.sets_with_tag(Tag::NEIGHBOURHOODS)[0];
        for h in set.iter().filter(|h| h.read().decision()[0] == Element::Real(0.1)) {
            let s = h.read();
            assert_eq!(s.objectives(), &[1.0, 1.0]);
            assert_eq!(s.weights(), &[0.5, 0.5]);
            assert!(s.is_evaluated());
        }
    }

    #[test]
    fn test_higher_limit_replaces_all() {
        let p = with_child([1.0, 1.0], MoeadNeighbourhoodUpdate::default().with_max_replacements(10));
        assert_eq!(replaced_count(&p), 3);
    }

    #[test]
    fn test_worse_child_replaces_nothing() {
        let p = with_child([3.0, 3.0], MoeadNeighbourhoodUpdate::default());
        assert_eq!(replaced_count(&p), 0);
    }

    #[test]
    fn test_mismatched_set_counts_skip() {
        let mut p = pipeline();
        p.push(Fixed::sets(
            &[Tag::NEIGHBOURHOODS],
            vec![neighbourhood(2, [2.0, 2.0]), neighbourhood(2, [2.0, 2.0])],
        ));
        p.push(Fixed::new(&[Tag::FOR_MOEAD_UPDATE], vec![weighted(&[0.1], &[1.0, 1.0], &[0.5, 0.5])]));
        p.push(MoeadNeighbourhoodUpdate::default());
        assert_eq!(
            p.evaluate().expect("runs"),
            NodeStatus::Skipped(Mismatch::SizeMismatch)
        );
        assert_eq!(replaced_count(&p), 0);
    }

    #[test]
    fn test_zero_replacements_rejected() {
        let mut p = pipeline();
        p.push(MoeadNeighbourhoodUpdate::default().with_max_replacements(0));
        assert!(p.evaluate().is_err());
    }
}
