//! Operators: the stages a pipeline is built from.
//!
//! Every stage implements [`Operator`]. An operator declares which tags it
//! reads and writes, validates its configuration against the problem, and
//! transforms its bound sets when the pipeline evaluates its node.
//!
//! # Families
//!
//! - [`initialisation`]: create the initial population
//! - [`evaluation`]: call the objective function
//! - [`fitness`]: assign costs (scalarisation, non-dominance ranking)
//! - [`filtration`]: select, group, merge and truncate sets
//! - [`direction`]: recombination
//! - [`perturbation`]: mutation
//! - [`replacement`]: write offspring back into the population
//! - [`scalarising`]: scalarising functions shared by several operators
//!
//! # Failure policy
//!
//! Bound data in the wrong shape (no set for a tag, an empty set) is not an
//! error: the operator returns [`NodeStatus::Skipped`] and leaves its
//! outputs untouched. Invalid configuration is an error and aborts the run.

use rustc_hash::FxHashSet;

use crate::error::{Mismatch, NodeStatus, PipelineResult};
use crate::model::{ProblemDefinition, SolutionHandle, SolutionSet};
use crate::pipeline::{NodeContext, OperatorTags};

/// Returns early from `evaluate_node` with a skipped status.
macro_rules! skip_unless {
    ($check:expr) => {
        if let Err(mismatch) = $check {
            return Ok($crate::error::NodeStatus::Skipped(mismatch));
        }
    };
}
pub(crate) use skip_unless;

pub mod direction;
pub mod evaluation;
pub mod filtration;
pub mod fitness;
pub mod initialisation;
pub mod perturbation;
pub mod replacement;
pub mod scalarising;

pub use direction::SbxCrossover;
pub use evaluation::Evaluator;
pub use filtration::{
    MergeSets, NeighbourhoodFiltration, NsgaIIEliteSelection, RandFiltrationForDirection,
    TournamentFiltrationForDirection, TruncateSets,
};
pub use fitness::{NonDominanceRanking, Scalarization};
pub use initialisation::{RandomInit, WeightVectorInit};
pub use perturbation::{CategoricalPerturbation, PolynomialMutation};
pub use replacement::MoeadNeighbourhoodUpdate;
pub use scalarising::{DistanceMeasure, ScalarisationType};

/// A pipeline stage.
pub trait Operator {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Tags the node starts with. They may be changed through the pipeline
    /// until the first evaluation.
    fn default_tags(&self) -> OperatorTags;

    /// Checks the configuration against the problem. Called once, before
    /// the first evaluation.
    fn validate(&self, _problem: &ProblemDefinition) -> PipelineResult<()> {
        Ok(())
    }

    /// Transforms the bound sets.
    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus>;
}

/// Skips when nothing is bound to the input tags or every bound set is empty.
pub(crate) fn require_input(ctx: &NodeContext<'_>) -> Result<(), Mismatch> {
    if ctx.input_set_count() == 0 {
        return Err(Mismatch::UnresolvedTags);
    }
    let all_empty = (0..ctx.input_set_count())
        .all(|i| ctx.input_set(i).map_or(true, SolutionSet::is_empty));
    if all_empty {
        return Err(Mismatch::EmptyInput);
    }
    Ok(())
}

/// Same check on the output list, for operators that adopt their outputs.
pub(crate) fn require_output(ctx: &NodeContext<'_>) -> Result<(), Mismatch> {
    if ctx.output_set_count() == 0 {
        return Err(Mismatch::UnresolvedTags);
    }
    let all_empty = (0..ctx.output_set_count())
        .all(|i| ctx.output_set(i).map_or(true, SolutionSet::is_empty));
    if all_empty {
        return Err(Mismatch::EmptyInput);
    }
    Ok(())
}

/// Every distinct handle of the bound input sets, in binding order.
pub(crate) fn collect_inputs(ctx: &NodeContext<'_>) -> Vec<SolutionHandle> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for id in ctx.input_sets() {
        let Some(set) = ctx.set(id) else { continue };
        for h in set {
            if seen.insert(h.id()) {
                out.push(h.clone());
            }
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixture operators shared by the operator tests.

    use super::Operator;
    use crate::error::{NodeStatus, PipelineResult};
    use crate::model::{Element, Solution, SolutionHandle, SolutionSet, Tag};
    use crate::pipeline::{NodeContext, OperatorTags};

    /// Emits fixed sets once, on its first evaluation.
    pub(crate) struct Fixed {
        tags: Vec<Tag>,
        sets: Vec<Vec<Solution>>,
    }

    impl Fixed {
        pub(crate) fn new(tags: &[Tag], solutions: Vec<Solution>) -> Self {
            Self::sets(tags, vec![solutions])
        }

        pub(crate) fn sets(tags: &[Tag], sets: Vec<Vec<Solution>>) -> Self {
            Self {
                tags: tags.to_vec(),
                sets,
            }
        }
    }

    impl Operator for Fixed {
        fn name(&self) -> &str {
            "Fixed"
        }

        fn default_tags(&self) -> OperatorTags {
            OperatorTags::new(&[], &self.tags)
        }

        fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
            for members in std::mem::take(&mut self.sets) {
                let set: SolutionSet = members.into_iter().map(SolutionHandle::new).collect();
                ctx.append_existing_output_set(set);
            }
            Ok(NodeStatus::Completed)
        }
    }

    /// An evaluated solution with a real decision vector.
    pub(crate) fn evaluated(decision: &[f64], objectives: &[f64]) -> Solution {
        let mut s = Solution::from_parts(
            decision.iter().map(|&x| Element::Real(x)).collect(),
            objectives.len(),
            0,
            Vec::new(),
        );
        s.define_objectives(objectives);
        s.define_evaluated(true);
        s
    }

    /// Same as [`evaluated`] with a weight vector.
    pub(crate) fn weighted(decision: &[f64], objectives: &[f64], weights: &[f64]) -> Solution {
        let mut s = evaluated(decision, objectives);
        s.define_weights(weights.to_vec());
        s
    }
}
