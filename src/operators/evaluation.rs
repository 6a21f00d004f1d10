//! Objective-function evaluation.
//!
//! The [`Evaluator`] calls the problem's function on every unevaluated
//! solution of its input sets. This is the only parallel region of a run:
//! with the `parallel` feature and more than one evaluation thread, calls
//! fan out on a bounded rayon pool and join before the node returns. Every
//! call gets its own RNG stream keyed by iteration and task index, so the
//! outcome does not depend on the thread count.
//!
//! Write-back, budget accounting and the ideal / anti-ideal update happen
//! on the pipeline thread after the join.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

use super::{collect_inputs, require_input, Operator};
use crate::error::{ConfigErrorKind, NodeStatus, PipelineError, PipelineResult};
use crate::model::{Element, Evaluation, ObjectiveFunction, SolutionHandle, Tag};
use crate::pipeline::{NodeContext, OperatorTags};
use crate::random::RandomContext;

/// Inputs of one pending call, copied out of the solution lock.
struct Task {
    decision: Vec<Element>,
    parameters: Vec<f64>,
}

/// Evaluates every unevaluated solution bound to `FOR_EVALUATION`.
///
/// A solution referenced by several input sets is evaluated once. When the
/// evaluation budget runs low, only the first solutions that fit are
/// evaluated.
#[derive(Debug, Default)]
pub struct Evaluator {
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "parallel")]
    fn pool(&mut self, threads: usize) -> Option<&rayon::ThreadPool> {
        if threads <= 1 {
            return None;
        }
        let stale = self
            .pool
            .as_ref()
            .map_or(true, |p| p.current_num_threads() != threads);
        if stale {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => self.pool = Some(pool),
                Err(e) => {
                    warn!(error = %e, "evaluation pool unavailable, evaluating sequentially");
                    return None;
                }
            }
        }
        self.pool.as_ref()
    }

    fn compute(
        &mut self,
        function: &dyn ObjectiveFunction,
        tasks: &[Task],
        random: &RandomContext,
        iteration: u64,
        threads: usize,
    ) -> Vec<Evaluation> {
        let run = |i: usize, task: &Task| {
            let mut rng = random.task_rng(iteration, i as u64);
            function.evaluate(&task.decision, &task.parameters, &mut rng)
        };

        #[cfg(feature = "parallel")]
        {
            if let Some(pool) = self.pool(threads) {
                return pool.install(|| {
                    tasks
                        .par_iter()
                        .enumerate()
                        .map(|(i, t)| run(i, t))
                        .collect()
                });
            }
        }
        #[cfg(not(feature = "parallel"))]
        let _ = threads;

        tasks.iter().enumerate().map(|(i, t)| run(i, t)).collect()
    }
}

impl Operator for Evaluator {
    fn name(&self) -> &str {
        "Evaluator"
    }

    fn default_tags(&self) -> OperatorTags {
        OperatorTags::new(&[Tag::FOR_EVALUATION], &[])
    }

    fn evaluate_node(&mut self, ctx: &mut NodeContext<'_>) -> PipelineResult<NodeStatus> {
        skip_unless!(require_input(ctx));

        let problem = ctx.problem();
        let function = problem.function().ok_or_else(|| {
            PipelineError::config(
                "Evaluator",
                ConfigErrorKind::InvalidProblem("no objective function".into()),
            )
        })?;

        let mut pending: Vec<SolutionHandle> = collect_inputs(ctx)
            .into_iter()
            .filter(|h| !h.read().is_evaluated())
            .collect();
        if let Some(remaining) = ctx.budget().remaining() {
            if remaining < pending.len() {
                debug!(pending = pending.len(), remaining, "evaluation budget truncates batch");
                pending.truncate(remaining);
            }
        }
        if pending.is_empty() {
            return Ok(NodeStatus::Completed);
        }

        let tasks: Vec<Task> = pending
            .iter()
            .map(|h| {
                let s = h.read();
                Task {
                    decision: s.decision().to_vec(),
                    parameters: s.parameters().to_vec(),
                }
            })
            .collect();

        let iteration = ctx.iteration();
        let threads = ctx.evaluation_threads();
        let results = self.compute(function.as_ref(), &tasks, ctx.random(), iteration, threads);

        let mut rejected = 0usize;
        let mut evaluated = 0usize;
        for (handle, eval) in pending.iter().zip(&results) {
            let mut s = handle.write();
            if !s.define_objectives(&eval.objectives) {
                rejected += 1;
                continue;
            }
            if problem.constraint_count() > 0 && !s.define_constraints(&eval.constraints) {
                rejected += 1;
                s.define_evaluated(false);
                continue;
            }
            s.define_evaluated(true);
            drop(s);
            ctx.bookkeeping().update(&eval.objectives);
            evaluated += 1;
        }
        if rejected > 0 {
            warn!(
                rejected,
                objectives = problem.objective_count,
                constraints = problem.constraint_count(),
                "objective function returned vectors of the wrong length"
            );
        }
        // Only accepted results are charged.
        ctx.budget().consume(evaluated);
        debug!(evaluated, rejected, used = ctx.budget().used(), "batch evaluated");
        Ok(NodeStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Mismatch;
    use crate::model::{ElementSpec, ProblemDefinition};
    use crate::operators::RandomInit;
    use crate::pipeline::{Pipeline, PipelineConfig};
    use rand::{Rng, RngCore};
    use std::sync::Arc;

    fn problem() -> Arc<ProblemDefinition> {
        Arc::new(
            ProblemDefinition::new(2)
                .with_decision(vec![ElementSpec::real(0.0, 1.0); 2])
                .with_real_function(|x| vec![x[0], 1.0 - x[0] + x[1]]),
        )
    }

    fn chain(config: PipelineConfig, problem: Arc<ProblemDefinition>, size: usize) -> Pipeline {
        let mut p = Pipeline::new(problem, &config).expect("valid");
        p.push(RandomInit::new(size));
        p.push(Evaluator::new());
        p
    }

    #[test]
    fn test_evaluates_population_once() {
        let mut p = chain(PipelineConfig::default().with_seed(3), problem(), 8);
        p.evaluate().expect("runs");
        assert_eq!(p.budget().used(), 8);
        let main = p.sets_with_tag(Tag::MAIN_OPTIMIZATION_SET);
        assert!(main[0].iter().all(|h| h.read().is_evaluated()));

        p.increment_iteration();
        p.evaluate().expect("runs");
        assert_eq!(p.budget().used(), 8);
    }

    #[test]
    fn test_updates_bookkeeping() {
        let mut p = chain(PipelineConfig::default().with_seed(3), problem(), 10);
        p.evaluate().expect("runs");
        let k = p.bookkeeping();
        assert_eq!(k.ideal().len(), 2);
        assert!(k.ideal()[0] <= k.anti_ideal()[0]);
    }

    #[test]
    fn test_budget_truncates_batch() {
        let config = PipelineConfig::default().with_seed(3).with_max_evaluations(5);
        let mut p = chain(config, problem(), 8);
        p.evaluate().expect("runs");
        assert_eq!(p.budget().used(), 5);
        assert!(p.is_terminate());
        let main = p.sets_with_tag(Tag::MAIN_OPTIMIZATION_SET);
        let done = main[0].iter().filter(|h| h.read().is_evaluated()).count();
        assert_eq!(done, 5);
    }

    #[test]
    fn test_skips_without_input() {
        let mut p = Pipeline::new(problem(), &PipelineConfig::default()).expect("valid");
        p.push(Evaluator::new());
        let status = p.evaluate().expect("runs");
        assert_eq!(status, NodeStatus::Skipped(Mismatch::UnresolvedTags));
        assert_eq!(p.mismatch_count(), 1);
    }

    #[test]
    fn test_rejected_results_are_not_charged() {
        let short = Arc::new(
            ProblemDefinition::new(2)
                .with_decision(vec![ElementSpec::real(0.0, 1.0)])
                .with_real_function(|x| vec![x[0]]),
        );
        let mut p = chain(PipelineConfig::default().with_seed(3), short, 8);
        p.evaluate().expect("runs");
        assert_eq!(p.budget().used(), 0);
        let main = p.sets_with_tag(Tag::MAIN_OPTIMIZATION_SET);
        assert!(main[0].iter().all(|h| !h.read().is_evaluated()));

        p.increment_iteration();
        p.evaluate().expect("runs");
        assert_eq!(p.budget().used(), 0);
    }

    /// Adds task-local noise to the objectives.
    struct Noisy;

    impl ObjectiveFunction for Noisy {
        fn evaluate(&self, decision: &[Element], _: &[f64], rng: &mut dyn RngCore) -> Evaluation {
            let x = decision[0].as_f64();
            Evaluation {
                objectives: vec![x + rng.random::<f64>(), 1.0 - x],
                constraints: Vec::new(),
            }
        }
    }

    #[test]
    fn test_results_independent_of_thread_count() {
        let noisy = Arc::new(
            ProblemDefinition::new(2)
                .with_decision(vec![ElementSpec::real(0.0, 1.0)])
                .with_function(Arc::new(Noisy)),
        );
        let run = |threads: usize| {
            let config = PipelineConfig::default()
                .with_seed(11)
                .with_evaluation_threads(threads);
            let mut p = chain(config, Arc::clone(&noisy), 32);
            p.evaluate().expect("runs");
            p.sets_with_tag(Tag::MAIN_OPTIMIZATION_SET)[0].objective_matrix()
        };
        assert_eq!(run(1), run(4));
    }
}
