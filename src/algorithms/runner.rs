//! Generational loop execution.
//!
//! [`AlgorithmRunner`] drives any [`Algorithm`]: while the termination
//! criterion is not met, evaluate the pipeline's last node, then advance
//! the iteration. The final main population and its non-dominated front are
//! returned as snapshots.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::Algorithm;
use crate::error::PipelineResult;
use crate::model::{SolutionSet, SolutionSnapshot};
use crate::ranking::{DominanceRelation, RankingPolicy};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Uninitialised,
    Running,
    Terminated,
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunResult {
    /// Final main population.
    pub population: Vec<SolutionSnapshot>,

    /// Evaluated members of the population no other member is preferred
    /// to (feasibility and goals taken into account).
    pub front: Vec<SolutionSnapshot>,

    /// Total number of generations executed.
    pub iterations: u64,

    /// Objective-function evaluations consumed.
    pub evaluations: usize,

    /// Whether the evaluation budget, rather than the iteration limit,
    /// ended the run.
    pub stopped_by_budget: bool,

    /// Whether the run was cancelled externally.
    pub cancelled: bool,
}

/// Executes the generational loop of an [`Algorithm`].
///
/// # Usage
///
/// ```
/// use std::sync::Arc;
/// use u_moea::algorithms::{AlgorithmRunner, Nsga2, Nsga2Config};
/// use u_moea::model::{ElementSpec, ProblemDefinition};
///
/// let problem = ProblemDefinition::new(2)
///     .with_decision(vec![ElementSpec::real(-5.0, 5.0)])
///     .with_real_function(|x| vec![x[0] * x[0], (x[0] - 2.0).powi(2)]);
/// let config = Nsga2Config::default()
///     .with_population_size(20)
///     .with_max_iterations(10)
///     .with_seed(42);
///
/// let mut runner = AlgorithmRunner::new(Nsga2::new(Arc::new(problem), &config)?);
/// let result = runner.run()?;
/// assert_eq!(result.iterations, 10);
/// assert!(!result.front.is_empty());
/// # Ok::<(), u_moea::error::PipelineError>(())
/// ```
#[derive(Debug)]
pub struct AlgorithmRunner<A: Algorithm> {
    algorithm: A,
    state: RunState,
    cancel: Option<Arc<AtomicBool>>,
    cancelled: bool,
}

impl<A: Algorithm> AlgorithmRunner<A> {
    pub fn new(algorithm: A) -> Self {
        Self {
            algorithm,
            state: RunState::Uninitialised,
            cancel: None,
            cancelled: false,
        }
    }

    /// Attaches a cancellation flag.
    ///
    /// When the flag is set, the run stops after the current generation and
    /// returns the population as it stands.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn into_algorithm(self) -> A {
        self.algorithm
    }

    /// Runs one generation.
    ///
    /// Does nothing once the run is terminated.
    pub fn step(&mut self) -> PipelineResult<RunState> {
        if self.state == RunState::Terminated {
            return Ok(self.state);
        }
        if self.is_cancelled() {
            self.cancelled = true;
            self.state = RunState::Terminated;
            return Ok(self.state);
        }
        self.state = RunState::Running;

        let pipeline = self.algorithm.pipeline_mut();
        pipeline.evaluate()?;
        pipeline.increment_iteration();
        debug!(
            algorithm = self.algorithm.name(),
            iteration = self.algorithm.pipeline().iteration(),
            evaluations = self.algorithm.pipeline().budget().used(),
            "generation complete"
        );

        if self.algorithm.pipeline().is_terminate() {
            self.state = RunState::Terminated;
        }
        Ok(self.state)
    }

    /// Runs generations until termination and returns the result.
    pub fn run(&mut self) -> PipelineResult<RunResult> {
        while self.step()? != RunState::Terminated {}
        let result = self.result();
        info!(
            algorithm = self.algorithm.name(),
            iterations = result.iterations,
            evaluations = result.evaluations,
            front = result.front.len(),
            stopped_by_budget = result.stopped_by_budget,
            cancelled = result.cancelled,
            "run terminated"
        );
        Ok(result)
    }

    /// Snapshot of the run as it stands.
    pub fn result(&self) -> RunResult {
        let pipeline = self.algorithm.pipeline();
        let population: SolutionSet = pipeline
            .owned_sets(self.algorithm.population_node())
            .map(|sets| sets.into_iter().flat_map(|s| s.iter().cloned()).collect())
            .unwrap_or_default();

        let evaluated: SolutionSet = population
            .iter()
            .filter(|h| h.read().is_evaluated())
            .cloned()
            .collect();
        let front = RankingPolicy::from_problem(pipeline.problem(), DominanceRelation::Weak)
            .rank_set(&evaluated)
            .into_iter()
            .next()
            .map(|f| f.snapshots())
            .unwrap_or_default();

        let used = pipeline.budget().used();
        RunResult {
            population: population.snapshots(),
            front,
            iterations: pipeline.iteration(),
            evaluations: used,
            stopped_by_budget: pipeline.termination().budget_exhausted(used),
            cancelled: self.cancelled,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{Moead, MoeadConfig, Nsga2, Nsga2Config};
    use crate::model::{ElementSpec, ProblemDefinition};

    fn problem() -> Arc<ProblemDefinition> {
        let problem = ProblemDefinition::new(2)
            .with_decision(vec![ElementSpec::real(0.0, 1.0); 3])
            .with_real_function(|x| {
                let g = 1.0 + x[1] + x[2];
                vec![x[0], g * (1.0 - x[0])]
            });
        Arc::new(problem)
    }

    fn nsga2(config: &Nsga2Config) -> AlgorithmRunner<Nsga2> {
        AlgorithmRunner::new(Nsga2::new(problem(), config).expect("valid"))
    }

    fn objectives(result: &RunResult) -> Vec<Vec<f64>> {
        result.population.iter().map(|s| s.objectives.clone()).collect()
    }

    // ---- Lifecycle ----

    #[test]
    fn test_state_transitions() {
        let config = Nsga2Config::default()
            .with_population_size(8)
            .with_max_iterations(2)
            .with_seed(1);
        let mut runner = nsga2(&config);
        assert_eq!(runner.state(), RunState::Uninitialised);
        assert_eq!(runner.step().expect("runs"), RunState::Running);
        assert_eq!(runner.step().expect("runs"), RunState::Terminated);
        assert_eq!(runner.step().expect("runs"), RunState::Terminated);
        assert_eq!(runner.algorithm().pipeline().iteration(), 2);
    }

    #[test]
    fn test_run_reports_iterations() {
        let config = Nsga2Config::default()
            .with_population_size(8)
            .with_max_iterations(7)
            .with_seed(1);
        let result = nsga2(&config).run().expect("runs");
        assert_eq!(result.iterations, 7);
        assert!(!result.stopped_by_budget);
        assert!(!result.cancelled);
        assert!(result.front.iter().all(|s| s.evaluated));
    }

    #[test]
    fn test_cancel_before_first_generation() {
        let flag = Arc::new(AtomicBool::new(true));
        let config = Nsga2Config::default()
            .with_population_size(8)
            .with_max_iterations(50)
            .with_seed(1);
        let result = nsga2(&config).with_cancel(flag).run().expect("runs");
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
        assert!(result.population.is_empty());
    }

    // ---- Determinism ----

    #[test]
    fn test_same_seed_same_result() {
        let config = Nsga2Config::default()
            .with_population_size(12)
            .with_max_iterations(6)
            .with_seed(42);
        let a = nsga2(&config).run().expect("runs");
        let b = nsga2(&config).run().expect("runs");
        assert_eq!(objectives(&a), objectives(&b));
        assert_eq!(a.evaluations, b.evaluations);
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let config = MoeadConfig::default()
            .with_population_size(10)
            .with_max_iterations(5)
            .with_seed(8);
        let run = |config: &MoeadConfig| {
            AlgorithmRunner::new(Moead::new(problem(), config).expect("valid"))
                .run()
                .expect("runs")
        };
        let single = run(&config);
        let pooled = run(&config.clone().with_evaluation_threads(4));
        assert_eq!(objectives(&single), objectives(&pooled));
    }

    // ---- Front ----

    #[test]
    fn test_front_is_mutually_non_dominated() {
        let config = Nsga2Config::default()
            .with_population_size(16)
            .with_max_iterations(10)
            .with_seed(3);
        let result = nsga2(&config).run().expect("runs");
        let front: Vec<Vec<f64>> = result.front.iter().map(|s| s.objectives.clone()).collect();
        for a in &front {
            for b in &front {
                assert_ne!(
                    DominanceRelation::Weak.compare(a, b),
                    crate::ranking::Dominance::Dominates
                );
            }
        }
    }
}
