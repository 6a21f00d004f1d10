//! NSGA-II: elitist non-dominated sorting.
//!
//! Each generation breeds one offspring per parent by binary tournament on
//! rank, SBX and polynomial mutation, then merges parents and offspring,
//! ranks the union into fronts and keeps the best fronts, breaking the last
//! tie by crowding distance.
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic
//!   Algorithm: NSGA-II"

use std::sync::Arc;

use super::Algorithm;
use crate::error::{ConfigErrorKind, PipelineError, PipelineResult};
use crate::model::ProblemDefinition;
use crate::operators::{
    CategoricalPerturbation, Evaluator, MergeSets, NonDominanceRanking, NsgaIIEliteSelection,
    PolynomialMutation, RandomInit, SbxCrossover, TournamentFiltrationForDirection,
};
use crate::pipeline::{NodeId, Pipeline, PipelineConfig};
use crate::ranking::DominanceRelation;

/// Configuration for [`Nsga2`].
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `population_size` | 100 |
/// | `tournament_size` | 2 |
/// | `crossover_probability` | 0.9 |
/// | `crossover_distribution_index` | 15.0 |
/// | `mutation_probability` | 0.1 (per variable) |
/// | `mutation_distribution_index` | 20.0 |
/// | `relation` | `Weak` |
///
/// # Builder Pattern
///
/// ```
/// use u_moea::algorithms::Nsga2Config;
///
/// let config = Nsga2Config::default()
///     .with_population_size(40)
///     .with_tournament_size(3)
///     .with_max_evaluations(5_000)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Nsga2Config {
    pub population_size: usize,

    /// Candidates drawn per tournament (at least 1).
    pub tournament_size: usize,

    pub crossover_probability: f64,
    pub crossover_variable_probability: f64,
    pub crossover_distribution_index: f64,

    /// Per-variable mutation probability.
    pub mutation_probability: f64,
    pub mutation_distribution_index: f64,

    pub relation: DominanceRelation,

    /// Parametric ranking bins per external parameter, if any.
    pub parametric_bins: Option<usize>,

    pub pipeline: PipelineConfig,
}

impl Default for Nsga2Config {
    fn default() -> Self {
        Self {
            population_size: 100,
            tournament_size: 2,
            crossover_probability: 0.9,
            crossover_variable_probability: 0.5,
            crossover_distribution_index: 15.0,
            mutation_probability: 0.1,
            mutation_distribution_index: 20.0,
            relation: DominanceRelation::default(),
            parametric_bins: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Nsga2Config {
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_tournament_size(mut self, k: usize) -> Self {
        self.tournament_size = k.max(1);
        self
    }

    pub fn with_crossover_probability(mut self, p: f64) -> Self {
        self.crossover_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_crossover_distribution_index(mut self, eta: f64) -> Self {
        self.crossover_distribution_index = eta;
        self
    }

    pub fn with_mutation_probability(mut self, p: f64) -> Self {
        self.mutation_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_mutation_distribution_index(mut self, eta: f64) -> Self {
        self.mutation_distribution_index = eta;
        self
    }

    pub fn with_relation(mut self, relation: DominanceRelation) -> Self {
        self.relation = relation;
        self
    }

    pub fn with_parametric_bins(mut self, bins: usize) -> Self {
        self.parametric_bins = Some(bins.max(1));
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_max_iterations(mut self, n: u64) -> Self {
        self.pipeline = self.pipeline.with_max_iterations(n);
        self
    }

    pub fn with_max_evaluations(mut self, n: usize) -> Self {
        self.pipeline = self.pipeline.with_max_evaluations(n);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.pipeline = self.pipeline.with_seed(seed);
        self
    }

    pub fn with_evaluation_threads(mut self, n: usize) -> Self {
        self.pipeline = self.pipeline.with_evaluation_threads(n);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.population_size < 2 {
            return Err(PipelineError::config(
                "Nsga2Config",
                ConfigErrorKind::InvalidParameter {
                    name: "population_size",
                    reason: "must be at least 2".into(),
                },
            ));
        }
        self.pipeline.validate()
    }
}

/// The NSGA-II composition.
#[derive(Debug)]
pub struct Nsga2 {
    pipeline: Pipeline,
    population: NodeId,
}

impl Nsga2 {
    pub fn new(problem: Arc<ProblemDefinition>, config: &Nsga2Config) -> PipelineResult<Self> {
        config.validate()?;
        let n = config.population_size;
        let mut pipeline = Pipeline::new(problem, &config.pipeline)?;

        let population = pipeline.push(RandomInit::new(n));
        pipeline.push(Evaluator::new());
        pipeline.push(
            TournamentFiltrationForDirection::new()
                .with_tournament_size(config.tournament_size)
                .with_set_size(2)
                .with_set_count(n.div_ceil(2)),
        );
        pipeline.push(
            SbxCrossover::new()
                .with_distribution_index(config.crossover_distribution_index)
                .with_solution_probability(config.crossover_probability)
                .with_variable_probability(config.crossover_variable_probability),
        );
        pipeline.push(
            PolynomialMutation::new()
                .with_distribution_index(config.mutation_distribution_index)
                .with_variable_probability(config.mutation_probability),
        );
        pipeline.push(CategoricalPerturbation::new().with_variable_probability(config.mutation_probability));
        pipeline.push(Evaluator::new());
        pipeline.push(MergeSets::new());

        let ranking = NonDominanceRanking::new().with_relation(config.relation);
        pipeline.push(match config.parametric_bins {
            Some(bins) => ranking.with_parametric_bins(bins),
            None => ranking,
        });
        pipeline.push(NsgaIIEliteSelection::new().with_population_size(n));

        Ok(Self {
            pipeline,
            population,
        })
    }
}

impl Algorithm for Nsga2 {
    fn name(&self) -> &str {
        "NSGA-II"
    }

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    fn population_node(&self) -> NodeId {
        self.population
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::AlgorithmRunner;
    use crate::model::{ElementSpec, ParameterSpec};

    /// Schaffer's problem: front at `x in [0, 2]`.
    fn schaffer() -> Arc<ProblemDefinition> {
        let problem = ProblemDefinition::new(2)
            .with_decision(vec![ElementSpec::real(-10.0, 10.0)])
            .with_real_function(|x| vec![x[0] * x[0], (x[0] - 2.0) * (x[0] - 2.0)]);
        Arc::new(problem)
    }

    fn run(config: &Nsga2Config) -> crate::algorithms::RunResult {
        let mut runner = AlgorithmRunner::new(Nsga2::new(schaffer(), config).expect("valid"));
        runner.run().expect("runs")
    }

    // ---- Config ----

    #[test]
    fn test_default_config() {
        let config = Nsga2Config::default();
        assert_eq!(config.population_size, 100);
        assert_eq!(config.tournament_size, 2);
        assert_eq!(config.relation, DominanceRelation::Weak);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tournament_size_clamped() {
        assert_eq!(Nsga2Config::default().with_tournament_size(0).tournament_size, 1);
    }

    #[test]
    fn test_small_population_rejected() {
        assert!(Nsga2Config::default().with_population_size(1).validate().is_err());
        assert!(Nsga2::new(schaffer(), &Nsga2Config::default().with_population_size(0)).is_err());
    }

    // ---- Runs ----

    #[test]
    fn test_population_size_is_stable() {
        let config = Nsga2Config::default()
            .with_population_size(21)
            .with_max_iterations(5)
            .with_seed(3);
        let result = run(&config);
        assert_eq!(result.population.len(), 21);
        assert_eq!(result.iterations, 5);
    }

    #[test]
    fn test_converges_on_schaffer() {
        let config = Nsga2Config::default()
            .with_population_size(40)
            .with_max_iterations(40)
            .with_seed(5);
        let result = run(&config);
        assert!(!result.front.is_empty());
        let on_front = result
            .front
            .iter()
            .filter(|s| (-0.1..=2.1).contains(&s.decision[0].as_f64()))
            .count();
        assert!(on_front * 10 >= result.front.len() * 9, "{on_front} of {}", result.front.len());
    }

    #[test]
    fn test_budget_stops_run() {
        let config = Nsga2Config::default()
            .with_population_size(10)
            .with_max_iterations(1_000)
            .with_max_evaluations(45)
            .with_seed(9);
        let result = run(&config);
        assert!(result.stopped_by_budget);
        assert_eq!(result.evaluations, 45);
        assert!(result.iterations < 1_000);
    }

    #[test]
    fn test_parametric_ranking_runs() {
        let problem = ProblemDefinition::new(2)
            .with_decision(vec![ElementSpec::real(-10.0, 10.0)])
            .with_parameters(vec![ParameterSpec::external(0.0, 1.0)])
            .with_real_function(|x| vec![x[0] * x[0], (x[0] - 2.0) * (x[0] - 2.0)]);
        let config = Nsga2Config::default()
            .with_population_size(12)
            .with_parametric_bins(2)
            .with_max_iterations(3)
            .with_seed(1);
        let mut runner = AlgorithmRunner::new(Nsga2::new(Arc::new(problem), &config).expect("valid"));
        let result = runner.run().expect("runs");
        assert_eq!(result.population.len(), 12);
    }
}
