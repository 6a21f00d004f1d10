//! MOEA/D: multi-objective evolution by decomposition.
//!
//! The population is one solution per weight vector. Each generation every
//! sub-problem draws parents from its neighbourhood, produces one mutated
//! child and offers it to its neighbours, which keep it when it improves
//! their scalarised cost.
//!
//! # References
//!
//! - Zhang & Li (2007), "MOEA/D: A Multiobjective Evolutionary Algorithm
//!   Based on Decomposition"

use std::sync::Arc;

use super::Algorithm;
use crate::error::{ConfigErrorKind, PipelineError, PipelineResult};
use crate::model::{ProblemDefinition, Tag};
use crate::operators::filtration::NeighbourhoodCriterion;
use crate::operators::initialisation::{lattice_size, points_for_population};
use crate::operators::{
    CategoricalPerturbation, DistanceMeasure, Evaluator, MoeadNeighbourhoodUpdate,
    NeighbourhoodFiltration, PolynomialMutation, RandFiltrationForDirection, SbxCrossover,
    ScalarisationType, Scalarization, TruncateSets, WeightVectorInit,
};
use crate::pipeline::{NodeId, Pipeline, PipelineConfig};

/// Configuration for [`Moead`].
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `population_size` | 100 |
/// | `neighbourhood` | `Size(5)` |
/// | `scalarisation` | `WeightedSum` |
/// | `max_replacements` | 2 |
/// | `crossover_probability` | 0.9 |
/// | `crossover_distribution_index` | 15.0 |
/// | `mutation_probability` | 0.1 (per variable) |
/// | `mutation_distribution_index` | 20.0 |
///
/// # Builder Pattern
///
/// ```
/// use u_moea::algorithms::MoeadConfig;
/// use u_moea::operators::ScalarisationType;
///
/// let config = MoeadConfig::default()
///     .with_population_size(50)
///     .with_neighbourhood_size(10)
///     .with_scalarisation(ScalarisationType::WeightedChebyshev)
///     .with_max_iterations(200)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct MoeadConfig {
    /// Requested population size.
    ///
    /// The actual size is the number of simplex-lattice weight vectors for
    /// the smallest lattice holding at least this many points.
    pub population_size: usize,

    /// Explicit lattice resolution; overrides `population_size`.
    pub points_per_dimension: Option<usize>,

    pub neighbourhood: NeighbourhoodCriterion,
    pub distance: DistanceMeasure,
    pub scalarisation: ScalarisationType,

    /// Maximum neighbours a single child may replace.
    pub max_replacements: usize,

    /// Use generalised-decomposition weights in the replacement step.
    pub generalised_decomposition: bool,

    pub crossover_probability: f64,
    pub crossover_variable_probability: f64,
    pub crossover_distribution_index: f64,

    /// Per-variable mutation probability.
    pub mutation_probability: f64,
    pub mutation_distribution_index: f64,

    /// Termination, seed and evaluation threads.
    pub pipeline: PipelineConfig,
}

impl Default for MoeadConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            points_per_dimension: None,
            neighbourhood: NeighbourhoodCriterion::default(),
            distance: DistanceMeasure::default(),
            scalarisation: ScalarisationType::default(),
            max_replacements: 2,
            generalised_decomposition: false,
            crossover_probability: 0.9,
            crossover_variable_probability: 0.5,
            crossover_distribution_index: 15.0,
            mutation_probability: 0.1,
            mutation_distribution_index: 20.0,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl MoeadConfig {
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_points_per_dimension(mut self, h: usize) -> Self {
        self.points_per_dimension = Some(h.max(1));
        self
    }

    /// Neighbourhoods of the `n` closest weight vectors.
    pub fn with_neighbourhood_size(mut self, n: usize) -> Self {
        self.neighbourhood = NeighbourhoodCriterion::Size(n);
        self
    }

    pub fn with_neighbourhood(mut self, criterion: NeighbourhoodCriterion) -> Self {
        self.neighbourhood = criterion;
        self
    }

    pub fn with_distance(mut self, distance: DistanceMeasure) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_scalarisation(mut self, scalarisation: ScalarisationType) -> Self {
        self.scalarisation = scalarisation;
        self
    }

    pub fn with_max_replacements(mut self, n: usize) -> Self {
        self.max_replacements = n;
        self
    }

    pub fn with_generalised_decomposition(mut self, enabled: bool) -> Self {
        self.generalised_decomposition = enabled;
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

    /// Lattice resolution for `objective_count` objectives.
    pub fn lattice_resolution(&self, objective_count: usize) -> usize {
        self.points_per_dimension
            .unwrap_or_else(|| points_for_population(self.population_size, objective_count))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |name, reason: &str| {
            Err(PipelineError::config(
                "MoeadConfig",
                ConfigErrorKind::InvalidParameter {
                    name,
                    reason: reason.into(),
                },
            ))
        };
        if self.population_size < 2 && self.points_per_dimension.is_none() {
            return invalid("population_size", "must be at least 2");
        }
        if self.max_replacements == 0 {
            return invalid("max_replacements", "must be at least 1");
        }
        match self.neighbourhood {
            NeighbourhoodCriterion::Size(0) => {
                return invalid("neighbourhood", "size must be at least 1")
            }
            NeighbourhoodCriterion::Radius(r) if !(r > 0.0) => {
                return invalid("neighbourhood", "radius must be positive")
            }
            _ => {}
        }
        self.pipeline.validate()
    }
}

/// The MOEA/D composition.
///
/// Built once from a problem and a [`MoeadConfig`]; drive it with
/// [`AlgorithmRunner`](super::AlgorithmRunner).
///
/// The chain, in order: weight-vector initialisation, evaluation,
/// scalarisation, neighbourhood filtration, random parent selection from
/// each neighbourhood, SBX crossover, truncation to one child, polynomial
/// mutation, categorical perturbation, evaluation, neighbourhood
/// replacement. Initialisation and neighbourhood construction only run in
/// the first generation.
///
/// Neighbourhood replacement sits at the tail of the chain, after the
/// children are evaluated, not directly after neighbourhood filtration.
/// Replacement needs evaluated children, so placing it earlier would
/// only defer each update by one generation.
#[derive(Debug)]
pub struct Moead {
    pipeline: Pipeline,
    population: NodeId,
}

impl Moead {
    pub fn new(problem: Arc<ProblemDefinition>, config: &MoeadConfig) -> PipelineResult<Self> {
        config.validate()?;
        let m = problem.objective_count;
        let h = config.lattice_resolution(m);
        let mut pipeline = Pipeline::new(problem, &config.pipeline)?;

        let population = pipeline.push(
            WeightVectorInit::new(lattice_size(m, h)).with_points_per_dimension(h),
        );
        pipeline
            .tags_mut(population)?
            .add_additional_output_tag(Tag::FOR_NEIGHBOURHOODS);

        pipeline.push(Evaluator::new());
        pipeline.push(Scalarization::new(config.scalarisation).with_normalisation(true));
        pipeline.push(NeighbourhoodFiltration::new(config.neighbourhood).with_distance(config.distance));
        pipeline.push(RandFiltrationForDirection::new());

        let crossover = pipeline.push(
            SbxCrossover::new()
                .with_distribution_index(config.crossover_distribution_index)
                .with_solution_probability(config.crossover_probability)
                .with_variable_probability(config.crossover_variable_probability),
        );
        {
            let tags = pipeline.tags_mut(crossover)?;
            tags.add_additional_output_tag(Tag::FOR_RESIZE);
            tags.add_additional_output_tag(Tag::FOR_MOEAD_UPDATE);
        }

        pipeline.push(TruncateSets::new(1));
        pipeline.push(
            PolynomialMutation::new()
                .with_distribution_index(config.mutation_distribution_index)
                .with_variable_probability(config.mutation_probability),
        );
        pipeline.push(CategoricalPerturbation::new().with_variable_probability(config.mutation_probability));
        pipeline.push(Evaluator::new());
        pipeline.push(
            MoeadNeighbourhoodUpdate::new(config.scalarisation)
                .with_max_replacements(config.max_replacements)
                .with_generalised_decomposition(config.generalised_decomposition),
        );

        Ok(Self {
            pipeline,
            population,
        })
    }
}

impl Algorithm for Moead {
    fn name(&self) -> &str {
        "MOEA/D"
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
