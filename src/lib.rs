//! Composable multi-objective evolutionary optimization.
//!
//! An algorithm is a linear chain of operators exchanging sets of
//! candidate solutions. Sets carry tags, and each operator declares which
//! tags it consumes and produces, so operators are wired by data rather
//! than by position:
//!
//! - **Model** ([`model`]): solutions with mixed real, integer, ordinal and
//!   nominal variables, shared handles and tagged solution sets.
//! - **Pipeline** ([`pipeline`]): the node arena, tag-based binding and the
//!   pull-based, per-iteration memoised evaluation protocol.
//! - **Operators** ([`operators`]): initialisation, evaluation, fitness,
//!   filtration, crossover, mutation and replacement steps.
//! - **Ranking** ([`ranking`]): Pareto dominance, non-dominated sorting
//!   with feasibility and goal handling, parametric cells and crowding.
//! - **Algorithms** ([`algorithms`]): MOEA/D and NSGA-II compositions and
//!   the runner that drives them.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use u_moea::algorithms::{AlgorithmRunner, Moead, MoeadConfig};
//! use u_moea::model::{ElementSpec, ProblemDefinition};
//!
//! let problem = ProblemDefinition::new(2)
//!     .with_decision(vec![ElementSpec::real(0.0, 1.0); 4])
//!     .with_real_function(|x| {
//!         let g = 1.0 + x[1..].iter().sum::<f64>();
//!         vec![x[0], g * (1.0 - x[0] / g)]
//!     });
//! let config = MoeadConfig::default()
//!     .with_population_size(20)
//!     .with_max_iterations(10)
//!     .with_seed(7);
//!
//! let mut runner = AlgorithmRunner::new(Moead::new(Arc::new(problem), &config)?);
//! let result = runner.run()?;
//! assert_eq!(result.population.len(), 20);
//! # Ok::<(), u_moea::error::PipelineError>(())
//! ```
//!
//! # Features
//!
//! - `parallel` (default): evaluation on a rayon thread pool.
//! - `serde`: serialization of snapshots and configuration enums.

pub mod algorithms;
pub mod error;
pub mod model;
pub mod operators;
pub mod pipeline;
pub mod random;
pub mod ranking;
