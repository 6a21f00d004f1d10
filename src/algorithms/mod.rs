//! Ready-made algorithm compositions.
//!
//! Each composition builds one operator pipeline from a problem and a
//! configuration; [`AlgorithmRunner`] then drives it generation by
//! generation.
//!
//! - [`Moead`]: decomposition with weight vectors and neighbourhoods
//! - [`Nsga2`]: non-dominated sorting with crowding-distance elitism

pub mod moead;
pub mod nsga2;
pub mod runner;

pub use moead::{Moead, MoeadConfig};
pub use nsga2::{Nsga2, Nsga2Config};
pub use runner::{AlgorithmRunner, RunResult, RunState};

use crate::pipeline::{NodeId, Pipeline};

/// A composed algorithm: a pipeline plus the node owning its population.
pub trait Algorithm {
    fn name(&self) -> &str;

    fn pipeline(&self) -> &Pipeline;

    fn pipeline_mut(&mut self) -> &mut Pipeline;

    /// Node whose owned sets hold the main population.
    fn population_node(&self) -> NodeId;
}
