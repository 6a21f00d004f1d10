//! Data model: decision elements, problems, solutions, tags and sets.
//!
//! - [`ProblemDefinition`]: what is optimised, supplied once per run.
//! - [`Solution`] / [`SolutionHandle`]: one candidate, shared by reference.
//! - [`SolutionSet`]: ordered, tagged collection of handles.
//! - [`Tag`]: interned symbol that binds sets between pipeline stages.

pub mod element;
pub mod problem;
pub mod set;
pub mod solution;
pub mod tag;

pub use element::{Element, ElementKind, ElementSpec};
pub use problem::{Evaluation, ObjectiveFunction, ParameterSpec, ProblemDefinition};
pub use set::{SetSnapshot, SolutionSet};
pub use solution::{Cost, Distribution, Solution, SolutionHandle, SolutionId, SolutionSnapshot};
pub use tag::Tag;
