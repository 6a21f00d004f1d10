//! Ranking engine.
//!
//! Stateless algorithms over objective and constraint vectors:
//!
//! - [`dominance`]: weak, strong and epsilon Pareto dominance
//! - [`sort`]: non-dominated sorting into ranked fronts
//! - [`constraints`]: feasibility and normalised violation scores
//! - [`preferability`]: goal-vector clipping
//! - [`parametric`]: cell ids over external parameters
//! - [`crowding`]: crowding distance for diversity
//! - [`policy`]: the combined policy applied to solution sets
//!
//! All objectives are minimised.

pub mod constraints;
pub mod crowding;
pub mod dominance;
pub mod parametric;
pub mod policy;
pub mod preferability;
pub mod sort;

pub use constraints::{is_feasible, violation_scores};
pub use crowding::{crowding_distance, crowding_order};
pub use dominance::{epsilon_dominance, strong_dominance, weak_dominance, Dominance, DominanceRelation};
pub use parametric::cell_id;
pub use policy::{ParametricCells, RankItem, RankingPolicy};
pub use preferability::{clip_to_goals, preferability};
pub use sort::{
    dominance_count, non_dominated_set, non_dominated_sort, non_dominated_sort_with,
    sort_by_relation, NondominatedSortResult,
};
