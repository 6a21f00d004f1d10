//! Pipeline dataflow engine.
//!
//! A pipeline is a linear chain of operator nodes. Nodes exchange solution
//! sets by tag: a node's inputs are the upstream sets carrying its input
//! tags, re-resolved on every evaluation. Evaluation is pull-based and
//! memoised per iteration.
//!
//! - [`Pipeline`]: the arena of nodes and sets, and the evaluation protocol
//! - [`NodeContext`]: what an operator sees while it runs
//! - [`PipelineConfig`] / [`Termination`]: run-wide settings

pub mod config;
pub mod context;
pub mod cursor;
pub mod flow;
pub mod node;
pub mod state;
mod store;

pub use config::{PipelineConfig, Termination};
pub use context::NodeContext;
pub use cursor::SetCursor;
pub use flow::Pipeline;
pub use node::{NodeId, OperatorTags, OutputBinding, SetId};
pub use state::{Bookkeeping, Budget};
