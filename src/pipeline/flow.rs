//! The pipeline arena and its evaluation protocol.
//!
//! A [`Pipeline`] is a linear chain of operator nodes stored in a vector;
//! each node refers to its predecessor by index. Solution sets live in a
//! shared store and are owned by the node that appended them.
//!
//! # Evaluation
//!
//! Evaluating a node first pulls its predecessors (root first), skipping
//! every node already evaluated in the current iteration. A node is then
//! re-bound by tag and its operator runs. A second evaluation in the same
//! iteration is memoised and does not invoke the operator again.
//!
//! # Binding
//!
//! For each input tag, in declared order, every set owned by an ancestor
//! (root first, each node's sets in append order) that carries the tag is
//! bound, once. Adopting operators bind their outputs the same way from
//! their output tags and modify those sets in place.

use std::sync::Arc;

use tracing::{debug, warn};

use super::config::{PipelineConfig, Termination};
use super::context::NodeContext;
use super::node::{NodeId, NodeState, OperatorTags, OutputBinding, SetId};
use super::state::{Bookkeeping, Budget};
use super::store::SetStore;
use crate::error::{NodeStatus, PipelineError, PipelineResult};
use crate::model::{ProblemDefinition, SolutionSet, Tag};
use crate::operators::Operator;
use crate::random::RandomContext;

/// Linear chain of operator nodes sharing solution sets.
pub struct Pipeline {
    operators: Vec<Box<dyn Operator>>,
    nodes: Vec<NodeState>,
    store: SetStore,
    problem: Arc<ProblemDefinition>,
    random: RandomContext,
    budget: Budget,
    bookkeeping: Bookkeeping,
    termination: Termination,
    evaluation_threads: usize,
    iteration: u64,
    validated: bool,
    mismatches: usize,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.operators.iter().map(|o| o.name()).collect();
        f.debug_struct("Pipeline")
            .field("operators", &names)
            .field("iteration", &self.iteration)
            .field("sets", &self.store.len())
            .field("budget", &self.budget)
            .field("mismatches", &self.mismatches)
            .finish()
    }
}

impl Pipeline {
    /// Creates an empty pipeline for `problem`.
    ///
    /// Fails when either the configuration or the problem is invalid.
    pub fn new(problem: Arc<ProblemDefinition>, config: &PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        problem.validate()?;
        Ok(Self {
            operators: Vec::new(),
            nodes: Vec::new(),
            store: SetStore::default(),
            problem,
            random: RandomContext::from_seed(config.seed),
            budget: Budget::new(config.termination.max_evaluations),
            bookkeeping: Bookkeeping::default(),
            termination: config.termination,
            evaluation_threads: config.evaluation_threads,
            iteration: 0,
            validated: false,
            mismatches: 0,
        })
    }

    /// Appends an operator after the current last node.
    pub fn push<O: Operator + 'static>(&mut self, operator: O) -> NodeId {
        self.push_boxed(Box::new(operator))
    }

    pub fn push_boxed(&mut self, operator: Box<dyn Operator>) -> NodeId {
        let predecessor = self.nodes.len().checked_sub(1).map(NodeId);
        let state = NodeState {
            predecessor,
            tags: operator.default_tags(),
            ..NodeState::default()
        };
        self.operators.push(operator);
        self.nodes.push(state);
        NodeId(self.nodes.len() - 1)
    }

    // ---- Tags ----

    pub fn tags(&self, id: NodeId) -> PipelineResult<&OperatorTags> {
        self.node(id).map(|n| &n.tags)
    }

    /// Mutable tags of node `id`.
    ///
    /// Rejected with [`PipelineError::TagsLocked`] once the current
    /// iteration has started evaluating; allowed again after
    /// [`Pipeline::increment_iteration`].
    pub fn tags_mut(&mut self, id: NodeId) -> PipelineResult<&mut OperatorTags> {
        self.node(id)?;
        if self.is_locked() {
            return Err(PipelineError::TagsLocked {
                operator: self.operators[id.0].name().to_string(),
            });
        }
        Ok(&mut self.nodes[id.0].tags)
    }

    /// `true` while the current iteration is being evaluated.
    pub fn is_locked(&self) -> bool {
        self.nodes.iter().any(|n| n.stamp == Some(self.iteration))
    }

    // ---- Evaluation ----

    /// Evaluates the last node, pulling its whole chain.
    pub fn evaluate(&mut self) -> PipelineResult<NodeStatus> {
        let last = self
            .nodes
            .len()
            .checked_sub(1)
            .ok_or(PipelineError::EmptyPipeline)?;
        self.evaluate_node(NodeId(last))
    }

    /// Evaluates node `id` after pulling its predecessors.
    pub fn evaluate_node(&mut self, id: NodeId) -> PipelineResult<NodeStatus> {
        self.node(id)?;
        self.validate_once()?;
        let mut status = NodeStatus::Memoized;
        for idx in self.lineage(id.0) {
            status = self.run_node(idx)?;
        }
        Ok(status)
    }

    /// Evaluates node `id` without pulling its predecessors.
    ///
    /// The caller guarantees the predecessors are current.
    pub fn evaluate_only_this_node(&mut self, id: NodeId) -> PipelineResult<NodeStatus> {
        self.node(id)?;
        self.validate_once()?;
        self.run_node(id.0)
    }

    /// Advances the shared iteration counter.
    pub fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// `true` once the iteration limit or the evaluation budget is reached.
    pub fn is_terminate(&self) -> bool {
        self.termination.is_reached(self.iteration, self.budget.used())
    }

    // ---- Inspection ----

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn problem(&self) -> &ProblemDefinition {
        &self.problem
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn bookkeeping(&self) -> &Bookkeeping {
        &self.bookkeeping
    }

    /// Number of node evaluations skipped because of a data mismatch.
    pub fn mismatch_count(&self) -> usize {
        self.mismatches
    }

    pub fn operator_name(&self, id: NodeId) -> PipelineResult<&str> {
        self.node(id)?;
        Ok(self.operators[id.0].name())
    }

    /// Sets owned by node `id`, in append order.
    pub fn owned_sets(&self, id: NodeId) -> PipelineResult<Vec<&SolutionSet>> {
        let node = self.node(id)?;
        Ok(node.owned.iter().filter_map(|s| self.store.get(*s)).collect())
    }

    /// Node owning set `id`, if the set is live.
    pub fn set_owner(&self, id: SetId) -> Option<NodeId> {
        self.store.entry(id).map(|e| e.owner)
    }

    /// The output list node `id` was bound to in its last evaluation.
    pub fn output_sets(&self, id: NodeId) -> PipelineResult<Vec<&SolutionSet>> {
        let node = self.node(id)?;
        Ok(node
            .output
            .ids()
            .iter()
            .filter_map(|s| self.store.get(*s))
            .collect())
    }

    /// Every live set carrying `tag`, root first.
    pub fn sets_with_tag(&self, tag: Tag) -> Vec<&SolutionSet> {
        self.nodes
            .iter()
            .flat_map(|n| n.owned.iter())
            .filter_map(|s| self.store.get(*s))
            .filter(|s| s.has_tag(tag))
            .collect()
    }

    // ---- Internals ----

    fn node(&self, id: NodeId) -> PipelineResult<&NodeState> {
        self.nodes.get(id.0).ok_or(PipelineError::UnknownNode(id))
    }

    fn validate_once(&mut self) -> PipelineResult<()> {
        if self.validated {
            return Ok(());
        }
        for op in &self.operators {
            op.validate(&self.problem)?;
        }
        self.validated = true;
        Ok(())
    }

    /// Node `idx` and its ancestors, root first.
    fn lineage(&self, idx: usize) -> Vec<usize> {
        let mut chain = vec![idx];
        let mut cursor = self.nodes[idx].predecessor;
        while let Some(p) = cursor {
            chain.push(p.0);
            cursor = self.nodes[p.0].predecessor;
        }
        chain.reverse();
        chain
    }

    fn resolve(&self, ancestors: &[usize], tags: &[Tag]) -> Vec<SetId> {
        let mut bound = Vec::new();
        for tag in tags {
            for &a in ancestors {
                for &sid in &self.nodes[a].owned {
                    let matches = self.store.get(sid).is_some_and(|s| s.has_tag(*tag));
                    if matches && !bound.contains(&sid) {
                        bound.push(sid);
                    }
                }
            }
        }
        bound
    }

    fn bind(&mut self, idx: usize) {
        let mut ancestors = self.lineage(idx);
        ancestors.pop();

        let tags = self.nodes[idx].tags.clone();
        let input = self.resolve(&ancestors, tags.input());
        let owned = self.nodes[idx].owned.clone();
        let output = match tags.binding {
            OutputBinding::Own => owned,
            OutputBinding::Adopt => {
                let mut adopted = self.resolve(&ancestors, tags.output());
                let extra: Vec<SetId> = owned.into_iter().filter(|o| !adopted.contains(o)).collect();
                adopted.extend(extra);
                adopted
            }
        };

        for sid in &output {
            if let Some(set) = self.store.get_mut(*sid) {
                for t in tags.additional() {
                    set.add_tag(*t);
                }
            }
        }

        let node = &mut self.nodes[idx];
        node.input.rebind(input);
        node.output.rebind(output);
    }

    fn run_node(&mut self, idx: usize) -> PipelineResult<NodeStatus> {
        let iteration = self.iteration;
        if self.nodes[idx].stamp == Some(iteration) {
            return Ok(NodeStatus::Memoized);
        }
        self.bind(idx);

        let Self {
            operators,
            nodes,
            store,
            problem,
            random,
            budget,
            bookkeeping,
            evaluation_threads,
            mismatches,
            ..
        } = self;
        let operator = &mut operators[idx];
        let mut ctx = NodeContext {
            id: NodeId(idx),
            iteration,
            state: &mut nodes[idx],
            store,
            problem: &**problem,
            random,
            budget,
            bookkeeping,
            evaluation_threads: *evaluation_threads,
        };
        let status = operator.evaluate_node(&mut ctx)?;
        nodes[idx].stamp = Some(iteration);

        match status {
            NodeStatus::Skipped(mismatch) => {
                *mismatches += 1;
                warn!(
                    node = %NodeId(idx),
                    operator = operator.name(),
                    iteration,
                    %mismatch,
                    "operator skipped"
                );
            }
            _ => debug!(node = %NodeId(idx), operator = operator.name(), iteration, "node evaluated"),
        }
        Ok(status)
    }
}
