//! The view of the pipeline an operator gets while it runs.
//!
//! [`NodeContext`] exposes the node's bound input and output sets, the
//! output-set lifecycle, and run-wide state: problem, randomness, budget and
//! ideal / anti-ideal bookkeeping. Sets are addressed by [`SetId`]; a node
//! may read and modify the members of any set bound to it, but only remove
//! the sets it owns.

use rand::rngs::StdRng;

use super::node::{NodeId, NodeState, SetId};
use super::state::{Bookkeeping, Budget};
use super::store::SetStore;
use crate::model::{ProblemDefinition, SolutionSet};
use crate::random::RandomContext;

/// Operator-facing handle on the running node.
pub struct NodeContext<'a> {
    pub(crate) id: NodeId,
    pub(crate) iteration: u64,
    pub(crate) state: &'a mut NodeState,
    pub(crate) store: &'a mut SetStore,
    pub(crate) problem: &'a ProblemDefinition,
    pub(crate) random: &'a mut RandomContext,
    pub(crate) budget: &'a mut Budget,
    pub(crate) bookkeeping: &'a mut Bookkeeping,
    pub(crate) evaluation_threads: usize,
}

impl<'a> NodeContext<'a> {
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// Current iteration of the pipeline.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn problem(&self) -> &'a ProblemDefinition {
        self.problem
    }

    pub fn random(&mut self) -> &mut RandomContext {
        &mut *self.random
    }

    pub fn rng(&mut self) -> &mut StdRng {
        self.random.rng()
    }

    pub fn budget(&mut self) -> &mut Budget {
        &mut *self.budget
    }

    pub fn bookkeeping(&mut self) -> &mut Bookkeeping {
        &mut *self.bookkeeping
    }

    pub fn evaluation_threads(&self) -> usize {
        self.evaluation_threads
    }

    // ---- Input traversal ----

    /// Ids of every bound input set, in binding order.
    pub fn input_sets(&self) -> Vec<SetId> {
        self.state.input.ids().to_vec()
    }

    pub fn input_set_count(&self) -> usize {
        self.state.input.len()
    }

    pub fn has_next_input_set(&self) -> bool {
        self.state.input.has_next()
    }

    /// Advances the input cursor. On the last set it returns that set again.
    pub fn next_input_set(&mut self) -> Option<SetId> {
        self.state.input.next()
    }

    /// The next input set without advancing, or `None` at the end.
    pub fn peek_next_input_set(&self) -> Option<SetId> {
        self.state.input.peek()
    }

    pub fn reset_input_set_iterator(&mut self) {
        self.state.input.reset();
    }

    pub fn current_input_set(&self) -> Option<SetId> {
        self.state.input.current()
    }

    /// Input set at position `idx`.
    pub fn input_set(&self, idx: usize) -> Option<&SolutionSet> {
        self.state.input.get(idx).and_then(|id| self.store.get(id))
    }

    // ---- Output traversal ----

    pub fn output_sets(&self) -> Vec<SetId> {
        self.state.output.ids().to_vec()
    }

    pub fn output_set_count(&self) -> usize {
        self.state.output.len()
    }

    pub fn has_next_output_set(&self) -> bool {
        self.state.output.has_next()
    }

    /// Advances the output cursor. On the last set it returns that set again.
    pub fn next_output_set(&mut self) -> Option<SetId> {
        self.state.output.next()
    }

    pub fn peek_next_output_set(&self) -> Option<SetId> {
        self.state.output.peek()
    }

    pub fn reset_output_set_iterator(&mut self) {
        self.state.output.reset();
    }

    pub fn current_output_set(&self) -> Option<SetId> {
        self.state.output.current()
    }

    pub fn output_set(&self, idx: usize) -> Option<&SolutionSet> {
        self.state.output.get(idx).and_then(|id| self.store.get(id))
    }

    // ---- Set access ----

    /// Read access to any live set.
    pub fn set(&self, id: SetId) -> Option<&SolutionSet> {
        self.store.get(id)
    }

    /// Write access to a set bound to, or owned by, this node.
    pub fn set_mut(&mut self, id: SetId) -> Option<&mut SolutionSet> {
        let visible = self.state.input.ids().contains(&id)
            || self.state.output.ids().contains(&id)
            || self.state.owned.contains(&id);
        if visible {
            self.store.get_mut(id)
        } else {
            None
        }
    }

    /// The current output set, for appending results.
    pub fn current_output_set_mut(&mut self) -> Option<&mut SolutionSet> {
        let id = self.state.output.current()?;
        self.store.get_mut(id)
    }

    // ---- Output lifecycle ----

    /// Sets owned by this node, in append order.
    pub fn owned_sets(&self) -> &[SetId] {
        &self.state.owned
    }

    /// Appends a new, empty output set carrying the node's output and
    /// additional tags. It becomes the current output set.
    pub fn append_output_set(&mut self) -> SetId {
        self.append_existing_output_set(SolutionSet::new())
    }

    /// Takes ownership of `set` as a new output set; its tags are replaced
    /// by the node's output and additional tags.
    pub fn append_existing_output_set(&mut self, mut set: SolutionSet) -> SetId {
        set.define_tags(&self.state.tags.all_output());
        let id = self.store.insert(self.id, set);
        self.state.owned.push(id);
        self.state.output.push(id);
        id
    }

    /// Removes and drops output set `idx` if this node owns it.
    pub fn remove_output_set(&mut self, idx: usize) -> bool {
        match self.state.output.get(idx) {
            Some(id) if self.state.owned.contains(&id) => {
                self.drop_owned(id);
                true
            }
            _ => false,
        }
    }

    /// Drops every owned set that is not persistent.
    pub fn clear_output_sets(&mut self) {
        let owned = std::mem::take(&mut self.state.owned);
        for id in owned {
            let persistent = self.store.entry(id).is_some_and(|e| e.persistent);
            if persistent {
                self.state.owned.push(id);
            } else {
                self.store.remove(id);
                self.state.output.remove(id);
            }
        }
    }

    /// Keeps an owned set alive across [`NodeContext::clear_output_sets`].
    pub fn mark_persistent(&mut self, id: SetId) -> bool {
        match self.store.entry_mut(id) {
            Some(entry) if entry.owner == self.id => {
                entry.persistent = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_persistent(&self, id: SetId) -> bool {
        self.store.entry(id).is_some_and(|e| e.persistent)
    }

    fn drop_owned(&mut self, id: SetId) {
        self.store.remove(id);
        self.state.owned.retain(|o| *o != id);
        self.state.output.remove(id);
    }
}
