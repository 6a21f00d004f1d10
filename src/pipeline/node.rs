//! Node identifiers, operator tags and per-node state.

use std::fmt;

use super::cursor::SetCursor;
use crate::model::tag::{push_unique, Tag};

/// Index of a node in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Key of a solution set in the pipeline's set store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub(crate) usize);

/// How a node's output list is formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputBinding {
    /// Outputs are the sets the node appends and owns.
    #[default]
    Own,
    /// Outputs are upstream sets matching the output tags, modified in
    /// place, followed by any set the node appends itself.
    Adopt,
}

/// Tags that drive a node's binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorTags {
    input: Vec<Tag>,
    output: Vec<Tag>,
    additional: Vec<Tag>,
    pub binding: OutputBinding,
}

impl OperatorTags {
    pub fn new(input: &[Tag], output: &[Tag]) -> Self {
        let mut tags = Self::default();
        tags.define_input_tags(input);
        tags.define_output_tags(output);
        tags
    }

    /// Same as [`OperatorTags::new`] with [`OutputBinding::Adopt`].
    pub fn adopting(input: &[Tag], output: &[Tag]) -> Self {
        Self {
            binding: OutputBinding::Adopt,
            ..Self::new(input, output)
        }
    }

    pub fn with_additional(mut self, additional: &[Tag]) -> Self {
        self.define_additional_output_tags(additional);
        self
    }

    pub fn input(&self) -> &[Tag] {
        &self.input
    }

    pub fn output(&self) -> &[Tag] {
        &self.output
    }

    pub fn additional(&self) -> &[Tag] {
        &self.additional
    }

    /// Output tags followed by additional output tags, deduplicated.
    pub fn all_output(&self) -> Vec<Tag> {
        let mut all = self.output.clone();
        for t in &self.additional {
            push_unique(&mut all, *t);
        }
        all
    }

    // ---- Input ----

    pub fn add_input_tag(&mut self, tag: Tag) {
        push_unique(&mut self.input, tag);
    }

    pub fn remove_input_tag(&mut self, tag: Tag) {
        self.input.retain(|t| *t != tag);
    }

    pub fn clear_input_tags(&mut self) {
        self.input.clear();
    }

    pub fn define_input_tags(&mut self, tags: &[Tag]) {
        define(&mut self.input, tags);
    }

    // ---- Output ----

    pub fn add_output_tag(&mut self, tag: Tag) {
        push_unique(&mut self.output, tag);
    }

    pub fn remove_output_tag(&mut self, tag: Tag) {
        self.output.retain(|t| *t != tag);
    }

    pub fn clear_output_tags(&mut self) {
        self.output.clear();
    }

    pub fn define_output_tags(&mut self, tags: &[Tag]) {
        define(&mut self.output, tags);
    }

    // ---- Additional output ----

    pub fn add_additional_output_tag(&mut self, tag: Tag) {
        push_unique(&mut self.additional, tag);
    }

    pub fn remove_additional_output_tag(&mut self, tag: Tag) {
        self.additional.retain(|t| *t != tag);
    }

    pub fn clear_additional_output_tags(&mut self) {
        self.additional.clear();
    }

    pub fn define_additional_output_tags(&mut self, tags: &[Tag]) {
        define(&mut self.additional, tags);
    }
}

fn define(list: &mut Vec<Tag>, tags: &[Tag]) {
    list.clear();
    for t in tags {
        push_unique(list, *t);
    }
}

/// Per-node bookkeeping held by the pipeline arena.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeState {
    pub(crate) predecessor: Option<NodeId>,
    pub(crate) owned: Vec<SetId>,
    /// Iteration of the last evaluation.
    pub(crate) stamp: Option<u64>,
    pub(crate) tags: OperatorTags,
    pub(crate) input: SetCursor,
    pub(crate) output: SetCursor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lists_are_deduplicated() {
        let mut tags = OperatorTags::new(&[Tag::FOR_EVALUATION, Tag::FOR_EVALUATION], &[]);
        assert_eq!(tags.input(), &[Tag::FOR_EVALUATION]);
        tags.add_input_tag(Tag::FOR_EVALUATION);
        tags.add_input_tag(Tag::FOR_SELECTION);
        assert_eq!(tags.input().len(), 2);
        tags.remove_input_tag(Tag::FOR_EVALUATION);
        assert_eq!(tags.input(), &[Tag::FOR_SELECTION]);
    }

    #[test]
    fn test_all_output_merges_additional() {
        let tags = OperatorTags::new(&[], &[Tag::FITNESS])
            .with_additional(&[Tag::FOR_SELECTION, Tag::FITNESS]);
        assert_eq!(tags.all_output(), vec![Tag::FITNESS, Tag::FOR_SELECTION]);
    }

    #[test]
    fn test_adopting_binding() {
        let tags = OperatorTags::adopting(&[], &[Tag::FOR_RESIZE]);
        assert_eq!(tags.binding, OutputBinding::Adopt);
        assert_eq!(tags.output(), &[Tag::FOR_RESIZE]);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(3).to_string(), "#3");
    }
}
