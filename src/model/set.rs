//! Ordered, tagged collections of shared solutions.

use std::sync::Arc;

use super::solution::{SolutionHandle, SolutionSnapshot};
use super::tag::{push_unique, Tag};

/// Ordered sequence of solution handles plus a duplicate-free tag list.
///
/// Insertion order is significant: ranking breaks ties by it.
#[derive(Debug, Clone, Default)]
pub struct SolutionSet {
    members: Vec<SolutionHandle>,
    tags: Vec<Tag>,
}

impl SolutionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty set carrying `tags`.
    pub fn with_tags(tags: &[Tag]) -> Self {
        let mut set = Self::new();
        set.define_tags(tags);
        set
    }

    pub fn from_handles(members: Vec<SolutionHandle>) -> Self {
        Self {
            members,
            tags: Vec::new(),
        }
    }

    // ---- Members ----

    pub fn append(&mut self, solution: SolutionHandle) {
        self.members.push(solution);
    }

    /// Appends every member of `other` by reference. Duplicates are kept.
    pub fn append_set(&mut self, other: &SolutionSet) {
        self.members.extend(other.members.iter().cloned());
    }

    /// Removes and returns member `idx`, or `None` when out of range.
    pub fn remove(&mut self, idx: usize) -> Option<SolutionHandle> {
        (idx < self.members.len()).then(|| self.members.remove(idx))
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&SolutionHandle> {
        self.members.get(idx)
    }

    /// Replaces member `idx`. Returns `false` when out of range.
    pub fn replace(&mut self, idx: usize, solution: SolutionHandle) -> bool {
        match self.members.get_mut(idx) {
            Some(slot) => {
                *slot = solution;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SolutionHandle> {
        self.members.iter()
    }

    /// Keeps the first `len` members.
    pub fn truncate(&mut self, len: usize) {
        self.members.truncate(len);
    }

    /// A restartable view over the current members.
    pub fn all(&self) -> SetSnapshot {
        SetSnapshot(self.members.iter().cloned().collect())
    }

    /// `true` if `solution` is referenced by this set.
    pub fn contains(&self, solution: &SolutionHandle) -> bool {
        self.members.iter().any(|m| m.ptr_eq(solution))
    }

    /// Objective vectors of all members, in order.
    pub fn objective_matrix(&self) -> Vec<Vec<f64>> {
        self.members
            .iter()
            .map(|m| m.read().objectives().to_vec())
            .collect()
    }

    pub fn snapshots(&self) -> Vec<SolutionSnapshot> {
        self.members.iter().map(SolutionHandle::snapshot).collect()
    }

    // ---- Tags ----

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn add_tag(&mut self, tag: Tag) {
        push_unique(&mut self.tags, tag);
    }

    pub fn remove_tag(&mut self, tag: Tag) {
        self.tags.retain(|t| *t != tag);
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn clear_tags(&mut self) {
        self.tags.clear();
    }

    /// Replaces the tag list, dropping duplicates.
    pub fn define_tags(&mut self, tags: &[Tag]) {
        self.tags.clear();
        for t in tags {
            push_unique(&mut self.tags, *t);
        }
    }
}

impl<'a> IntoIterator for &'a SolutionSet {
    type Item = &'a SolutionHandle;
    type IntoIter = std::slice::Iter<'a, SolutionHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

impl FromIterator<SolutionHandle> for SolutionSet {
    fn from_iter<T: IntoIterator<Item = SolutionHandle>>(iter: T) -> Self {
        Self::from_handles(iter.into_iter().collect())
    }
}

/// Immutable, cheaply clonable view of a set's members at one moment.
///
/// Can be iterated any number of times; later changes to the set are not
/// reflected.
#[derive(Debug, Clone)]
pub struct SetSnapshot(Arc<[SolutionHandle]>);

impl SetSnapshot {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SolutionHandle> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a SetSnapshot {
    type Item = &'a SolutionHandle;
    type IntoIter = std::slice::Iter<'a, SolutionHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::solution::Solution;

    fn handle(a: f64, b: f64) -> SolutionHandle {
        SolutionHandle::new(Solution::with_objectives(vec![a, b]))
    }

    #[test]
    fn test_append_and_remove() {
        let mut set = SolutionSet::new();
        set.append(handle(1.0, 2.0));
        set.append(handle(3.0, 4.0));
        assert_eq!(set.len(), 2);
        let removed = set.remove(0);
        assert!(removed.is_some());
        assert_eq!(set.len(), 1);
        assert!(set.remove(5).is_none());
    }

    #[test]
    fn test_append_set_is_union_by_reference() {
        let h = handle(1.0, 1.0);
        let mut a = SolutionSet::from_handles(vec![h.clone()]);
        let b = SolutionSet::from_handles(vec![h.clone(), handle(2.0, 2.0)]);
        a.append_set(&b);
        assert_eq!(a.len(), 3);
        assert!(a.get(1).is_some_and(|m| m.ptr_eq(&h)));
    }

    #[test]
    fn test_snapshot_is_restartable_and_detached() {
        let mut set = SolutionSet::from_handles(vec![handle(1.0, 1.0), handle(2.0, 2.0)]);
        let snap = set.all();
        assert_eq!(snap.iter().count(), 2);
        assert_eq!(snap.iter().count(), 2);
        set.clear();
        assert_eq!(snap.len(), 2);
        assert!(set.is_empty());
    }

    #[test]
    fn test_tags_are_deduplicated() {
        let mut set = SolutionSet::with_tags(&[Tag::FITNESS, Tag::FITNESS, Tag::RANKED]);
        assert_eq!(set.tags(), &[Tag::FITNESS, Tag::RANKED]);
        set.add_tag(Tag::RANKED);
        assert_eq!(set.tags().len(), 2);
        set.remove_tag(Tag::FITNESS);
        assert!(!set.has_tag(Tag::FITNESS));
        set.clear_tags();
        assert!(set.tags().is_empty());
    }

    #[test]
    fn test_objective_matrix_preserves_order() {
        let set = SolutionSet::from_handles(vec![handle(3.0, 1.0), handle(1.0, 3.0)]);
        assert_eq!(set.objective_matrix(), vec![vec![3.0, 1.0], vec![1.0, 3.0]]);
    }
}
