//! Arena of solution sets owned by pipeline nodes.

use rustc_hash::FxHashMap;

use super::node::{NodeId, SetId};
use crate::model::SolutionSet;

#[derive(Debug)]
pub(crate) struct SetEntry {
    pub(crate) set: SolutionSet,
    pub(crate) owner: NodeId,
    pub(crate) persistent: bool,
}

/// Every live set, keyed by a never-reused id.
#[derive(Debug, Default)]
pub(crate) struct SetStore {
    entries: FxHashMap<SetId, SetEntry>,
    next: usize,
}

impl SetStore {
    pub(crate) fn insert(&mut self, owner: NodeId, set: SolutionSet) -> SetId {
        let id = SetId(self.next);
        self.next += 1;
        self.entries.insert(
            id,
            SetEntry {
                set,
                owner,
                persistent: false,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: SetId) -> Option<&SolutionSet> {
        self.entries.get(&id).map(|e| &e.set)
    }

    pub(crate) fn get_mut(&mut self, id: SetId) -> Option<&mut SolutionSet> {
        self.entries.get_mut(&id).map(|e| &mut e.set)
    }

    pub(crate) fn entry(&self, id: SetId) -> Option<&SetEntry> {
        self.entries.get(&id)
    }

    pub(crate) fn entry_mut(&mut self, id: SetId) -> Option<&mut SetEntry> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: SetId) -> Option<SolutionSet> {
        self.entries.remove(&id).map(|e| e.set)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_not_reused() {
        let mut store = SetStore::default();
        let a = store.insert(NodeId(0), SolutionSet::new());
        assert!(store.remove(a).is_some());
        let b = store.insert(NodeId(0), SolutionSet::new());
        assert_ne!(a, b);
        assert!(store.get(a).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_entry_tracks_owner() {
        let mut store = SetStore::default();
        let a = store.insert(NodeId(4), SolutionSet::new());
        assert_eq!(store.entry(a).map(|e| e.owner), Some(NodeId(4)));
        assert_eq!(store.entry(a).map(|e| e.persistent), Some(false));
    }
}
