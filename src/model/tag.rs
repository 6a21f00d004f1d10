//! Interned tags used to bind solution sets between pipeline stages.
//!
//! A [`Tag`] is a small integer backed by a process-wide symbol table.
//! Well-known tags are associated constants; new ones are created at run
//! time with [`Tag::intern`]. Interning the same name twice yields the same
//! tag, so compositions can share names without coordinating ids.

use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

use rustc_hash::FxHashMap;

/// Interned symbol naming a role a solution set plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(u32);

const WELL_KNOWN: [&str; 16] = [
    "MainOptimizationSet",
    "ForEvaluation",
    "ForSelection",
    "ForDirection",
    "ForPerturbation",
    "ForNeighbourhoods",
    "Neighbourhoods",
    "ForMoeadUpdate",
    "ForResize",
    "Fitness",
    "ForFitness",
    "Offspring",
    "Ranked",
    "NonDominatedArchive",
    "ForSetReplacement",
    "ForMerge",
];

impl Tag {
    pub const MAIN_OPTIMIZATION_SET: Tag = Tag(0);
    pub const FOR_EVALUATION: Tag = Tag(1);
    pub const FOR_SELECTION: Tag = Tag(2);
    pub const FOR_DIRECTION: Tag = Tag(3);
    pub const FOR_PERTURBATION: Tag = Tag(4);
    pub const FOR_NEIGHBOURHOODS: Tag = Tag(5);
    pub const NEIGHBOURHOODS: Tag = Tag(6);
    pub const FOR_MOEAD_UPDATE: Tag = Tag(7);
    pub const FOR_RESIZE: Tag = Tag(8);
    pub const FITNESS: Tag = Tag(9);
    pub const FOR_FITNESS: Tag = Tag(10);
    pub const OFFSPRING: Tag = Tag(11);
    pub const RANKED: Tag = Tag(12);
    pub const NON_DOMINATED_ARCHIVE: Tag = Tag(13);
    pub const FOR_SET_REPLACEMENT: Tag = Tag(14);
    pub const FOR_MERGE: Tag = Tag(15);

    /// Returns the tag for `name`, registering it on first use.
    pub fn intern(name: &str) -> Tag {
        let table = table();
        if let Some(tag) = table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ids
            .get(name)
        {
            return *tag;
        }
        let mut guard = table.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(name)
    }

    /// The registered name of this tag.
    pub fn name(&self) -> String {
        table()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .names
            .get(self.0 as usize)
            .cloned()
            .unwrap_or_else(|| format!("#{}", self.0))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Default)]
struct TagTable {
    ids: FxHashMap<String, Tag>,
    names: Vec<String>,
}

impl TagTable {
    fn insert(&mut self, name: &str) -> Tag {
        if let Some(tag) = self.ids.get(name) {
            return *tag;
        }
        let tag = Tag(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), tag);
        tag
    }
}

fn table() -> &'static RwLock<TagTable> {
    static TABLE: OnceLock<RwLock<TagTable>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = TagTable::default();
        for name in WELL_KNOWN {
            t.insert(name);
        }
        RwLock::new(t)
    })
}

/// Appends `tag` to `tags` unless already present.
pub(crate) fn push_unique(tags: &mut Vec<Tag>, tag: Tag) {
    if !tags.contains(&tag) {
        tags.push(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_names_resolve_to_constants() {
        assert_eq!(Tag::intern("MainOptimizationSet"), Tag::MAIN_OPTIMIZATION_SET);
        assert_eq!(Tag::intern("ForMerge"), Tag::FOR_MERGE);
        assert_eq!(Tag::FITNESS.to_string(), "Fitness");
    }

    #[test]
    fn test_intern_is_idempotent() {
        let a = Tag::intern("tag-test-custom");
        let b = Tag::intern("tag-test-custom");
        assert_eq!(a, b);
        assert_ne!(a, Tag::intern("tag-test-other"));
        assert_eq!(a.name(), "tag-test-custom");
    }

    #[test]
    fn test_push_unique() {
        let mut tags = vec![Tag::FITNESS];
        push_unique(&mut tags, Tag::FITNESS);
        push_unique(&mut tags, Tag::RANKED);
        assert_eq!(tags, vec![Tag::FITNESS, Tag::RANKED]);
    }
}
