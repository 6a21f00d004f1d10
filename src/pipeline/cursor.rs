//! Traversal cursor over a node's bound set list.

use super::node::SetId;

/// Ordered list of bound set ids with a position.
///
/// `next` never runs off the end: on the last element it keeps returning
/// that element, and it returns `None` only for an empty list. Use
/// [`SetCursor::has_next`] or [`SetCursor::peek`] to detect the end.
#[derive(Debug, Clone, Default)]
pub struct SetCursor {
    bound: Vec<SetId>,
    pos: Option<usize>,
}

impl SetCursor {
    /// Replaces the bound list and rewinds.
    pub fn rebind(&mut self, bound: Vec<SetId>) {
        self.bound = bound;
        self.pos = None;
    }

    /// Rewinds to before the first element.
    pub fn reset(&mut self) {
        self.pos = None;
    }

    pub fn ids(&self) -> &[SetId] {
        &self.bound
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    fn next_index(&self) -> usize {
        self.pos.map_or(0, |p| p + 1)
    }

    pub fn has_next(&self) -> bool {
        self.next_index() < self.bound.len()
    }

    /// Advances and returns the new current set.
    pub fn next(&mut self) -> Option<SetId> {
        let last = self.bound.len().checked_sub(1)?;
        let idx = self.next_index().min(last);
        self.pos = Some(idx);
        Some(self.bound[idx])
    }

    /// The set `next` would move to, or `None` at the end.
    pub fn peek(&self) -> Option<SetId> {
        self.bound.get(self.next_index()).copied()
    }

    pub fn current(&self) -> Option<SetId> {
        self.pos.and_then(|p| self.bound.get(p).copied())
    }

    pub fn get(&self, idx: usize) -> Option<SetId> {
        self.bound.get(idx).copied()
    }

    /// Makes position `idx` current. Returns `false` when out of range.
    pub fn seek(&mut self, idx: usize) -> bool {
        if idx < self.bound.len() {
            self.pos = Some(idx);
            true
        } else {
            false
        }
    }

    /// Appends `id` and makes it current.
    pub fn push(&mut self, id: SetId) {
        self.bound.push(id);
        self.pos = Some(self.bound.len() - 1);
    }

    /// Removes `id` wherever it appears, keeping the position valid.
    pub fn remove(&mut self, id: SetId) {
        let Some(idx) = self.bound.iter().position(|b| *b == id) else {
            return;
        };
        self.bound.remove(idx);
        self.pos = match self.pos {
            _ if self.bound.is_empty() => None,
            Some(p) if p >= idx => p.checked_sub(1),
            other => other,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(n: usize) -> SetCursor {
        let mut c = SetCursor::default();
        c.rebind((0..n).map(SetId).collect());
        c
    }

    #[test]
    fn test_next_clamps_at_last() {
        let mut c = cursor(2);
        assert_eq!(c.next(), Some(SetId(0)));
        assert_eq!(c.next(), Some(SetId(1)));
        assert!(!c.has_next());
        assert_eq!(c.next(), Some(SetId(1)));
        assert_eq!(c.current(), Some(SetId(1)));
    }

    #[test]
    fn test_next_on_empty_is_none() {
        let mut c = cursor(0);
        assert_eq!(c.next(), None);
        assert_eq!(c.current(), None);
        assert!(!c.has_next());
    }

    #[test]
    fn test_peek_signals_end() {
        let mut c = cursor(2);
        assert_eq!(c.peek(), Some(SetId(0)));
        c.next();
        assert_eq!(c.peek(), Some(SetId(1)));
        c.next();
        assert_eq!(c.peek(), None);
    }

    #[test]
    fn test_reset_restarts() {
        let mut c = cursor(3);
        c.next();
        c.next();
        c.reset();
        assert_eq!(c.current(), None);
        assert_eq!(c.next(), Some(SetId(0)));
    }

    #[test]
    fn test_push_becomes_current() {
        let mut c = cursor(1);
        c.push(SetId(7));
        assert_eq!(c.current(), Some(SetId(7)));
        assert!(!c.has_next());
    }

    #[test]
    fn test_remove_keeps_position_valid() {
        let mut c = cursor(3);
        c.seek(2);
        c.remove(SetId(0));
        assert_eq!(c.current(), Some(SetId(2)));
        c.remove(SetId(2));
        assert_eq!(c.current(), Some(SetId(1)));
        c.remove(SetId(1));
        assert_eq!(c.current(), None);
    }
}
