/// Bounded undo/redo history of past snapshots.
///
/// The present value lives with the caller; `past` holds what it replaced.
/// A transition is recorded only when the new value differs from the old one
/// under full equality, so no-op transitions leave no entry. Recording drops
/// the redo branch. Once `limit` entries exist the oldest is evicted.
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct History<T> {
    past: VecDeque<T>,
    future: Vec<T>,
    limit: usize,
}

impl<T: Clone + PartialEq> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the transition `previous -> next`. Returns false for no-ops.
    pub fn record(&mut self, previous: &T, next: &T) -> bool {
        if previous == next {
            return false;
        }
        self.push_past(previous.clone());
        self.future.clear();
        true
    }

    /// Step back. Hands `present` to the redo stack and returns the value
    /// to make current, or `None` at the boundary.
    pub fn undo(&mut self, present: T) -> Option<T> {
        let previous = self.past.pop_back()?;
        self.future.push(present);
        Some(previous)
    }

    /// Step forward. Mirror image of [`History::undo`].
    pub fn redo(&mut self, present: T) -> Option<T> {
        let next = self.future.pop()?;
        self.push_past(present);
        Some(next)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    fn push_past(&mut self, value: T) {
        self.past.push_back(value);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
    }
}

impl<T: Clone + PartialEq> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_transition_not_recorded() {
        let mut history = History::new(5);
        assert!(!history.record(&1, &1));
        assert!(!history.can_undo());
        assert!(history.record(&1, &2));
        assert_eq!(history.past_len(), 1);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = History::default();
        let mut present = 0;
        for next in 1..=3 {
            history.record(&present, &next);
            present = next;
        }

        present = history.undo(present).unwrap();
        assert_eq!(present, 2);
        present = history.undo(present).unwrap();
        assert_eq!(present, 1);
        present = history.redo(present).unwrap();
        assert_eq!(present, 2);
        assert_eq!(history.future_len(), 1);
    }

    #[test]
    fn test_boundaries_are_noops() {
        let mut history: History<i32> = History::default();
        assert_eq!(history.undo(7), None);
        assert_eq!(history.redo(7), None);
    }

    #[test]
    fn test_record_drops_redo_branch() {
        let mut history = History::default();
        history.record(&0, &1);
        let present = history.undo(1).unwrap();
        assert!(history.can_redo());
        history.record(&present, &5);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = History::new(DEFAULT_HISTORY_LIMIT);
        let mut present = 0;
        for next in 1..=60 {
            history.record(&present, &next);
            present = next;
        }
        assert_eq!(history.past_len(), 50);

        for _ in 0..50 {
            present = history.undo(present).unwrap();
        }
        assert_eq!(present, 10);
        assert_eq!(history.undo(present), None);
    }
}
