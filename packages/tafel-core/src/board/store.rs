use std::sync::Arc;

use crate::history::History;
use crate::types::{BoardData, Card};

/// UI-only state. Never persisted, never part of undo history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub active_board_id: Option<String>,
    pub selected_card_ids: Vec<String>,
    pub clipboard: Vec<Card>,
}

/// In-memory owner of the board model.
///
/// Every mutation runs against a private copy which then replaces the
/// current snapshot in one step, so readers holding an `Arc` never see a
/// partially applied operation.
pub struct BoardStore {
    data: Arc<BoardData>,
    view: ViewState,
    history: History<Arc<BoardData>>,
    revision: u64,
}

impl BoardStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            data: Arc::new(BoardData::default()),
            view: ViewState::default(),
            history: History::new(history_limit),
            revision: 0,
        }
    }

    pub fn data(&self) -> Arc<BoardData> {
        self.data.clone()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Bumped whenever the persistable slice changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history(&self) -> &History<Arc<BoardData>> {
        &self.history
    }

    /// Apply one operation as a single transition.
    pub fn apply<R>(&mut self, op: impl FnOnce(&mut BoardData) -> R) -> R {
        let mut next = (*self.data).clone();
        let result = op(&mut next);
        let next = Arc::new(next);
        if self.history.record(&self.data, &next) {
            self.data = next;
            self.revision += 1;
            self.prune_view();
        }
        result
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.data.clone()) {
            Some(previous) => {
                self.data = previous;
                self.revision += 1;
                self.prune_view();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.data.clone()) {
            Some(next) => {
                self.data = next;
                self.revision += 1;
                self.prune_view();
                true
            }
            None => false,
        }
    }

    /// Replace the model with data loaded from disk. History is cleared so
    /// the first undo cannot return to the pre-hydration state.
    pub fn hydrate(&mut self, data: BoardData) {
        self.data = Arc::new(data);
        self.history.clear();
        self.revision += 1;
        self.prune_view();
    }

    /// Drop view references to entities that no longer exist.
    fn prune_view(&mut self) {
        let data = &self.data;
        if let Some(active) = &self.view.active_board_id {
            if !data.boards.contains_key(active) {
                self.view.active_board_id = None;
            }
        }
        self.view
            .selected_card_ids
            .retain(|id| data.cards.contains_key(id));
    }
}

impl Default for BoardStore {
    fn default() -> Self {
        Self::new(crate::history::DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::CardPatch;

    #[test]
    fn test_noop_transition_leaves_no_history() {
        let mut store = BoardStore::default();
        store.apply(|d| d.toggle_pin("missing"));
        assert!(!store.history().can_undo());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_readers_keep_old_snapshot() {
        let mut store = BoardStore::default();
        let before = store.data();
        store.apply(|d| d.create_board("b", None));
        assert!(before.boards.is_empty());
        assert_eq!(store.data().boards.len(), 1);
    }

    #[test]
    fn test_undo_bound_after_sixty_mutations() {
        let mut store = BoardStore::default();
        let board = store.apply(|d| d.create_board("b", None));
        let column = store.data().boards[&board].column_order[0].clone();
        let card = store.apply(|d| d.create_card(&column, "t0"));
        store.hydrate((*store.data()).clone());

        let mut titles = vec!["t0".to_string()];
        for i in 1..=60 {
            let title = format!("t{i}");
            store.apply(|d| d.update_card(&card, &CardPatch::title(&title)));
            titles.push(title);
        }
        assert_eq!(store.history().past_len(), 50);

        for _ in 0..50 {
            assert!(store.undo());
        }
        assert!(!store.undo());
        assert_eq!(store.data().cards[&card].title, titles[10]);
    }

    #[test]
    fn test_hydrate_clears_history() {
        let mut store = BoardStore::default();
        store.apply(|d| d.create_board("b", None));
        assert!(store.history().can_undo());
        store.hydrate(BoardData::default());
        assert!(!store.undo());
        assert!(store.data().boards.is_empty());
    }

    #[test]
    fn test_view_pruned_when_cards_disappear() {
        let mut store = BoardStore::default();
        let board = store.apply(|d| d.create_board("b", None));
        let column = store.data().boards[&board].column_order[0].clone();
        let card = store.apply(|d| d.create_card(&column, "x"));
        store.view_mut().active_board_id = Some(board.clone());
        store.view_mut().selected_card_ids = vec![card.clone()];

        store.apply(|d| d.delete_card(&card));
        assert!(store.view().selected_card_ids.is_empty());
        store.undo();
        assert_eq!(store.view().active_board_id.as_deref(), Some(board.as_str()));

        store.apply(|d| d.delete_board(&board));
        assert_eq!(store.view().active_board_id, None);
    }
}
