use crate::types::*;

use super::cards::copy_card_into;
use super::patch::BoardPatch;

impl BoardData {
    /// Create a board with the default column set.
    pub fn create_board(&mut self, title: &str, icon: Option<&str>) -> String {
        self.create_board_with_columns::<&str>(title, icon, &[])
    }

    /// Create a board. An empty `column_titles` falls back to
    /// [`DEFAULT_COLUMN_TITLES`].
    pub fn create_board_with_columns<S: AsRef<str>>(
        &mut self,
        title: &str,
        icon: Option<&str>,
        column_titles: &[S],
    ) -> String {
        let now = timestamp();
        let board_id = new_id();

        let titles: Vec<&str> = if column_titles.is_empty() {
            DEFAULT_COLUMN_TITLES.to_vec()
        } else {
            column_titles.iter().map(|t| t.as_ref()).collect()
        };

        let mut column_order = Vec::with_capacity(titles.len());
        for column_title in titles {
            let column = Column {
                id: new_id(),
                board_id: board_id.clone(),
                title: column_title.to_string(),
                color: None,
                card_ids: Vec::new(),
                show_progress: None,
                created_at: now.clone(),
                updated_at: now.clone(),
            };
            column_order.push(column.id.clone());
            self.columns.insert(column.id.clone(), column);
        }

        self.boards.insert(
            board_id.clone(),
            Board {
                id: board_id.clone(),
                title: title.to_string(),
                icon: icon.map(str::to_string),
                column_order,
                folder_id: None,
                created_at: now.clone(),
                updated_at: now,
            },
        );
        self.board_order.push(board_id.clone());
        board_id
    }

    pub fn update_board(&mut self, board_id: &str, patch: &BoardPatch) -> bool {
        let Some(board) = self.boards.get_mut(board_id) else {
            return false;
        };
        if let Some(title) = &patch.title {
            board.title = title.clone();
        }
        if let Some(icon) = &patch.icon {
            board.icon = icon.clone();
        }
        board.updated_at = timestamp();
        true
    }

    /// Remove a board with all of its columns and cards. Returns the removed
    /// subtree, or `None` when the board does not exist.
    pub fn delete_board(&mut self, board_id: &str) -> Option<DeletedSubtree> {
        let board = self.boards.remove(board_id)?;
        self.board_order.retain(|id| id != board_id);

        // Columns listed in the order first, then any stray column that
        // still points at this board.
        let mut column_ids = board.column_order.clone();
        for column in self.columns.values() {
            if column.board_id == board_id && !column_ids.contains(&column.id) {
                column_ids.push(column.id.clone());
            }
        }

        let mut columns = Vec::with_capacity(column_ids.len());
        let mut cards = Vec::new();
        for column_id in &column_ids {
            let Some(column) = self.columns.remove(column_id) else {
                continue;
            };
            for card_id in &column.card_ids {
                if let Some(card) = self.cards.remove(card_id) {
                    cards.push(card);
                }
            }
            columns.push(column);
        }

        let orphans: Vec<String> = self
            .cards
            .values()
            .filter(|c| c.board_id == board_id || column_ids.contains(&c.column_id))
            .map(|c| c.id.clone())
            .collect();
        for card_id in orphans {
            if let Some(card) = self.cards.remove(&card_id) {
                cards.push(card);
            }
        }

        Some(DeletedSubtree::Board {
            board,
            columns,
            cards,
        })
    }

    /// Deep-copy a board: every column and card gets a fresh identity.
    /// The copy is placed right after the original in the board order.
    pub fn duplicate_board(&mut self, board_id: &str) -> Option<String> {
        let source = self.boards.get(board_id)?.clone();
        let now = timestamp();
        let new_board_id = new_id();

        let mut column_order = Vec::with_capacity(source.column_order.len());
        for column_id in &source.column_order {
            let Some(column) = self.columns.get(column_id).cloned() else {
                continue;
            };
            let mut copy = Column {
                id: new_id(),
                board_id: new_board_id.clone(),
                card_ids: Vec::with_capacity(column.card_ids.len()),
                created_at: now.clone(),
                updated_at: now.clone(),
                ..column.clone()
            };
            for card_id in &column.card_ids {
                if let Some(card) = self.cards.get(card_id) {
                    let card_copy = copy_card_into(card, &copy, &card.title);
                    copy.card_ids.push(card_copy.id.clone());
                    self.cards.insert(card_copy.id.clone(), card_copy);
                }
            }
            column_order.push(copy.id.clone());
            self.columns.insert(copy.id.clone(), copy);
        }

        self.boards.insert(
            new_board_id.clone(),
            Board {
                id: new_board_id.clone(),
                title: format!("{} (copy)", source.title),
                icon: source.icon.clone(),
                column_order,
                folder_id: source.folder_id.clone(),
                created_at: now.clone(),
                updated_at: now,
            },
        );

        let position = self
            .board_order
            .iter()
            .position(|id| id == board_id)
            .map(|i| i + 1)
            .unwrap_or(self.board_order.len());
        self.board_order.insert(position, new_board_id.clone());
        Some(new_board_id)
    }

    /// Move the board at position `from` to position `to` in the board order.
    pub fn reorder_boards(&mut self, from: usize, to: usize) -> bool {
        if from >= self.board_order.len() {
            return false;
        }
        let id = self.board_order.remove(from);
        let to = to.min(self.board_order.len());
        self.board_order.insert(to, id);
        true
    }

    pub fn move_board_to_folder(&mut self, board_id: &str, folder_id: Option<&str>) -> bool {
        let Some(board) = self.boards.get_mut(board_id) else {
            return false;
        };
        board.folder_id = folder_id.map(str::to_string);
        board.updated_at = timestamp();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_board_default_columns() {
        let mut data = BoardData::default();
        let id = data.create_board("New board", None);

        let board = &data.boards[&id];
        assert_eq!(board.column_order.len(), 4);
        assert_eq!(data.board_order, vec![id.clone()]);
        let titles: Vec<&str> = board
            .column_order
            .iter()
            .map(|c| data.columns[c].title.as_str())
            .collect();
        assert_eq!(titles, DEFAULT_COLUMN_TITLES.to_vec());
        assert!(data.invariant_violations().is_empty());
    }

    #[test]
    fn test_create_board_custom_columns() {
        let mut data = BoardData::default();
        let id = data.create_board_with_columns("Ops", Some("🔥"), &["Inbox", "Done"]);
        assert_eq!(data.boards[&id].column_order.len(), 2);
        assert_eq!(data.boards[&id].icon.as_deref(), Some("🔥"));
    }

    #[test]
    fn test_delete_board_cascades() {
        let mut data = BoardData::default();
        let keep = data.create_board("Keep", None);
        let drop = data.create_board("Drop", None);
        let col = data.boards[&drop].column_order[0].clone();
        data.create_card(&col, "a");
        data.create_card(&col, "b");
        let kept_col = data.boards[&keep].column_order[0].clone();
        data.create_card(&kept_col, "stay");

        let deleted = data.delete_board(&drop).unwrap();
        match deleted {
            DeletedSubtree::Board { columns, cards, .. } => {
                assert_eq!(columns.len(), 4);
                assert_eq!(cards.len(), 2);
            }
            other => panic!("unexpected subtree {:?}", other),
        }
        assert_eq!(data.board_order, vec![keep.clone()]);
        assert_eq!(data.columns.len(), 4);
        assert_eq!(data.cards.len(), 1);
        assert!(data.columns.values().all(|c| c.board_id == keep));
        assert!(data.delete_board(&drop).is_none());
    }

    #[test]
    fn test_duplicate_board_fresh_identities() {
        let mut data = BoardData::default();
        let id = data.create_board("Src", None);
        let col = data.boards[&id].column_order[1].clone();
        let card = data.create_card(&col, "task");
        data.add_subtask(&card, "step");
        data.add_comment(&card, "note");

        let copy = data.duplicate_board(&id).unwrap();
        assert_eq!(data.board_order, vec![id.clone(), copy.clone()]);
        assert_eq!(data.boards[&copy].title, "Src (copy)");

        let copy_col = &data.columns[&data.boards[&copy].column_order[1]];
        assert_ne!(copy_col.id, col);
        let copy_card = &data.cards[&copy_col.card_ids[0]];
        assert_ne!(copy_card.id, card);
        assert_eq!(copy_card.board_id, copy);
        assert_eq!(copy_card.subtasks.len(), 1);
        assert_ne!(copy_card.subtasks[0].id, data.cards[&card].subtasks[0].id);
        assert!(copy_card.comments.is_empty());
        assert!(data.invariant_violations().is_empty());
    }

    #[test]
    fn test_reorder_boards_clamps() {
        let mut data = BoardData::default();
        let a = data.create_board("a", None);
        let b = data.create_board("b", None);
        let c = data.create_board("c", None);
        assert!(data.reorder_boards(0, 99));
        assert_eq!(data.board_order, vec![b.clone(), c.clone(), a.clone()]);
        assert!(!data.reorder_boards(5, 0));
    }

    #[test]
    fn test_update_board_missing_is_noop() {
        let mut data = BoardData::default();
        let before = data.clone();
        assert!(!data.update_board("nope", &BoardPatch::default()));
        assert!(!data.move_board_to_folder("nope", Some("f")));
        assert_eq!(data, before);
    }
}
