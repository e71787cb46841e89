use crate::types::*;

use super::patch::ColumnPatch;

impl BoardData {
    /// Append a column to a board. When the board does not exist nothing is
    /// registered and the returned id refers to no column.
    pub fn create_column(&mut self, board_id: &str, title: &str, color: Option<&str>) -> String {
        let column_id = new_id();
        let Some(board) = self.boards.get_mut(board_id) else {
            return column_id;
        };
        let now = timestamp();
        board.column_order.push(column_id.clone());
        board.updated_at = now.clone();
        self.columns.insert(
            column_id.clone(),
            Column {
                id: column_id.clone(),
                board_id: board_id.to_string(),
                title: title.to_string(),
                color: color.map(str::to_string),
                card_ids: Vec::new(),
                show_progress: None,
                created_at: now.clone(),
                updated_at: now,
            },
        );
        column_id
    }

    pub fn update_column(&mut self, column_id: &str, patch: &ColumnPatch) -> bool {
        let Some(column) = self.columns.get_mut(column_id) else {
            return false;
        };
        if let Some(title) = &patch.title {
            column.title = title.clone();
        }
        if let Some(color) = &patch.color {
            column.color = color.clone();
        }
        if let Some(show) = patch.show_progress {
            column.show_progress = Some(show);
        }
        column.updated_at = timestamp();
        true
    }

    /// Remove a column and its cards, returning them for archiving.
    pub fn delete_column(&mut self, column_id: &str) -> Option<DeletedSubtree> {
        let column = self.columns.remove(column_id)?;
        if let Some(board) = self.boards.get_mut(&column.board_id) {
            board.column_order.retain(|id| id != column_id);
            board.updated_at = timestamp();
        }

        let mut cards: Vec<Card> = column
            .card_ids
            .iter()
            .filter_map(|id| self.cards.remove(id))
            .collect();
        let strays: Vec<String> = self
            .cards
            .values()
            .filter(|c| c.column_id == column_id)
            .map(|c| c.id.clone())
            .collect();
        cards.extend(strays.iter().filter_map(|id| self.cards.remove(id)));

        Some(DeletedSubtree::Column { column, cards })
    }

    /// Move a column within its board's order; `index` is clamped.
    pub fn move_column(&mut self, board_id: &str, column_id: &str, index: usize) -> bool {
        let Some(board) = self.boards.get_mut(board_id) else {
            return false;
        };
        let Some(from) = board.column_order.iter().position(|id| id == column_id) else {
            return false;
        };
        let id = board.column_order.remove(from);
        let index = index.min(board.column_order.len());
        board.column_order.insert(index, id);
        board.updated_at = timestamp();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with_columns() -> (BoardData, String) {
        let mut data = BoardData::default();
        let board = data.create_board_with_columns("B", None, &["a", "b", "c"]);
        (data, board)
    }

    #[test]
    fn test_create_column_appends() {
        let (mut data, board) = board_with_columns();
        let id = data.create_column(&board, "d", Some("#ff0000"));
        assert_eq!(data.boards[&board].column_order.last(), Some(&id));
        assert_eq!(data.columns[&id].color.as_deref(), Some("#ff0000"));
        assert!(data.invariant_violations().is_empty());
    }

    #[test]
    fn test_create_column_missing_board_registers_nothing() {
        let mut data = BoardData::default();
        let id = data.create_column("ghost", "x", None);
        assert!(!id.is_empty());
        assert!(data.columns.is_empty());
    }

    #[test]
    fn test_delete_column_returns_cards() {
        let (mut data, board) = board_with_columns();
        let col = data.boards[&board].column_order[0].clone();
        data.create_card(&col, "one");
        data.create_card(&col, "two");

        match data.delete_column(&col) {
            Some(DeletedSubtree::Column { column, cards }) => {
                assert_eq!(column.id, col);
                assert_eq!(cards.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(data.cards.is_empty());
        assert_eq!(data.boards[&board].column_order.len(), 2);
        assert!(data.delete_column(&col).is_none());
        assert!(data.invariant_violations().is_empty());
    }

    #[test]
    fn test_move_column() {
        let (mut data, board) = board_with_columns();
        let order = data.boards[&board].column_order.clone();
        assert!(data.move_column(&board, &order[2], 0));
        assert_eq!(
            data.boards[&board].column_order,
            vec![order[2].clone(), order[0].clone(), order[1].clone()]
        );
        assert!(data.move_column(&board, &order[2], 42));
        assert_eq!(data.boards[&board].column_order.last(), Some(&order[2]));
        assert!(!data.move_column(&board, "missing", 0));
    }

    #[test]
    fn test_update_column_clears_color() {
        let (mut data, board) = board_with_columns();
        let col = data.boards[&board].column_order[0].clone();
        data.update_column(
            &col,
            &ColumnPatch {
                color: Some(Some("#000".into())),
                ..Default::default()
            },
        );
        assert_eq!(data.columns[&col].color.as_deref(), Some("#000"));
        data.update_column(
            &col,
            &ColumnPatch {
                color: Some(None),
                show_progress: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(data.columns[&col].color, None);
        assert_eq!(data.columns[&col].show_progress, Some(true));
    }
}
