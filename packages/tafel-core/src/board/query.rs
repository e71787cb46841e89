use std::collections::HashSet;

use crate::types::*;

impl BoardData {
    /// Summaries of every board in board order, with denormalized counts.
    pub fn board_summaries(&self) -> Vec<BoardSummary> {
        self.board_order
            .iter()
            .filter_map(|id| self.boards.get(id))
            .map(|board| {
                let columns: Vec<ColumnSummary> = self
                    .columns_of(&board.id)
                    .into_iter()
                    .map(|col| ColumnSummary {
                        id: col.id.clone(),
                        title: col.title.clone(),
                        card_count: col.card_ids.len(),
                    })
                    .collect();
                BoardSummary {
                    id: board.id.clone(),
                    title: board.title.clone(),
                    icon: board.icon.clone(),
                    folder_id: board.folder_id.clone(),
                    column_count: columns.len(),
                    card_count: columns.iter().map(|c| c.card_count).sum(),
                    columns,
                    updated_at: board.updated_at.clone(),
                }
            })
            .collect()
    }

    /// Columns of a board in display order.
    pub fn columns_of(&self, board_id: &str) -> Vec<&Column> {
        self.boards
            .get(board_id)
            .map(|board| {
                board
                    .column_order
                    .iter()
                    .filter_map(|id| self.columns.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Cards of a column in display order.
    pub fn cards_of(&self, column_id: &str) -> Vec<&Card> {
        self.columns
            .get(column_id)
            .map(|column| {
                column
                    .card_ids
                    .iter()
                    .filter_map(|id| self.cards.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Describe every broken structural invariant. Empty means consistent.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for board in self.boards.values() {
            let listed: HashSet<&String> = board.column_order.iter().collect();
            if listed.len() != board.column_order.len() {
                problems.push(format!("board {} lists a column twice", board.id));
            }
            let owned: HashSet<&String> = self
                .columns
                .values()
                .filter(|c| c.board_id == board.id)
                .map(|c| &c.id)
                .collect();
            if listed != owned {
                problems.push(format!("board {} column order does not match its columns", board.id));
            }
        }

        for column in self.columns.values() {
            if !self.boards.contains_key(&column.board_id) {
                problems.push(format!("column {} belongs to missing board {}", column.id, column.board_id));
            }
            let listed: HashSet<&String> = column.card_ids.iter().collect();
            if listed.len() != column.card_ids.len() {
                problems.push(format!("column {} lists a card twice", column.id));
            }
            let owned: HashSet<&String> = self
                .cards
                .values()
                .filter(|c| c.column_id == column.id)
                .map(|c| &c.id)
                .collect();
            if listed != owned {
                problems.push(format!("column {} card ids do not match its cards", column.id));
            }
        }

        for card in self.cards.values() {
            match self.columns.get(&card.column_id) {
                Some(column) if column.board_id != card.board_id => problems.push(format!(
                    "card {} board {} differs from its column's board {}",
                    card.id, card.board_id, column.board_id
                )),
                None => problems.push(format!("card {} sits in missing column {}", card.id, card.column_id)),
                _ => {}
            }
        }

        let ordered: HashSet<&String> = self.board_order.iter().collect();
        let boards: HashSet<&String> = self.boards.keys().collect();
        if ordered != boards || ordered.len() != self.board_order.len() {
            problems.push("board order does not match boards".to_string());
        }

        problems
    }
}
