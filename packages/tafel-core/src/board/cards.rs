use crate::types::*;

use super::patch::CardPatch;

/// Copy `card` into `column` under a fresh identity.
///
/// Subtasks, checklists and checklist items get fresh ids. Comments are reset
/// and attachments are shared by reference (same backing file).
pub(crate) fn copy_card_into(card: &Card, column: &Column, title: &str) -> Card {
    let now = timestamp();
    Card {
        id: new_id(),
        column_id: column.id.clone(),
        board_id: column.board_id.clone(),
        title: title.to_string(),
        subtasks: card
            .subtasks
            .iter()
            .map(|s| Subtask {
                id: new_id(),
                ..s.clone()
            })
            .collect(),
        checklists: card
            .checklists
            .iter()
            .map(|c| Checklist {
                id: new_id(),
                items: c
                    .items
                    .iter()
                    .map(|i| ChecklistItem {
                        id: new_id(),
                        ..i.clone()
                    })
                    .collect(),
                ..c.clone()
            })
            .collect(),
        comments: Vec::new(),
        attachments: card.attachments.clone(),
        created_at: now.clone(),
        updated_at: now,
        ..card.clone()
    }
}

impl BoardData {
    /// Append a new card to a column. When the column does not exist the
    /// returned id is generated but no card is registered.
    pub fn create_card(&mut self, column_id: &str, title: &str) -> String {
        let Some(column) = self.columns.get_mut(column_id) else {
            return new_id();
        };
        let card = Card::new(column, title);
        let card_id = card.id.clone();
        column.card_ids.push(card_id.clone());
        column.updated_at = card.created_at.clone();
        self.cards.insert(card_id.clone(), card);
        card_id
    }

    /// Apply a partial update. Completing a card completes all of its
    /// subtasks; un-completing leaves them untouched.
    pub fn update_card(&mut self, card_id: &str, patch: &CardPatch) -> bool {
        let Some(card) = self.cards.get_mut(card_id) else {
            return false;
        };
        if let Some(title) = &patch.title {
            card.title = title.clone();
        }
        if let Some(description) = &patch.description {
            card.description = description.clone();
        }
        if let Some(priority) = patch.priority {
            card.priority = priority;
        }
        if let Some(due_date) = &patch.due_date {
            card.due_date = due_date.clone();
        }
        if let Some(pinned) = patch.pinned {
            card.pinned = Some(pinned);
        }
        if let Some(cover) = &patch.cover_image_id {
            card.cover_image_id = cover.clone();
        }
        if let Some(completed) = patch.completed {
            card.completed = completed;
            if completed {
                for subtask in card.subtasks.iter_mut() {
                    subtask.completed = true;
                }
            }
        }
        card.updated_at = timestamp();
        true
    }

    /// Remove a card. Deleting an unknown id is a no-op returning `None`.
    pub fn delete_card(&mut self, card_id: &str) -> Option<Card> {
        let card = self.cards.remove(card_id)?;
        let now = timestamp();
        for column in self.columns.values_mut() {
            if column.card_ids.iter().any(|id| id == card_id) {
                column.card_ids.retain(|id| id != card_id);
                column.updated_at = now.clone();
            }
        }
        Some(card)
    }

    /// Move one card to `index` (clamped) in `to_column_id`. Source and
    /// destination lists change in the same transition; with equal columns
    /// this is a pure reorder.
    pub fn move_card(
        &mut self,
        card_id: &str,
        from_column_id: &str,
        to_column_id: &str,
        index: usize,
    ) -> bool {
        if !self.columns.contains_key(to_column_id) {
            return false;
        }
        let Some(current_column) = self.cards.get(card_id).map(|c| c.column_id.clone()) else {
            return false;
        };

        let now = timestamp();
        for column_id in [from_column_id, current_column.as_str(), to_column_id] {
            if let Some(column) = self.columns.get_mut(column_id) {
                if column.card_ids.iter().any(|id| id == card_id) {
                    column.card_ids.retain(|id| id != card_id);
                    column.updated_at = now.clone();
                }
            }
        }

        let Some(destination) = self.columns.get_mut(to_column_id) else {
            return false;
        };
        let index = index.min(destination.card_ids.len());
        destination.card_ids.insert(index, card_id.to_string());
        destination.updated_at = now.clone();
        let board_id = destination.board_id.clone();

        if let Some(card) = self.cards.get_mut(card_id) {
            card.column_id = to_column_id.to_string();
            card.board_id = board_id;
            card.updated_at = now;
        }
        true
    }

    /// Multi-card drag: pull every given card out of whichever column holds
    /// it, then insert the batch (in the given order) right after
    /// `anchor_card_id` in the destination, or at the end when the anchor is
    /// absent. Returns the number of cards moved.
    pub fn move_cards_to_column(
        &mut self,
        card_ids: &[String],
        to_column_id: &str,
        anchor_card_id: Option<&str>,
    ) -> usize {
        if !self.columns.contains_key(to_column_id) {
            return 0;
        }
        let mut batch: Vec<String> = Vec::with_capacity(card_ids.len());
        for id in card_ids {
            if self.cards.contains_key(id) && !batch.contains(id) {
                batch.push(id.clone());
            }
        }
        if batch.is_empty() {
            return 0;
        }

        let now = timestamp();
        for column in self.columns.values_mut() {
            let before = column.card_ids.len();
            column.card_ids.retain(|id| !batch.contains(id));
            if column.card_ids.len() != before {
                column.updated_at = now.clone();
            }
        }

        let Some(destination) = self.columns.get_mut(to_column_id) else {
            return 0;
        };
        let position = anchor_card_id
            .and_then(|anchor| destination.card_ids.iter().position(|id| id == anchor))
            .map(|i| i + 1)
            .unwrap_or(destination.card_ids.len());
        destination
            .card_ids
            .splice(position..position, batch.iter().cloned());
        destination.updated_at = now.clone();
        let board_id = destination.board_id.clone();

        for id in &batch {
            if let Some(card) = self.cards.get_mut(id) {
                card.column_id = to_column_id.to_string();
                card.board_id = board_id.clone();
                card.updated_at = now.clone();
            }
        }
        batch.len()
    }

    /// Duplicate a card right below the original.
    pub fn duplicate_card(&mut self, card_id: &str) -> Option<String> {
        let card = self.cards.get(card_id)?;
        let column = self.columns.get(&card.column_id)?;
        let copy = copy_card_into(card, column, &format!("{} (copy)", card.title));
        let copy_id = copy.id.clone();

        let column = self.columns.get_mut(&copy.column_id)?;
        let position = column
            .card_ids
            .iter()
            .position(|id| id == card_id)
            .map(|i| i + 1)
            .unwrap_or(column.card_ids.len());
        column.card_ids.insert(position, copy_id.clone());
        column.updated_at = copy.created_at.clone();
        self.cards.insert(copy_id.clone(), copy);
        Some(copy_id)
    }

    /// Append deep copies of `cards` to a column. Returns the new ids.
    ///
    /// Clipboard cards may predate label edits: their label copies are
    /// replaced by the current global labels, deleted ones are dropped.
    pub fn paste_cards_to_column(&mut self, cards: &[Card], column_id: &str) -> Vec<String> {
        let Some(column) = self.columns.get(column_id).cloned() else {
            return Vec::new();
        };
        let mut pasted = Vec::with_capacity(cards.len());
        for card in cards {
            let mut copy = copy_card_into(card, &column, &card.title);
            copy.labels = card
                .labels
                .iter()
                .filter_map(|l| self.global_labels.iter().find(|g| g.id == l.id).cloned())
                .collect();
            pasted.push(copy.id.clone());
            self.cards.insert(copy.id.clone(), copy);
        }
        if let Some(column) = self.columns.get_mut(column_id) {
            column.card_ids.extend(pasted.iter().cloned());
            column.updated_at = timestamp();
        }
        pasted
    }

    pub fn toggle_pin(&mut self, card_id: &str) -> bool {
        let Some(card) = self.cards.get_mut(card_id) else {
            return false;
        };
        card.pinned = Some(!card.pinned.unwrap_or(false));
        card.updated_at = timestamp();
        true
    }
}
