use crate::types::*;

use super::patch::LabelPatch;

impl BoardData {
    pub fn create_label(&mut self, name: &str, color: &str, emoji: Option<&str>) -> String {
        let label = Label {
            id: new_id(),
            name: name.to_string(),
            color: color.to_string(),
            emoji: emoji.map(str::to_string),
        };
        let id = label.id.clone();
        self.global_labels.push(label);
        id
    }

    /// Update a global label and every denormalized copy on cards.
    pub fn update_label(&mut self, label_id: &str, patch: &LabelPatch) -> bool {
        let Some(label) = self.global_labels.iter_mut().find(|l| l.id == label_id) else {
            return false;
        };
        if let Some(name) = &patch.name {
            label.name = name.clone();
        }
        if let Some(color) = &patch.color {
            label.color = color.clone();
        }
        if let Some(emoji) = &patch.emoji {
            label.emoji = emoji.clone();
        }
        let updated = label.clone();

        for card in self.cards.values_mut() {
            for copy in card.labels.iter_mut().filter(|l| l.id == label_id) {
                *copy = updated.clone();
            }
        }
        true
    }

    /// Delete a global label and strip it from every card. Cards themselves
    /// are kept.
    pub fn delete_label(&mut self, label_id: &str) -> bool {
        let before = self.global_labels.len();
        self.global_labels.retain(|l| l.id != label_id);
        if self.global_labels.len() == before {
            return false;
        }
        let now = timestamp();
        for card in self.cards.values_mut() {
            if card.labels.iter().any(|l| l.id == label_id) {
                card.labels.retain(|l| l.id != label_id);
                card.updated_at = now.clone();
            }
        }
        true
    }

    /// Attach a copy of a global label to a card. Returns false when either
    /// side is unknown or the card already carries the label.
    pub fn add_label_to_card(&mut self, card_id: &str, label_id: &str) -> bool {
        let Some(label) = self.global_labels.iter().find(|l| l.id == label_id).cloned() else {
            return false;
        };
        let Some(card) = self.cards.get_mut(card_id) else {
            return false;
        };
        if card.labels.iter().any(|l| l.id == label_id) {
            return false;
        }
        card.labels.push(label);
        card.updated_at = timestamp();
        true
    }

    pub fn remove_label_from_card(&mut self, card_id: &str, label_id: &str) -> bool {
        let Some(card) = self.cards.get_mut(card_id) else {
            return false;
        };
        let before = card.labels.len();
        card.labels.retain(|l| l.id != label_id);
        if card.labels.len() == before {
            return false;
        }
        card.updated_at = timestamp();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (BoardData, Vec<String>) {
        let mut data = BoardData::default();
        let board = data.create_board("B", None);
        let col = data.boards[&board].column_order[0].clone();
        let cards = vec![data.create_card(&col, "x"), data.create_card(&col, "y")];
        (data, cards)
    }

    #[test]
    fn test_delete_label_strips_every_card() {
        let (mut data, cards) = setup();
        let bug = data.create_label("bug", "red", Some("🐛"));
        let ui = data.create_label("ui", "blue", None);
        for card in &cards {
            data.add_label_to_card(card, &bug);
            data.add_label_to_card(card, &ui);
        }

        assert!(data.delete_label(&bug));
        assert_eq!(data.global_labels.len(), 1);
        assert_eq!(data.cards.len(), 2);
        for card in data.cards.values() {
            assert_eq!(card.labels.len(), 1);
            assert_eq!(card.labels[0].id, ui);
        }
        assert!(!data.delete_label(&bug));
    }

    #[test]
    fn test_update_label_propagates() {
        let (mut data, cards) = setup();
        let bug = data.create_label("bug", "red", None);
        data.add_label_to_card(&cards[0], &bug);
        let patch = LabelPatch {
            name: Some("defect".into()),
            ..Default::default()
        };
        assert!(data.update_label(&bug, &patch));
        assert_eq!(data.cards[&cards[0]].labels[0].name, "defect");
        assert_eq!(data.cards[&cards[0]].labels[0].color, "red");
    }

    #[test]
    fn test_add_and_remove_label() {
        let (mut data, cards) = setup();
        let bug = data.create_label("bug", "red", None);
        assert!(!data.add_label_to_card(&cards[0], "missing"));
        assert!(data.add_label_to_card(&cards[0], &bug));
        assert!(!data.add_label_to_card(&cards[0], &bug));
        assert!(data.remove_label_from_card(&cards[0], &bug));
        assert!(!data.remove_label_from_card(&cards[0], &bug));
    }
}
