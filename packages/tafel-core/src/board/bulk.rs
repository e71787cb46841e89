/// Bulk operations apply the single-card operation to every id inside one
/// transition, so a persisted snapshot holds either the whole batch or none
/// of it. Unknown ids are skipped.
use crate::types::*;

use super::patch::CardPatch;

impl BoardData {
    pub fn bulk_set_priority(&mut self, card_ids: &[String], priority: Priority) -> usize {
        let patch = CardPatch::priority(priority);
        card_ids
            .iter()
            .filter(|id| self.update_card(id, &patch))
            .count()
    }

    pub fn bulk_add_label(&mut self, card_ids: &[String], label_id: &str) -> usize {
        card_ids
            .iter()
            .filter(|id| self.add_label_to_card(id, label_id))
            .count()
    }

    pub fn bulk_move_to_column(&mut self, card_ids: &[String], to_column_id: &str) -> usize {
        self.move_cards_to_column(card_ids, to_column_id, None)
    }

    pub fn bulk_delete(&mut self, card_ids: &[String]) -> Vec<Card> {
        card_ids
            .iter()
            .filter_map(|id| self.delete_card(id))
            .collect()
    }

    pub fn bulk_set_completed(&mut self, card_ids: &[String], completed: bool) -> usize {
        let patch = CardPatch::completed(completed);
        card_ids
            .iter()
            .filter(|id| self.update_card(id, &patch))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (BoardData, String, String, Vec<String>) {
        let mut data = BoardData::default();
        let board = data.create_board_with_columns("B", None, &["A", "B"]);
        let order = data.boards[&board].column_order.clone();
        let cards = (0..3)
            .map(|i| data.create_card(&order[0], &format!("c{i}")))
            .collect();
        (data, order[0].clone(), order[1].clone(), cards)
    }

    #[test]
    fn test_bulk_set_priority_skips_unknown() {
        let (mut data, _, _, mut cards) = setup();
        cards.push("ghost".into());
        assert_eq!(data.bulk_set_priority(&cards, Priority::Urgent), 3);
        assert!(data.cards.values().all(|c| c.priority == Priority::Urgent));
    }

    #[test]
    fn test_bulk_add_label_is_idempotent_per_card() {
        let (mut data, _, _, cards) = setup();
        let label = data.create_label("bug", "#f00", None);
        assert_eq!(data.bulk_add_label(&cards, &label), 3);
        assert_eq!(data.bulk_add_label(&cards, &label), 0);
        assert!(data.cards.values().all(|c| c.labels.len() == 1));
    }

    #[test]
    fn test_bulk_move_appends_in_order() {
        let (mut data, a, b, cards) = setup();
        assert_eq!(data.bulk_move_to_column(&cards, &b), 3);
        assert_eq!(data.columns[&b].card_ids, cards);
        assert!(data.columns[&a].card_ids.is_empty());
        assert!(data.invariant_violations().is_empty());
    }

    #[test]
    fn test_bulk_delete_and_complete() {
        let (mut data, a, _, cards) = setup();
        data.add_subtask(&cards[0], "s");
        assert_eq!(data.bulk_set_completed(&cards, true), 3);
        assert!(data.cards[&cards[0]].subtasks[0].completed);

        let removed = data.bulk_delete(&cards[..2]);
        assert_eq!(removed.len(), 2);
        assert_eq!(data.columns[&a].card_ids, vec![cards[2].clone()]);
        assert!(data.bulk_delete(&cards[..2]).is_empty());
    }
}
