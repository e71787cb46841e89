use proptest::prelude::*;
use tafel_core::board::{BoardStore, LabelPatch};
use tafel_core::types::{BoardData, Card};

/// One step of a random editing session. Indices pick among the ids that
/// exist when the step runs, so most steps hit real entities.
#[derive(Debug, Clone)]
enum Op {
    CreateBoard,
    DuplicateBoard(usize),
    DeleteBoard(usize),
    ReorderBoards(usize, usize),
    CreateColumn(usize),
    DeleteColumn(usize),
    MoveColumn(usize, usize, usize),
    CreateCard(usize),
    DeleteCard(usize),
    MoveCard(usize, usize, usize),
    MoveCardsToColumn(Vec<usize>, usize),
    DuplicateCard(usize),
    CopyCards(Vec<usize>),
    PasteCards(usize),
    BulkDelete(Vec<usize>),
    BulkMove(Vec<usize>, usize),
    CreateLabel,
    RenameLabel(usize),
    DeleteLabel(usize),
    LabelCard(usize, usize),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let idx = || 0usize..8;
    let many = || prop::collection::vec(0usize..8, 0..4);
    prop_oneof![
        Just(Op::CreateBoard),
        idx().prop_map(Op::DuplicateBoard),
        idx().prop_map(Op::DeleteBoard),
        (idx(), idx()).prop_map(|(a, b)| Op::ReorderBoards(a, b)),
        idx().prop_map(Op::CreateColumn),
        idx().prop_map(Op::DeleteColumn),
        (idx(), idx(), idx()).prop_map(|(b, c, i)| Op::MoveColumn(b, c, i)),
        idx().prop_map(Op::CreateCard),
        idx().prop_map(Op::DeleteCard),
        (idx(), idx(), 0usize..12).prop_map(|(k, c, i)| Op::MoveCard(k, c, i)),
        (many(), idx()).prop_map(|(ks, c)| Op::MoveCardsToColumn(ks, c)),
        idx().prop_map(Op::DuplicateCard),
        many().prop_map(Op::CopyCards),
        idx().prop_map(Op::PasteCards),
        many().prop_map(Op::BulkDelete),
        (many(), idx()).prop_map(|(ks, c)| Op::BulkMove(ks, c)),
        Just(Op::CreateLabel),
        idx().prop_map(Op::RenameLabel),
        idx().prop_map(Op::DeleteLabel),
        (idx(), idx()).prop_map(|(k, l)| Op::LabelCard(k, l)),
        Just(Op::Undo),
        Just(Op::Redo),
    ]
}

fn pick<'a>(ids: impl Iterator<Item = &'a String>, i: usize) -> Option<String> {
    let ids: Vec<&String> = ids.collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids[i % ids.len()].clone())
    }
}

fn board_id(d: &BoardData, i: usize) -> Option<String> {
    pick(d.board_order.iter(), i)
}

fn column_id(d: &BoardData, i: usize) -> Option<String> {
    pick(d.columns.keys(), i)
}

fn card_id(d: &BoardData, i: usize) -> Option<String> {
    pick(d.cards.keys(), i)
}

fn card_ids(d: &BoardData, picks: &[usize]) -> Vec<String> {
    picks.iter().filter_map(|&i| card_id(d, i)).collect()
}

fn label_id(d: &BoardData, i: usize) -> Option<String> {
    pick(d.global_labels.iter().map(|l| &l.id), i)
}

/// The clipboard outlives the cards and labels it was copied from.
fn apply(store: &mut BoardStore, clipboard: &mut Vec<Card>, op: &Op) {
    match op {
        Op::Undo => {
            store.undo();
        }
        Op::Redo => {
            store.redo();
        }
        Op::CopyCards(ks) => {
            let data = store.data();
            *clipboard = card_ids(&data, ks).iter().map(|k| data.cards[k].clone()).collect();
        }
        Op::PasteCards(c) => {
            store.apply(|d| {
                if let Some(c) = column_id(d, *c) {
                    d.paste_cards_to_column(&clipboard[..], &c);
                }
            });
        }
        op => store.apply(|d| edit(d, op)),
    }
}

fn edit(d: &mut BoardData, op: &Op) {
    match op {
        Op::CreateBoard => {
            d.create_board("Board", None);
        }
        Op::DuplicateBoard(b) => {
            if let Some(b) = board_id(d, *b) {
                d.duplicate_board(&b);
            }
        }
        Op::DeleteBoard(b) => {
            if let Some(b) = board_id(d, *b) {
                d.delete_board(&b);
            }
        }
        Op::ReorderBoards(from, to) => {
            d.reorder_boards(*from, *to);
        }
        Op::CreateColumn(b) => {
            if let Some(b) = board_id(d, *b) {
                d.create_column(&b, "Column", None);
            }
        }
        Op::DeleteColumn(c) => {
            if let Some(c) = column_id(d, *c) {
                d.delete_column(&c);
            }
        }
        Op::MoveColumn(b, c, index) => {
            if let (Some(b), Some(c)) = (board_id(d, *b), column_id(d, *c)) {
                d.move_column(&b, &c, *index);
            }
        }
        Op::CreateCard(c) => {
            if let Some(c) = column_id(d, *c) {
                d.create_card(&c, "Card");
            }
        }
        Op::DeleteCard(k) => {
            if let Some(k) = card_id(d, *k) {
                d.delete_card(&k);
            }
        }
        Op::MoveCard(k, c, index) => {
            if let (Some(k), Some(c)) = (card_id(d, *k), column_id(d, *c)) {
                let from = d.cards[&k].column_id.clone();
                d.move_card(&k, &from, &c, *index);
            }
        }
        Op::MoveCardsToColumn(ks, c) => {
            let ks = card_ids(d, ks);
            if let Some(c) = column_id(d, *c) {
                let anchor = d.columns[&c].card_ids.first().cloned();
                d.move_cards_to_column(&ks, &c, anchor.as_deref());
            }
        }
        Op::DuplicateCard(k) => {
            if let Some(k) = card_id(d, *k) {
                d.duplicate_card(&k);
            }
        }
        Op::BulkDelete(ks) => {
            let ks = card_ids(d, ks);
            d.bulk_delete(&ks);
        }
        Op::BulkMove(ks, c) => {
            let ks = card_ids(d, ks);
            if let Some(c) = column_id(d, *c) {
                d.bulk_move_to_column(&ks, &c);
            }
        }
        Op::CreateLabel => {
            d.create_label("Label", "#f00", None);
        }
        Op::RenameLabel(l) => {
            if let Some(l) = label_id(d, *l) {
                let patch = LabelPatch {
                    name: Some(format!("Renamed {}", l)),
                    ..LabelPatch::default()
                };
                d.update_label(&l, &patch);
            }
        }
        Op::DeleteLabel(l) => {
            if let Some(l) = label_id(d, *l) {
                d.delete_label(&l);
            }
        }
        Op::LabelCard(k, l) => {
            if let (Some(k), Some(l)) = (card_id(d, *k), label_id(d, *l)) {
                d.add_label_to_card(&k, &l);
            }
        }
        Op::CopyCards(_) | Op::PasteCards(_) | Op::Undo | Op::Redo => {}
    }
}

/// Card label copies must match a global label exactly.
fn label_copy_violations(d: &BoardData) -> Vec<String> {
    d.cards
        .values()
        .flat_map(|card| {
            card.labels
                .iter()
                .filter(|copy| !d.global_labels.contains(*copy))
                .map(move |copy| format!("card {} has stale label {}", card.id, copy.id))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_any_operation_sequence_keeps_model_consistent(
        ops in prop::collection::vec(op_strategy(), 1..60)
    ) {
        let mut store = BoardStore::new(50);
        let mut clipboard = Vec::new();
        for op in &ops {
            apply(&mut store, &mut clipboard, op);
            let data = store.data();
            let mut problems = data.invariant_violations();
            problems.extend(label_copy_violations(&data));
            prop_assert!(problems.is_empty(), "after {:?}: {:?}", op, problems);
        }
    }
}
