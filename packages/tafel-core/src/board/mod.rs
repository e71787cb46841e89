/// Normalized board model and its closed mutation vocabulary.
///
/// Operations are methods on [`BoardData`](crate::types::BoardData) and are
/// shared by the primary in-memory store and the mirror server, which runs
/// them against the document read from disk.
mod boards;
mod bulk;
mod cards;
mod columns;
mod items;
mod labels;
mod patch;
mod query;
pub mod store;

pub use patch::{BoardPatch, CardPatch, ColumnPatch, LabelPatch, SubtaskPatch};
pub use store::{BoardStore, ViewState};
