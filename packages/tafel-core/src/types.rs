use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written by the primary session into the persisted document.
/// The mirror server re-writes whatever version it read.
pub const DOCUMENT_VERSION: u64 = 1;

/// Column titles used when a board is created without explicit columns.
pub const DEFAULT_COLUMN_TITLES: [&str; 4] = ["To Do", "In Progress", "Review", "Done"];

/// Fresh entity identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as an ISO-8601 UTC timestamp with millisecond precision.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    Image,
    #[default]
    File,
}

/// Global label. Cards carry denormalized copies of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: String,
}

impl Subtask {
    pub fn new(title: &str) -> Self {
        Self {
            id: new_id(),
            title: title.to_string(),
            completed: false,
            created_at: timestamp(),
        }
    }
}

/// Checklist items share the subtask shape.
pub type ChecklistItem = Subtask;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub updated_at: String,
}

/// File attached to a card. `path` points into the managed attachments
/// directory; the bytes are owned by the attachment collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: AttachmentType,
    #[serde(default)]
    pub size: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub column_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub board_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub card_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_progress: Option<bool>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub column_id: String,
    pub board_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub checklists: Vec<Checklist>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Card {
    /// Blank card placed in `column`.
    pub fn new(column: &Column, title: &str) -> Self {
        let now = timestamp();
        Self {
            id: new_id(),
            column_id: column.id.clone(),
            board_id: column.board_id.clone(),
            title: title.to_string(),
            description: String::new(),
            priority: Priority::None,
            due_date: None,
            labels: Vec::new(),
            subtasks: Vec::new(),
            checklists: Vec::new(),
            comments: Vec::new(),
            attachments: Vec::new(),
            completed: false,
            pinned: None,
            cover_image_id: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// The persistable slice of the board model: everything undo history and
/// the on-disk document cover. UI-only state lives elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardData {
    #[serde(default)]
    pub boards: BTreeMap<String, Board>,
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
    #[serde(default)]
    pub cards: BTreeMap<String, Card>,
    #[serde(default)]
    pub board_order: Vec<String>,
    #[serde(default)]
    pub global_labels: Vec<Label>,
}

/// On-disk envelope stored under the board document key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDocument {
    pub state: BoardData,
    #[serde(default)]
    pub version: u64,
}

impl PersistedDocument {
    pub fn new(state: BoardData) -> Self {
        Self {
            state,
            version: DOCUMENT_VERSION,
        }
    }
}

/// Subtree removed by a cascading delete, handed to the archive collaborator
/// before the in-memory data is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DeletedSubtree {
    Board {
        board: Board,
        columns: Vec<Column>,
        cards: Vec<Card>,
    },
    Column {
        column: Column,
        cards: Vec<Card>,
    },
    Card {
        card: Card,
    },
}

/// Board row for listings, with denormalized counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub column_count: usize,
    pub card_count: usize,
    pub columns: Vec<ColumnSummary>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub id: String,
    pub title: String,
    pub card_count: usize,
}
