/// Persistence of named JSON documents.
///
/// - [`DurableStore`]: one JSON file with a single-generation backup and
///   crash-safe replace.
/// - [`StoreHandle`]: cloneable handle to the task that owns the store.
/// - [`WriteBuffer`]: debounced, coalescing writer in front of the handle.
pub mod actor;
pub mod buffer;
pub mod document;
pub mod durable;

use std::path::PathBuf;

pub use actor::StoreHandle;
pub use buffer::{BufferTiming, WriteBuffer};
pub use document::{commit_document, read_document, write_document};
pub use durable::DurableStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Not a JSON object: {}", .0.display())]
    NotAnObject(PathBuf),

    #[error("Store task is no longer running")]
    Closed,
}
