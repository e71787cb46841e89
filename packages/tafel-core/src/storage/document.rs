use serde_json::Value;

use super::{StorageError, StoreHandle};
use crate::sync::ContentFingerprint;
use crate::types::PersistedDocument;

/// Read and decode the board document stored under `key`.
pub async fn read_document(
    store: &StoreHandle,
    key: &str,
) -> Result<Option<PersistedDocument>, StorageError> {
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode and commit `doc` under `key`.
pub async fn write_document(
    store: &StoreHandle,
    key: &str,
    doc: &PersistedDocument,
) -> Result<ContentFingerprint, StorageError> {
    store.set(key, encode(doc)?).await
}

/// Like [`write_document`], but a failed save leaves the stored document
/// as it was.
pub async fn commit_document(
    store: &StoreHandle,
    key: &str,
    doc: &PersistedDocument,
) -> Result<ContentFingerprint, StorageError> {
    store.set_or_revert(key, encode(doc)?).await
}

pub(crate) fn encode(doc: &PersistedDocument) -> Result<Value, StorageError> {
    Ok(serde_json::to_value(doc)?)
}
