/// Owner task for the [`DurableStore`].
///
/// All reads and writes of the shared document go through one task, so single
/// operations never interleave. A read followed by a write from the same
/// caller is two messages: another writer may commit in between, and the
/// later write wins.
use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::{DurableStore, StorageError};
use crate::sync::ContentFingerprint;

const COMMAND_CAPACITY: usize = 64;

enum Command {
    Get {
        key: String,
        reply: oneshot::Sender<Option<Value>>,
    },
    Set {
        key: String,
        value: Value,
        revert_on_error: bool,
        reply: oneshot::Sender<Result<ContentFingerprint, StorageError>>,
    },
    Delete {
        key: String,
        reply: oneshot::Sender<Result<bool, StorageError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Map<String, Value>>,
    },
    LastCommit {
        reply: oneshot::Sender<Option<ContentFingerprint>>,
    },
}

#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<Command>,
}

impl StoreHandle {
    /// Move `store` into its owner task. The task ends once every handle
    /// has been dropped.
    pub fn spawn(store: DurableStore) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let task = tokio::spawn(run(store, rx));
        (Self { tx }, task)
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.request(|reply| Command::Get {
            key: key.to_string(),
            reply,
        })
        .await
    }

    pub async fn set(&self, key: &str, value: Value) -> Result<ContentFingerprint, StorageError> {
        self.request(|reply| Command::Set {
            key: key.to_string(),
            value,
            revert_on_error: false,
            reply,
        })
        .await?
    }

    /// Set `key`, restoring its previous value if the save fails.
    pub async fn set_or_revert(&self, key: &str, value: Value) -> Result<ContentFingerprint, StorageError> {
        self.request(|reply| Command::Set {
            key: key.to_string(),
            value,
            revert_on_error: true,
            reply,
        })
        .await?
    }

    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.request(|reply| Command::Delete {
            key: key.to_string(),
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<Map<String, Value>, StorageError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn last_commit(&self) -> Result<Option<ContentFingerprint>, StorageError> {
        self.request(|reply| Command::LastCommit { reply }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, StorageError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| StorageError::Closed)?;
        rx.await.map_err(|_| StorageError::Closed)
    }
}

async fn run(mut store: DurableStore, mut rx: mpsc::Receiver<Command>) {
    log::info!(target: "tafel.store", "Store task started for {}", store.path().display());
    while let Some(command) = rx.recv().await {
        match command {
            Command::Get { key, reply } => {
                let _ = reply.send(store.get(&key).cloned());
            }
            Command::Set {
                key,
                value,
                revert_on_error,
                reply,
            } => {
                let result = if revert_on_error {
                    store.set_or_revert(&key, value)
                } else {
                    store.set(&key, value)
                };
                if let Err(ref e) = result {
                    log::error!(target: "tafel.store", "Failed to persist '{}': {}", key, e);
                }
                let _ = reply.send(result);
            }
            Command::Delete { key, reply } => {
                let result = store.delete(&key);
                if let Err(ref e) = result {
                    log::error!(target: "tafel.store", "Failed to persist delete of '{}': {}", key, e);
                }
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(store.entries().clone());
            }
            Command::LastCommit { reply } => {
                let _ = reply.send(store.last_commit().cloned());
            }
        }
    }
    log::info!(target: "tafel.store", "Store task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_handle_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let (store, _task) = StoreHandle::spawn(DurableStore::open(&path));

        assert_eq!(store.get("k").await.unwrap(), None);
        let fp = store.set("k", json!({"x": 1})).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"x": 1})));
        assert_eq!(store.last_commit().await.unwrap(), Some(fp));
        assert_eq!(store.snapshot().await.unwrap().len(), 1);

        assert!(store.delete("k").await.unwrap());
        assert_eq!(DurableStore::open(&path).get("k"), None);
    }

    #[tokio::test]
    async fn test_clones_share_one_owner() {
        let dir = tempdir().unwrap();
        let (a, _task) = StoreHandle::spawn(DurableStore::open(dir.path().join("s.json")));
        let b = a.clone();
        a.set("k", json!("from a")).await.unwrap();
        assert_eq!(b.get("k").await.unwrap(), Some(json!("from a")));
    }

    #[tokio::test]
    async fn test_set_or_revert_hides_failed_write() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let (store, _task) = StoreHandle::spawn(DurableStore::open(blocker.join("s.json")));

        assert!(store.set_or_revert("k", json!(1)).await.is_err());
        assert_eq!(store.get("k").await.unwrap(), None);

        assert!(store.set("k", json!(2)).await.is_err());
        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_closed_after_task_aborted() {
        let dir = tempdir().unwrap();
        let (store, task) = StoreHandle::spawn(DurableStore::open(dir.path().join("s.json")));
        task.abort();
        let _ = task.await;
        assert!(matches!(store.get("k").await, Err(StorageError::Closed)));
    }
}
