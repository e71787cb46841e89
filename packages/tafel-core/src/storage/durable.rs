/// Crash-safe key/value JSON file.
///
/// Layout next to the primary file `<name>`:
/// - `<name>.bak`: the previous committed generation
/// - `<name>.tmp`: content being written
///
/// Save order is tmp write + fsync, primary -> backup, tmp -> primary,
/// directory fsync. At every point either the old content (primary or
/// backup) or the new content (primary) is readable.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::StorageError;
use crate::sync::ContentFingerprint;

pub struct DurableStore {
    path: PathBuf,
    entries: Map<String, Value>,
    last_commit: Option<ContentFingerprint>,
}

impl DurableStore {
    /// Load the store at `path`. Tries the primary file, then the backup;
    /// the first one that parses as a JSON object wins. If neither does the
    /// store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let backup = backup_path(&path);

        let entries = match read_object(&path) {
            Ok(entries) => entries,
            Err(primary_err) => {
                if path.exists() {
                    log::warn!(
                        target: "tafel.store",
                        "Primary store {} unreadable: {}",
                        path.display(),
                        primary_err
                    );
                }
                match read_object(&backup) {
                    Ok(entries) => {
                        log::warn!(
                            target: "tafel.store",
                            "Recovered store from backup {}",
                            backup.display()
                        );
                        entries
                    }
                    Err(_) => {
                        log::info!(
                            target: "tafel.store",
                            "No readable store at {}, starting empty",
                            path.display()
                        );
                        Map::new()
                    }
                }
            }
        };

        Self {
            path,
            entries,
            last_commit: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        backup_path(&self.path)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// Fingerprint of the bytes of the last successful save by this store.
    pub fn last_commit(&self) -> Option<&ContentFingerprint> {
        self.last_commit.as_ref()
    }

    /// Update `key` and save immediately. On a disk error the in-memory
    /// value is kept; the next successful save persists it.
    pub fn set(&mut self, key: &str, value: Value) -> Result<ContentFingerprint, StorageError> {
        self.entries.insert(key.to_string(), value);
        self.save()
    }

    /// Like [`set`](Self::set), but a failed save restores the previous
    /// value of `key`, so the failed change is never visible to readers.
    pub fn set_or_revert(&mut self, key: &str, value: Value) -> Result<ContentFingerprint, StorageError> {
        let previous = self.entries.insert(key.to_string(), value);
        let result = self.save();
        if result.is_err() {
            match previous {
                Some(previous) => {
                    self.entries.insert(key.to_string(), previous);
                }
                None => {
                    self.entries.remove(key);
                }
            }
        }
        result
    }

    /// Remove `key` and save. Returns whether the key existed.
    pub fn delete(&mut self, key: &str) -> Result<bool, StorageError> {
        if self.entries.remove(key).is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    fn save(&mut self) -> Result<ContentFingerprint, StorageError> {
        let content = serde_json::to_string(&self.entries)?;
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let tmp = tmp_path(&self.path);
        let mut file = fs::File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        if self.path.exists() {
            if let Err(e) = fs::rename(&self.path, backup_path(&self.path)) {
                log::warn!(
                    target: "tafel.store",
                    "Backup rotation failed for {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
        fs::rename(&tmp, &self.path)?;

        if let Some(dir) = self.path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }

        let fingerprint = ContentFingerprint::from_content(&content);
        log::debug!(
            target: "tafel.store",
            "Committed {} ({} bytes, {})",
            self.path.display(),
            content.len(),
            &fingerprint.as_str()[..12]
        );
        self.last_commit = Some(fingerprint.clone());
        Ok(fingerprint)
    }
}

fn read_object(path: &Path) -> Result<Map<String, Value>, StorageError> {
    let content = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map),
        _ => Err(StorageError::NotAnObject(path.to_path_buf())),
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

pub(crate) fn backup_path(path: &Path) -> PathBuf {
    sibling(path, ".bak")
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    sibling(path, ".tmp")
}
