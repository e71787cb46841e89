/// Persistence settings shared by the primary session and the mirror server.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::storage::BufferTiming;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceSettings {
    /// Store key of the board document.
    #[serde(default = "default_document_key")]
    pub document_key: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_safety_flush_secs")]
    pub safety_flush_secs: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_document_key() -> String {
    "board-data".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_safety_flush_secs() -> u64 {
    15
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl PersistenceSettings {
    pub fn buffer_timing(&self) -> BufferTiming {
        BufferTiming {
            debounce: Duration::from_millis(self.debounce_ms),
            safety_flush: Duration::from_secs(self.safety_flush_secs.max(1)),
        }
    }
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            document_key: default_document_key(),
            debounce_ms: default_debounce_ms(),
            safety_flush_secs: default_safety_flush_secs(),
            history_limit: default_history_limit(),
        }
    }
}
