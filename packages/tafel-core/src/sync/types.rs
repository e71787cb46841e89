/// Event and fingerprint types shared by the two writers.
use serde::{Deserialize, Serialize};

/// SHA-256 fingerprint of content, used to tell our own writes apart from
/// someone else's and to identify the last physical commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(pub String);

impl ContentFingerprint {
    /// Fingerprint raw content with normalized line endings.
    pub fn from_content(content: &str) -> Self {
        use sha2::{Digest, Sha256};
        let normalized = content.replace("\r\n", "\n");
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Fingerprint a JSON value in its compact serialization. Object keys
    /// serialize sorted, so equal values always fingerprint equally.
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self::from_content(&value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signals emitted after a document changed underneath the primary session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DocumentEvent {
    /// The document under `key` was written by `origin`; listeners holding an
    /// in-memory copy should re-read it.
    Rehydrate {
        key: String,
        fingerprint: ContentFingerprint,
        origin: String,
    },
}

impl DocumentEvent {
    pub fn key(&self) -> &str {
        match self {
            DocumentEvent::Rehydrate { key, .. } => key,
        }
    }
}
