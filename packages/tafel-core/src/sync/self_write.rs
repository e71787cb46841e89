/// Self-write tracker using SHA-256 fingerprints.
///
/// Before staging a document for the write buffer the primary session
/// registers its fingerprint under the document key. When a rehydrate signal
/// arrives, the session fingerprints what is on disk and checks it here.
/// Match found: the disk already holds our own write, consume and skip the
/// reload. No match: external change, reload.
/// Staged values that were coalesced away never match; the TTL clears them.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::types::ContentFingerprint;

const FINGERPRINT_TTL: Duration = Duration::from_secs(60);

struct PendingFingerprint {
    fingerprint: ContentFingerprint,
    registered_at: Instant,
}

/// Tracks fingerprints of our own writes per document key.
pub struct SelfWriteTracker {
    pending: HashMap<String, Vec<PendingFingerprint>>,
}

impl SelfWriteTracker {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Expired fingerprints of every key are dropped first.
    pub fn register(&mut self, key: &str, fingerprint: ContentFingerprint) {
        self.cleanup_expired();
        let entry = self.pending.entry(key.to_string()).or_default();
        entry.push(PendingFingerprint {
            fingerprint,
            registered_at: Instant::now(),
        });
    }

    /// If `current` matches a pending self-write, consume it and return true.
    pub fn check_and_consume(&mut self, key: &str, current: &ContentFingerprint) -> bool {
        if let Some(entries) = self.pending.get_mut(key) {
            if let Some(pos) = entries.iter().position(|e| &e.fingerprint == current) {
                entries.remove(pos);
                if entries.is_empty() {
                    self.pending.remove(key);
                }
                return true;
            }
        }
        false
    }

    /// Remove expired fingerprints.
    pub fn cleanup_expired(&mut self) {
        let now = Instant::now();
        self.pending.retain(|_, entries| {
            entries.retain(|e| now.duration_since(e.registered_at) < FINGERPRINT_TTL);
            !entries.is_empty()
        });
    }

    pub fn has_pending(&self, key: &str) -> bool {
        self.pending.get(key).map_or(false, |e| !e.is_empty())
    }
}

impl Default for SelfWriteTracker {
    fn default() -> Self {
        Self::new()
    }
}
