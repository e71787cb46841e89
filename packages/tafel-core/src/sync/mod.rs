/// Cross-writer consistency: fingerprints, self-write tracking and the
/// one-way rehydrate signal from the mirror server to the primary session.
pub mod self_write;
pub mod types;

use tokio::sync::broadcast;

pub use self_write::SelfWriteTracker;
pub use types::{ContentFingerprint, DocumentEvent};

const EVENT_CAPACITY: usize = 256;

/// Fire-and-forget fan-out of [`DocumentEvent`]s.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<DocumentEvent>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.tx.subscribe()
    }

    /// Returns false when nobody is listening. The event is dropped in that
    /// case and the listener stays stale until its next natural reload.
    pub fn notify(&self, event: DocumentEvent) -> bool {
        match self.tx.send(event) {
            Ok(n) => {
                log::debug!(target: "tafel.sync", "Rehydrate signal delivered to {} listener(s)", n);
                true
            }
            Err(_) => {
                log::debug!(target: "tafel.sync", "Rehydrate signal dropped, no listeners");
                false
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
