/// Primary writer: the in-memory board model backed by the debounced buffer.
///
/// Every committed transition is encoded once, fingerprinted, registered as a
/// self-write and staged. Rehydrate signals from the mirror server re-read the
/// document; when the disk already holds one of our own staged documents the
/// signal is ignored and undo history survives.
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::board::{BoardStore, ViewState};
use crate::collaborators::{ArchiveSink, AttachmentStore, NoopArchive, NoopAttachments};
use crate::storage::document::encode;
use crate::storage::{read_document, StorageError, StoreHandle, WriteBuffer};
use crate::sync::{ContentFingerprint, DocumentEvent, SelfWriteTracker};
use crate::types::{BoardData, Card, DeletedSubtree, PersistedDocument, DOCUMENT_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RehydrateOutcome {
    /// Disk holds a document this session staged itself.
    Suppressed,
    /// The model was replaced with the document on disk.
    Rehydrated,
    /// Signal for another key, or nothing on disk.
    Ignored,
}

pub struct BoardSession {
    key: String,
    store: StoreHandle,
    buffer: WriteBuffer,
    board: RwLock<BoardStore>,
    version: AtomicU64,
    self_writes: Mutex<SelfWriteTracker>,
    archive: Arc<dyn ArchiveSink>,
    attachments: Arc<dyn AttachmentStore>,
}

impl BoardSession {
    pub fn new(key: &str, store: StoreHandle, buffer: WriteBuffer, history_limit: usize) -> Self {
        Self {
            key: key.to_string(),
            store,
            buffer,
            board: RwLock::new(BoardStore::new(history_limit)),
            version: AtomicU64::new(DOCUMENT_VERSION),
            self_writes: Mutex::new(SelfWriteTracker::new()),
            archive: Arc::new(NoopArchive),
            attachments: Arc::new(NoopAttachments),
        }
    }

    pub fn with_archive(mut self, archive: Arc<dyn ArchiveSink>) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_attachments(mut self, attachments: Arc<dyn AttachmentStore>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the document from disk. Clears undo history.
    pub async fn hydrate(&self) -> Result<(), StorageError> {
        let doc = read_document(&self.store, &self.key)
            .await?
            .unwrap_or_else(|| PersistedDocument::new(BoardData::default()));
        log::info!(
            target: "tafel.session",
            "Hydrated '{}': {} boards, {} cards",
            self.key,
            doc.state.boards.len(),
            doc.state.cards.len()
        );
        self.install(doc, false);
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<BoardData> {
        self.read().data()
    }

    pub fn view(&self) -> ViewState {
        self.read().view().clone()
    }

    pub fn can_undo(&self) -> bool {
        self.read().history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.read().history().can_redo()
    }

    /// Run one operation of the mutation vocabulary as a single transition
    /// and stage the result if anything changed.
    ///
    /// Staging happens under the model lock, so staged documents reach the
    /// buffer in the same order as the transitions that produced them.
    pub fn mutate<R>(&self, op: impl FnOnce(&mut BoardData) -> R) -> R {
        let mut board = self.write();
        let before = board.revision();
        let result = board.apply(op);
        if board.revision() != before {
            self.stage(&board.data());
        }
        result
    }

    pub fn undo(&self) -> bool {
        self.step(BoardStore::undo)
    }

    pub fn redo(&self) -> bool {
        self.step(BoardStore::redo)
    }

    fn step(&self, op: fn(&mut BoardStore) -> bool) -> bool {
        let mut board = self.write();
        if !op(&mut *board) {
            return false;
        }
        self.stage(&board.data());
        true
    }

    // ── Deletes hand their subtree to the archive ───────────────────────

    pub fn delete_board(&self, board_id: &str) -> bool {
        let removed = self.mutate(|d| d.delete_board(board_id));
        self.archive_removed(removed.into_iter())
    }

    pub fn delete_column(&self, column_id: &str) -> bool {
        let removed = self.mutate(|d| d.delete_column(column_id));
        self.archive_removed(removed.into_iter())
    }

    pub fn delete_card(&self, card_id: &str) -> bool {
        let removed = self.mutate(|d| d.delete_card(card_id));
        self.archive_removed(removed.map(|card| DeletedSubtree::Card { card }).into_iter())
    }

    pub fn bulk_delete(&self, card_ids: &[String]) -> usize {
        let removed = self.mutate(|d| d.bulk_delete(card_ids));
        let count = removed.len();
        self.archive_removed(removed.into_iter().map(|card| DeletedSubtree::Card { card }));
        count
    }

    fn archive_removed(&self, removed: impl Iterator<Item = DeletedSubtree>) -> bool {
        let mut any = false;
        for subtree in removed {
            self.archive.archive(subtree);
            any = true;
        }
        any
    }

    // ── Attachments ─────────────────────────────────────────────────────

    /// Copy `source` into managed storage and attach it to the card.
    pub fn attach_file(&self, card_id: &str, source: &Path) -> std::io::Result<Option<String>> {
        if !self.snapshot().cards.contains_key(card_id) {
            return Ok(None);
        }
        let managed = self.attachments.import_file(source)?;
        let path = managed.path.to_string_lossy().to_string();
        let id = self.mutate(|d| d.add_attachment(card_id, &managed.name, &path, managed.kind, managed.size));
        if id.is_none() {
            self.remove_managed_file(&path);
        }
        Ok(id)
    }

    /// Remove the attachment record. The backing file is removed once no
    /// card references it any more; duplicated cards share files.
    pub fn remove_attachment(&self, card_id: &str, attachment_id: &str) -> bool {
        let Some(removed) = self.mutate(|d| d.remove_attachment(card_id, attachment_id)) else {
            return false;
        };
        let still_referenced = self
            .snapshot()
            .cards
            .values()
            .any(|c| c.attachments.iter().any(|a| a.path == removed.path));
        if !still_referenced {
            self.remove_managed_file(&removed.path);
        }
        true
    }

    fn remove_managed_file(&self, path: &str) {
        if let Err(e) = self.attachments.remove_file(path) {
            log::warn!(target: "tafel.attachments", "Failed to remove {}: {}", path, e);
        }
    }

    // ── View state ──────────────────────────────────────────────────────

    pub fn set_active_board(&self, board_id: Option<&str>) {
        let mut board = self.write();
        let exists = board_id.map_or(true, |id| board.data().boards.contains_key(id));
        if exists {
            board.view_mut().active_board_id = board_id.map(str::to_string);
        }
    }

    pub fn select_cards(&self, card_ids: &[String]) {
        let mut board = self.write();
        let data = board.data();
        board.view_mut().selected_card_ids = card_ids
            .iter()
            .filter(|id| data.cards.contains_key(*id))
            .cloned()
            .collect();
    }

    /// Put copies of the given cards on the clipboard. Returns how many
    /// were found.
    pub fn copy_cards(&self, card_ids: &[String]) -> usize {
        let mut board = self.write();
        let data = board.data();
        let cards: Vec<Card> = card_ids
            .iter()
            .filter_map(|id| data.cards.get(id).cloned())
            .collect();
        let count = cards.len();
        board.view_mut().clipboard = cards;
        count
    }

    pub fn paste_cards_to_column(&self, column_id: &str) -> Vec<String> {
        let clipboard = self.read().view().clipboard.clone();
        if clipboard.is_empty() {
            return Vec::new();
        }
        self.mutate(|d| d.paste_cards_to_column(&clipboard, column_id))
    }

    // ── Persistence ─────────────────────────────────────────────────────

    pub async fn flush(&self) {
        self.buffer.flush().await;
    }

    pub async fn visibility_lost(&self) {
        self.buffer.visibility_lost().await;
    }

    pub async fn shutdown(&self) {
        self.buffer.shutdown().await;
    }

    /// React to a rehydrate signal.
    pub async fn handle_event(&self, event: &DocumentEvent) -> Result<RehydrateOutcome, StorageError> {
        if event.key() != self.key {
            return Ok(RehydrateOutcome::Ignored);
        }
        self.reconcile().await
    }

    /// Compare the document on disk with what this session wrote and reload
    /// if it came from someone else.
    pub async fn reconcile(&self) -> Result<RehydrateOutcome, StorageError> {
        let Some(value) = self.store.get(&self.key).await? else {
            return Ok(RehydrateOutcome::Ignored);
        };
        let fingerprint = ContentFingerprint::from_value(&value);
        {
            let mut tracker = self.tracker();
            tracker.cleanup_expired();
            if tracker.check_and_consume(&self.key, &fingerprint) {
                log::debug!(target: "tafel.session", "Rehydrate suppressed, disk holds our own write");
                return Ok(RehydrateOutcome::Suppressed);
            }
        }
        let doc: PersistedDocument = serde_json::from_value(value)?;
        log::info!(target: "tafel.session", "Rehydrating '{}' after external write", self.key);
        // Restaging the hydrated document supersedes any stale pending write.
        self.install(doc, true);
        Ok(RehydrateOutcome::Rehydrated)
    }

    /// Consume rehydrate signals until `shutdown` flips or the channel closes.
    pub fn spawn_rehydrate_listener(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<DocumentEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => {
                        let result = match event {
                            Ok(event) => session.handle_event(&event).await,
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                log::warn!(target: "tafel.session", "Missed {} rehydrate signals, reconciling", n);
                                session.reconcile().await
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        };
                        if let Err(e) = result {
                            log::error!(target: "tafel.session", "Rehydrate failed: {}", e);
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
            log::info!(target: "tafel.session", "Rehydrate listener stopped");
        })
    }

    fn install(&self, doc: PersistedDocument, restage: bool) {
        let mut board = self.write();
        self.version.store(doc.version, Ordering::SeqCst);
        board.hydrate(doc.state);
        if restage {
            self.stage(&board.data());
        }
    }

    /// Never takes the model lock; callers hold it.
    fn stage(&self, data: &BoardData) {
        let doc = PersistedDocument {
            state: data.clone(),
            version: self.version.load(Ordering::SeqCst),
        };
        match encode(&doc) {
            Ok(value) => {
                self.tracker()
                    .register(&self.key, ContentFingerprint::from_value(&value));
                self.buffer.stage(&self.key, value);
            }
            Err(e) => log::error!(target: "tafel.session", "Failed to encode '{}': {}", self.key, e),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BoardStore> {
        self.board.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BoardStore> {
        self.board.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn tracker(&self) -> MutexGuard<'_, SelfWriteTracker> {
        self.self_writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
