/// Debounced write buffer in front of the store.
///
/// Staged values are coalesced per key (latest wins) and committed when the
/// debounce window elapses without a newer write. Independent of that timer,
/// pending entries are flushed every safety interval, on visibility loss and
/// on shutdown.
use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::StoreHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTiming {
    pub debounce: Duration,
    pub safety_flush: Duration,
}

impl Default for BufferTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            safety_flush: Duration::from_secs(15),
        }
    }
}

enum BufferCommand {
    Stage { key: String, value: Value },
    Flush { reason: FlushReason, reply: oneshot::Sender<()> },
}

#[derive(Debug, Clone, Copy)]
enum FlushReason {
    Requested,
    VisibilityLost,
    Shutdown,
}

#[derive(Clone)]
pub struct WriteBuffer {
    tx: mpsc::UnboundedSender<BufferCommand>,
}

impl WriteBuffer {
    pub fn spawn(store: StoreHandle, timing: BufferTiming) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(store, timing, rx));
        (Self { tx }, task)
    }

    /// Stage `value` for `key`, replacing anything already pending for it,
    /// and restart the debounce window. Never blocks.
    pub fn stage(&self, key: &str, value: Value) {
        let command = BufferCommand::Stage {
            key: key.to_string(),
            value,
        };
        if self.tx.send(command).is_err() {
            log::error!(target: "tafel.buffer", "Write buffer stopped, dropping write for '{}'", key);
        }
    }

    /// Commit everything pending now.
    pub async fn flush(&self) {
        self.request_flush(FlushReason::Requested).await;
    }

    pub async fn visibility_lost(&self) {
        self.request_flush(FlushReason::VisibilityLost).await;
    }

    /// Flush and stop the buffer task. Later stages are dropped.
    pub async fn shutdown(&self) {
        self.request_flush(FlushReason::Shutdown).await;
    }

    async fn request_flush(&self, reason: FlushReason) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(BufferCommand::Flush { reason, reply }).is_ok() {
            let _ = rx.await;
        }
    }
}

async fn run(
    store: StoreHandle,
    timing: BufferTiming,
    mut rx: mpsc::UnboundedReceiver<BufferCommand>,
) {
    let mut pending: BTreeMap<String, Value> = BTreeMap::new();
    let mut deadline: Option<Instant> = None;
    let mut safety = time::interval_at(Instant::now() + timing.safety_flush, timing.safety_flush);
    safety.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(BufferCommand::Stage { key, value }) => {
                    pending.insert(key, value);
                    deadline = Some(Instant::now() + timing.debounce);
                }
                Some(BufferCommand::Flush { reason, reply }) => {
                    if !pending.is_empty() {
                        log::debug!(target: "tafel.buffer", "Flush ({:?})", reason);
                    }
                    flush_pending(&store, &mut pending).await;
                    deadline = None;
                    let _ = reply.send(());
                    if matches!(reason, FlushReason::Shutdown) {
                        break;
                    }
                }
                None => {
                    flush_pending(&store, &mut pending).await;
                    break;
                }
            },
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                flush_pending(&store, &mut pending).await;
            }
            _ = safety.tick() => {
                if !pending.is_empty() {
                    log::debug!(target: "tafel.buffer", "Safety flush of {} pending entries", pending.len());
                    flush_pending(&store, &mut pending).await;
                    deadline = None;
                }
            }
        }
    }
    log::info!(target: "tafel.buffer", "Write buffer stopped");
}

/// Disk errors are logged by the store task and not retried here; the
/// store keeps the value in memory and the next save commits it.
async fn flush_pending(store: &StoreHandle, pending: &mut BTreeMap<String, Value>) {
    for (key, value) in std::mem::take(pending) {
        if let Err(e) = store.set(&key, value).await {
            log::error!(target: "tafel.buffer", "Flush of '{}' failed: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DurableStore;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};
    use tokio::time::sleep;

    fn setup() -> (TempDir, StoreHandle, WriteBuffer) {
        let dir = tempdir().unwrap();
        let (store, _) = StoreHandle::spawn(DurableStore::open(dir.path().join("store.json")));
        let (buffer, _) = WriteBuffer::spawn(store.clone(), BufferTiming::default());
        (dir, store, buffer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_window_resets_on_new_write() {
        let (_dir, store, buffer) = setup();

        buffer.stage("k", json!(1));
        sleep(Duration::from_millis(400)).await;
        buffer.stage("k", json!(2));
        sleep(Duration::from_millis(400)).await;
        assert_eq!(store.get("k").await.unwrap(), None);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(store.get("k").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_value_wins_within_window() {
        let (_dir, store, buffer) = setup();
        for i in 0..5 {
            buffer.stage("k", json!(i));
        }
        buffer.stage("other", json!("x"));
        sleep(Duration::from_millis(600)).await;

        assert_eq!(store.get("k").await.unwrap(), Some(json!(4)));
        assert_eq!(store.get("other").await.unwrap(), Some(json!("x")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_safety_flush_under_continuous_writes() {
        let (_dir, store, buffer) = setup();
        for i in 0..160u64 {
            buffer.stage("k", json!(i));
            sleep(Duration::from_millis(100)).await;
        }

        // The debounce timer never got to fire; only the safety net did.
        let flushed = store.get("k").await.unwrap().and_then(|v| v.as_u64());
        assert!(matches!(flushed, Some(n) if n < 159), "got {:?}", flushed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_flushes() {
        let (_dir, store, buffer) = setup();

        buffer.stage("k", json!("a"));
        buffer.flush().await;
        assert_eq!(store.get("k").await.unwrap(), Some(json!("a")));

        buffer.stage("k", json!("b"));
        buffer.visibility_lost().await;
        assert_eq!(store.get("k").await.unwrap(), Some(json!("b")));

        buffer.stage("k", json!("c"));
        buffer.shutdown().await;
        assert_eq!(store.get("k").await.unwrap(), Some(json!("c")));

        buffer.stage("k", json!("dropped"));
        sleep(Duration::from_secs(1)).await;
        assert_eq!(store.get("k").await.unwrap(), Some(json!("c")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_buffer_never_writes() {
        let (dir, _store, _buffer) = setup();
        sleep(Duration::from_secs(40)).await;
        assert!(!dir.path().join("store.json").exists());
    }
}
