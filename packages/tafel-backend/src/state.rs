/// Shared application state passed to axum handlers.
use std::sync::Arc;

use tafel_core::storage::StoreHandle;
use tafel_core::sync::ChangeNotifier;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    pub notifier: ChangeNotifier,
    pub document_key: String,
    pub port: u16,
    /// Held for one read-modify-write so mirror requests run one at a time.
    /// The primary session's flush does not take it.
    pub write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: StoreHandle, notifier: ChangeNotifier, document_key: &str, port: u16) -> Self {
        Self {
            store,
            notifier,
            document_key: document_key.to_string(),
            port,
            write_lock: Arc::new(Mutex::new(())),
        }
    }
}
