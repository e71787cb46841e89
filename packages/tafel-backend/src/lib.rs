/// Tafel backend: config loading, store and session setup, mirror API server.
pub mod api;
pub mod config;
pub mod log_bridge;
pub mod server;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use tafel_core::collaborators::DirectoryAttachments;
use tafel_core::storage::{DurableStore, StoreHandle, WriteBuffer};
use tafel_core::sync::ChangeNotifier;
use tafel_core::BoardSession;

use crate::config::ServerConfig;
use crate::state::AppState;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Both writers of one store file, wired together.
pub struct Backend {
    pub session: Arc<BoardSession>,
    pub state: AppState,
}

/// Open the store, start its owner task and the write buffer, and hydrate
/// the primary session. The mirror state shares the same store handle.
pub async fn assemble(config: &ServerConfig) -> Backend {
    let persistence = &config.persistence;
    let (store, _store_task) = StoreHandle::spawn(DurableStore::open(config.store_path()));
    let (buffer, _buffer_task) = WriteBuffer::spawn(store.clone(), persistence.buffer_timing());

    let session = BoardSession::new(
        &persistence.document_key,
        store.clone(),
        buffer,
        persistence.history_limit,
    )
    .with_attachments(Arc::new(DirectoryAttachments::new(config.attachments_path())));
    if let Err(e) = session.hydrate().await {
        log::error!(
            target: "tafel.startup",
            "Failed to hydrate '{}', starting empty: {}",
            persistence.document_key,
            e
        );
    }

    let state = AppState::new(store, ChangeNotifier::new(), &persistence.document_key, config.port);
    Backend {
        session: Arc::new(session),
        state,
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = log_bridge::init(log_bridge::default_log_path()) {
        log_bridge::write_fallback_line(&format!("failed to initialize backend logger: {}", e));
    }

    let config = config::load_config(&config::default_config_path());
    log::info!(target: "tafel.startup", "Store file: {}", config.store_path().display());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let backend = assemble(&config).await;

    let listener = backend
        .session
        .spawn_rehydrate_listener(backend.state.notifier.subscribe(), shutdown_rx.clone());
    let server = server::spawn_server(backend.state.clone(), shutdown_rx).await?;
    log::info!(target: "tafel.startup", "Ready on port {}", server.addr.port());

    tokio::signal::ctrl_c().await?;
    log::info!(target: "tafel.shutdown", "Interrupt received, flushing pending writes");
    backend.session.shutdown().await;
    let _ = shutdown_tx.send(true);

    if tokio::time::timeout(SHUTDOWN_GRACE, server.task).await.is_err() {
        log::warn!(target: "tafel.shutdown", "Server did not stop within {:?}", SHUTDOWN_GRACE);
    }
    let _ = listener.await;
    log::info!(target: "tafel.shutdown", "Shutdown complete");
    Ok(())
}
