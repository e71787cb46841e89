/// HTTP server: spawns axum on a background tokio task, loopback only.
use std::net::{Ipv4Addr, SocketAddr};

use axum::{middleware, Router};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::api::api_router;
use crate::api::host_guard::{host_guard_middleware, HostAllowList};
use crate::state::AppState;

/// The host guard wraps everything, CORS preflights included.
pub fn build_router(state: AppState, allow: HostAllowList) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_router())
        .layer(cors)
        .layer(middleware::from_fn_with_state(allow, host_guard_middleware))
        .with_state(state)
}

pub struct RunningServer {
    pub addr: SocketAddr,
    pub task: JoinHandle<()>,
}

/// Bind `127.0.0.1:<state.port>` (0 picks a free port) and serve until
/// `shutdown` flips.
pub async fn spawn_server(
    mut state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<RunningServer, std::io::Error> {
    let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, state.port)).await?;
    let addr = listener.local_addr()?;
    state.port = addr.port();

    let app = build_router(state, HostAllowList::loopback(addr.port()));
    log::info!(target: "tafel.server", "Mirror API listening on http://{}", addr);

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await;
        if let Err(e) = result {
            log::error!(target: "tafel.server", "HTTP server exited with error: {}", e);
        }
    });

    Ok(RunningServer { addr, task })
}
