use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tafel_core::storage::{commit_document, read_document, StorageError};
use tafel_core::sync::DocumentEvent;
use tafel_core::types::{BoardData, PersistedDocument};

mod boards;
mod cards;
mod events;
pub mod host_guard;

use crate::state::AppState;

/// Mirror API routes, nested under `/api`.
///
///   GET    /boards                           -> board summaries
///   POST   /boards                           -> create board (+ default columns)
///   GET    /boards/:boardId                  -> board with nested columns and cards
///   DELETE /boards/:boardId                  -> cascade delete
///   POST   /boards/:boardId/columns          -> create column
///   POST   /boards/:boardId/cards            -> create card in one of its columns
///   GET    /cards/:cardId                    -> card
///   PATCH  /cards/:cardId                    -> whitelisted card fields
///   DELETE /cards/:cardId                    -> delete card
///   POST   /cards/:cardId/move               -> move/reorder
///   POST   /cards/:cardId/subtasks           -> add subtask
///   PATCH  /cards/:cardId/subtasks/:subId    -> update subtask
///   DELETE /cards/:cardId/subtasks/:subId    -> delete subtask
///   POST   /cards/:cardId/comments           -> add comment
///   GET    /events                           -> SSE stream of rehydrate signals
///   GET    /status                           -> health check
///   GET    /logs?limit=n                     -> recent backend log entries
///   GET    /logs/stream                      -> SSE stream of new log entries
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/boards", get(boards::list_boards).post(boards::create_board))
        .route(
            "/boards/{board_id}",
            get(boards::get_board).delete(boards::delete_board),
        )
        .route("/boards/{board_id}/columns", post(boards::create_column))
        .route("/boards/{board_id}/cards", post(boards::create_card))
        .route(
            "/cards/{card_id}",
            get(cards::get_card)
                .patch(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/cards/{card_id}/move", post(cards::move_card))
        .route("/cards/{card_id}/subtasks", post(cards::add_subtask))
        .route(
            "/cards/{card_id}/subtasks/{subtask_id}",
            patch(cards::update_subtask).delete(cards::delete_subtask),
        )
        .route("/cards/{card_id}/comments", post(cards::add_comment))
        .route("/events", get(events::sse_events))
        .route("/status", get(events::status))
        .route("/logs", get(events::list_logs))
        .route("/logs/stream", get(events::stream_logs))
}

// ── Shared types and helpers used across sub-modules ────────────────────

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{} not found: {}", kind, id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();
        log_api_issue(status, "tafel.api", &error);
        (status, Json(ErrorResponse { error })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn log_api_issue(status: StatusCode, target: &'static str, message: impl AsRef<str>) {
    let message = message.as_ref();
    if status.is_server_error() {
        log::error!(target: target, "{}", message);
    } else {
        log::warn!(target: target, "{}", message);
    }
}

/// Decode a JSON request body. An empty body decodes to the default value
/// so optional-only bodies may be omitted.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("{} is required", field))),
    }
}

/// Current model on disk; empty if the document was never written.
async fn read_state(state: &AppState) -> ApiResult<BoardData> {
    Ok(read_document(&state.store, &state.document_key)
        .await?
        .map(|doc| doc.state)
        .unwrap_or_default())
}

/// Read the full document, run `op` on a copy of its model and write the
/// whole document back with its version untouched, then signal the primary
/// session. Nothing is written when `op` fails, and a failed save leaves the
/// stored document unchanged.
///
/// Only mirror requests are serialized here; a primary flush that lands
/// between the read and the write is overwritten.
async fn mutate_document<R>(
    state: &AppState,
    origin: &str,
    op: impl FnOnce(&mut BoardData) -> ApiResult<R>,
) -> ApiResult<R> {
    let guard = state.write_lock.lock().await;
    let mut doc = read_document(&state.store, &state.document_key)
        .await?
        .unwrap_or_else(|| PersistedDocument::new(BoardData::default()));
    let result = op(&mut doc.state)?;
    let fingerprint = commit_document(&state.store, &state.document_key, &doc).await?;
    drop(guard);

    state.notifier.notify(DocumentEvent::Rehydrate {
        key: state.document_key.clone(),
        fingerprint,
        origin: origin.to_string(),
    });
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Body {
        title: Option<String>,
    }

    #[test]
    fn test_empty_body_decodes_to_default() {
        let body: Body = parse_body(&Bytes::from_static(b"  \n")).unwrap();
        assert_eq!(body, Body::default());
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let err = parse_body::<Body>(&Bytes::from_static(b"{\"title\": ")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(Some("  ".into()), "title").is_err());
        assert!(required(None, "title").is_err());
        assert_eq!(required(Some("x".into()), "title").unwrap(), "x");
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiError::not_found("Card", "c1").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Storage(StorageError::Closed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
