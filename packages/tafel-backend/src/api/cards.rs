use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use tafel_core::board::{CardPatch, SubtaskPatch};
use tafel_core::types::{BoardData, Card, Comment, Subtask};

use super::{mutate_document, parse_body, read_state, required, ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCardBody {
    column_id: Option<String>,
    /// Clamped to the destination length; appends when absent.
    index: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddSubtaskBody {
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddCommentBody {
    text: Option<String>,
}

fn card(data: &BoardData, card_id: &str) -> ApiResult<Card> {
    data.cards
        .get(card_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Card", card_id))
}

fn subtask(data: &BoardData, card_id: &str, subtask_id: &str) -> ApiResult<Subtask> {
    card(data, card_id)?
        .subtasks
        .into_iter()
        .find(|s| s.id == subtask_id)
        .ok_or_else(|| ApiError::not_found("Subtask", subtask_id))
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> ApiResult<Json<Card>> {
    let data = read_state(&state).await?;
    card(&data, &card_id).map(Json)
}

/// Only the fields of [`CardPatch`] are applied; anything else in the body
/// is ignored.
pub async fn update_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Card>> {
    let patch: CardPatch = parse_body(&body)?;
    let card = mutate_document(&state, "mirror.update_card", |data| {
        if !data.update_card(&card_id, &patch) {
            return Err(ApiError::not_found("Card", &card_id));
        }
        card(data, &card_id)
    })
    .await?;
    Ok(Json(card))
}

pub async fn delete_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    mutate_document(&state, "mirror.delete_card", |data| {
        data.delete_card(&card_id)
            .ok_or_else(|| ApiError::not_found("Card", &card_id))
    })
    .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn move_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Card>> {
    let body: MoveCardBody = parse_body(&body)?;
    let to_column = required(body.column_id, "columnId")?;
    let index = body.index.unwrap_or(usize::MAX);

    let card = mutate_document(&state, "mirror.move_card", |data| {
        let from_column = card(data, &card_id)?.column_id;
        if !data.columns.contains_key(&to_column) {
            return Err(ApiError::not_found("Column", &to_column));
        }
        data.move_card(&card_id, &from_column, &to_column, index);
        card(data, &card_id)
    })
    .await?;
    log::info!(
        target: "tafel.api.move_card",
        "Moved card {} to column {}",
        card.id,
        card.column_id
    );
    Ok(Json(card))
}

pub async fn add_subtask(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Subtask>)> {
    let body: AddSubtaskBody = parse_body(&body)?;
    let title = required(body.title, "title")?;
    let subtask = mutate_document(&state, "mirror.add_subtask", |data| {
        let id = data
            .add_subtask(&card_id, &title)
            .ok_or_else(|| ApiError::not_found("Card", &card_id))?;
        subtask(data, &card_id, &id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(subtask)))
}

pub async fn update_subtask(
    State(state): State<AppState>,
    Path((card_id, subtask_id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<Subtask>> {
    let patch: SubtaskPatch = parse_body(&body)?;
    let subtask = mutate_document(&state, "mirror.update_subtask", |data| {
        // Distinguish a missing card from a missing subtask.
        card(data, &card_id)?;
        if !data.update_subtask(&card_id, &subtask_id, &patch) {
            return Err(ApiError::not_found("Subtask", &subtask_id));
        }
        subtask(data, &card_id, &subtask_id)
    })
    .await?;
    Ok(Json(subtask))
}

pub async fn delete_subtask(
    State(state): State<AppState>,
    Path((card_id, subtask_id)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    mutate_document(&state, "mirror.delete_subtask", |data| {
        card(data, &card_id)?;
        if !data.delete_subtask(&card_id, &subtask_id) {
            return Err(ApiError::not_found("Subtask", &subtask_id));
        }
        Ok(())
    })
    .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let body: AddCommentBody = parse_body(&body)?;
    let text = required(body.text, "text")?;
    let comment = mutate_document(&state, "mirror.add_comment", |data| {
        let id = data
            .add_comment(&card_id, &text)
            .ok_or_else(|| ApiError::not_found("Card", &card_id))?;
        card(data, &card_id)?
            .comments
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ApiError::not_found("Comment", &id))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
