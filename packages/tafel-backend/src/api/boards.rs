use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use tafel_core::types::{Board, BoardData, BoardSummary, Card, Column};

use super::{mutate_document, parse_body, read_state, required, ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_BOARD_TITLE: &str = "New board";
const DEFAULT_COLUMN_TITLE: &str = "New column";

#[derive(Debug, Default, Deserialize)]
pub struct CreateBoardBody {
    title: Option<String>,
    icon: Option<String>,
    columns: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateColumnBody {
    title: Option<String>,
    color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardBody {
    column_id: Option<String>,
    title: Option<String>,
}

/// Board with its columns (in order) and their cards (in order).
#[derive(Serialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    board: Board,
    columns: Vec<ColumnDetail>,
}

#[derive(Serialize)]
pub struct ColumnDetail {
    #[serde(flatten)]
    column: Column,
    cards: Vec<Card>,
}

fn board_detail(data: &BoardData, board_id: &str) -> Option<BoardDetail> {
    let board = data.boards.get(board_id)?.clone();
    let columns = data
        .columns_of(board_id)
        .into_iter()
        .map(|column| ColumnDetail {
            cards: data.cards_of(&column.id).into_iter().cloned().collect(),
            column: column.clone(),
        })
        .collect();
    Some(BoardDetail { board, columns })
}

pub async fn list_boards(State(state): State<AppState>) -> ApiResult<Json<Vec<BoardSummary>>> {
    let data = read_state(&state).await?;
    Ok(Json(data.board_summaries()))
}

pub async fn create_board(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<BoardDetail>)> {
    let body: CreateBoardBody = parse_body(&body)?;
    let title = body
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BOARD_TITLE.to_string());
    let columns = body.columns.unwrap_or_default();

    let detail = mutate_document(&state, "mirror.create_board", |data| {
        let id = data.create_board_with_columns(&title, body.icon.as_deref(), &columns);
        board_detail(data, &id).ok_or_else(|| ApiError::not_found("Board", &id))
    })
    .await?;

    log::info!(target: "tafel.api.create_board", "Created board {}", detail.board.id);
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> ApiResult<Json<BoardDetail>> {
    let data = read_state(&state).await?;
    board_detail(&data, &board_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Board", &board_id))
}

pub async fn delete_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    mutate_document(&state, "mirror.delete_board", |data| {
        data.delete_board(&board_id)
            .ok_or_else(|| ApiError::not_found("Board", &board_id))
    })
    .await?;
    log::info!(target: "tafel.api.delete_board", "Deleted board {}", board_id);
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn create_column(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Column>)> {
    let body: CreateColumnBody = parse_body(&body)?;
    let title = body
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_COLUMN_TITLE.to_string());

    let column = mutate_document(&state, "mirror.create_column", |data| {
        if !data.boards.contains_key(&board_id) {
            return Err(ApiError::not_found("Board", &board_id));
        }
        let id = data.create_column(&board_id, &title, body.color.as_deref());
        data.columns
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Column", &id))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(column)))
}

pub async fn create_card(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Card>)> {
    let body: CreateCardBody = parse_body(&body)?;
    let column_id = required(body.column_id, "columnId")?;
    let title = required(body.title, "title")?;

    let card = mutate_document(&state, "mirror.create_card", |data| {
        if !data.boards.contains_key(&board_id) {
            return Err(ApiError::not_found("Board", &board_id));
        }
        match data.columns.get(&column_id) {
            None => return Err(ApiError::not_found("Column", &column_id)),
            Some(column) if column.board_id != board_id => {
                return Err(ApiError::BadRequest(format!(
                    "Column {} does not belong to board {}",
                    column_id, board_id
                )))
            }
            Some(_) => {}
        }
        let id = data.create_card(&column_id, &title);
        data.cards
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Card", &id))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(card)))
}
