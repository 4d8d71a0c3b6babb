use axum::{Extension, Json, extract::State};
use tracing::{debug, info};
use uuid::Uuid;

use taskboard_types::api::{Claims, CreateBoardRequest, MessageResponse, UpdateBoardRequest};
use taskboard_types::models::{Board, Progress};

use crate::error::ApiError;
use crate::extract::{AppJson, IdPath};
use crate::rows::board_from_row;
use crate::state::AppState;

const BOARD_NOT_FOUND: &str = "Board not found";

pub async fn create_board(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreateBoardRequest>,
) -> Result<Json<Board>, ApiError> {
    let name = required_name(&req.name)?;
    let board_id = Uuid::new_v4();
    let owner = claims.sub.to_string();

    let row = state
        .with_db(move |db| {
            db.create_board(
                &board_id.to_string(),
                &owner,
                &name,
                req.description.as_deref(),
                req.color.as_deref(),
            )
        })
        .await?;

    info!("User {} created board {}", claims.sub, board_id);
    Ok(Json(board_from_row(row)))
}

pub async fn list_boards(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Board>>, ApiError> {
    let owner = claims.sub.to_string();
    let rows = state.with_db(move |db| db.list_boards(&owner)).await?;

    Ok(Json(rows.into_iter().map(board_from_row).collect()))
}

/// Only `name`, `description` and `color` are mutable; a present `name` must
/// not be blank.
pub async fn update_board(
    State(state): State<AppState>,
    IdPath(board_id): IdPath<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(patch): AppJson<UpdateBoardRequest>,
) -> Result<Json<Board>, ApiError> {
    let name = patch.name.as_deref().map(required_name).transpose()?;
    let owner = claims.sub.to_string();

    let row = state
        .with_db(move |db| {
            db.update_board(&board_id.to_string(), &owner, |board| {
                if let Some(name) = name {
                    board.name = name;
                }
                if let Some(description) = patch.description {
                    board.description = description;
                }
                if let Some(color) = patch.color {
                    board.color = color;
                }
            })
        })
        .await?
        .ok_or_else(|| {
            debug!("Board {} not found for user {}", board_id, claims.sub);
            ApiError::not_found(BOARD_NOT_FOUND)
        })?;

    Ok(Json(board_from_row(row)))
}

/// Deletes the board together with its todos.
pub async fn delete_board(
    State(state): State<AppState>,
    IdPath(board_id): IdPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let deleted = state
        .with_db(move |db| db.delete_board(&board_id.to_string(), &owner))
        .await?;

    if !deleted {
        debug!("Board {} not found for user {}", board_id, claims.sub);
        return Err(ApiError::not_found(BOARD_NOT_FOUND));
    }

    info!("User {} deleted board {}", claims.sub, board_id);
    Ok(Json(MessageResponse::new("Board deleted")))
}

pub async fn board_progress(
    State(state): State<AppState>,
    IdPath(board_id): IdPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Progress>, ApiError> {
    let owner = claims.sub.to_string();
    let (completed, total) = state
        .with_db(move |db| db.todo_counts(&board_id.to_string(), &owner))
        .await?
        .ok_or_else(|| ApiError::not_found(BOARD_NOT_FOUND))?;

    Ok(Json(Progress::new(completed, total)))
}

fn required_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("Board name is required"));
    }
    Ok(name.to_string())
}
