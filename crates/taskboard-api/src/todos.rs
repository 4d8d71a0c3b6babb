use axum::{Extension, Json, extract::State};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use taskboard_db::models::NewTodo;
use taskboard_types::api::{Claims, CreateTodoRequest, MessageResponse, UpdateTodoRequest};
use taskboard_types::models::Todo;

use crate::error::ApiError;
use crate::extract::{AppJson, IdPath};
use crate::rows::todo_from_row;
use crate::state::AppState;

const BOARD_NOT_FOUND: &str = "Board not found";
const TODO_NOT_FOUND: &str = "Todo not found";

pub async fn create_todo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(req): AppJson<CreateTodoRequest>,
) -> Result<Json<Todo>, ApiError> {
    let title = required_title(&req.title)?;
    let due_date = req.due_date.as_deref().map(parse_due_date).transpose()?.flatten();
    let priority = req.priority.unwrap_or_default();

    let todo_id = Uuid::new_v4();
    let board_id = req.board;
    let owner = claims.sub.to_string();

    let row = state
        .with_db(move |db| {
            let (id, board_id) = (todo_id.to_string(), board_id.to_string());
            db.create_todo(
                &owner,
                NewTodo {
                    id: &id,
                    board_id: &board_id,
                    title: &title,
                    description: req.description.as_deref(),
                    priority: priority.as_str(),
                    due_date: due_date.as_deref(),
                },
            )
        })
        .await?
        .ok_or_else(|| {
            debug!("Board {} not found for user {}", board_id, claims.sub);
            ApiError::not_found(BOARD_NOT_FOUND)
        })?;

    info!("User {} created todo {} on board {}", claims.sub, todo_id, board_id);
    Ok(Json(todo_from_row(row)))
}

/// All todos of one board, oldest first. Clients sort and filter locally.
pub async fn list_todos(
    State(state): State<AppState>,
    IdPath(board_id): IdPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let owner = claims.sub.to_string();
    let rows = state
        .with_db(move |db| db.list_todos(&board_id.to_string(), &owner))
        .await?
        .ok_or_else(|| ApiError::not_found(BOARD_NOT_FOUND))?;

    Ok(Json(rows.into_iter().map(todo_from_row).collect()))
}

/// Partial update. Applying the same patch twice leaves the same state.
pub async fn update_todo(
    State(state): State<AppState>,
    IdPath(todo_id): IdPath<Uuid>,
    Extension(claims): Extension<Claims>,
    AppJson(patch): AppJson<UpdateTodoRequest>,
) -> Result<Json<Todo>, ApiError> {
    let title = patch.title.as_deref().map(required_title).transpose()?;
    let due_date = match patch.due_date {
        Some(Some(raw)) => Some(parse_due_date(&raw)?),
        Some(None) => Some(None),
        None => None,
    };
    let owner = claims.sub.to_string();

    let row = state
        .with_db(move |db| {
            db.update_todo(&todo_id.to_string(), &owner, |todo| {
                if let Some(title) = title {
                    todo.title = title;
                }
                if let Some(description) = patch.description {
                    todo.description = description;
                }
                if let Some(priority) = patch.priority {
                    todo.priority = priority.as_str().to_string();
                }
                if let Some(due_date) = due_date {
                    todo.due_date = due_date;
                }
                if let Some(completed) = patch.completed {
                    todo.completed = completed;
                }
            })
        })
        .await?
        .ok_or_else(|| {
            debug!("Todo {} not found for user {}", todo_id, claims.sub);
            ApiError::not_found(TODO_NOT_FOUND)
        })?;

    Ok(Json(todo_from_row(row)))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    IdPath(todo_id): IdPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let deleted = state
        .with_db(move |db| db.delete_todo(&todo_id.to_string(), &owner))
        .await?;

    if !deleted {
        return Err(ApiError::not_found(TODO_NOT_FOUND));
    }

    Ok(Json(MessageResponse::new("Todo deleted")))
}

fn required_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::validation("Todo title is required"));
    }
    Ok(title.to_string())
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp and returns
/// the normalised RFC 3339 form. Blank input means "no due date".
fn parse_due_date(raw: &str) -> Result<Option<String>, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
        })
        .map_err(|_| ApiError::validation(format!("Invalid due date '{}'", raw)))?;

    Ok(Some(parsed.to_rfc3339_opts(SecondsFormat::Millis, true)))
}
