//! Kanban board and move handlers

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiOk, ApiResult};
use crate::observe::OpTimer;
use crate::validate::Validator;
use crate::AppState;
use vibex_store::{Board, KanbanColumn, Task};

const COLUMN_VALUES: &str = "todo, in_progress, review, completed";

#[derive(Deserialize)]
pub struct BoardQuery {
    user_id: Option<String>,
}

pub async fn board(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> ApiResult<Board> {
    let board = state.tasks.board(query.user_id.as_deref())?;
    Ok(ApiOk(board))
}

#[derive(Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    task_id: String,
    #[serde(default)]
    column: String,
    moved_by: Option<String>,
    position: Option<i64>,
}

pub async fn move_task(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Task> {
    let mut v = Validator::new();
    v.require_non_empty("task_id", &req.task_id);
    let column = v.parse_opt(
        "column",
        Some(req.column.as_str()),
        KanbanColumn::parse,
        COLUMN_VALUES,
    );
    v.finish()?;
    let column = column.ok_or_else(|| {
        crate::error::ApiError::Validation(vec![crate::error::FieldIssue {
            field: "column".into(),
            message: format!("must be one of: {COLUMN_VALUES}"),
        }])
    })?;

    let moved_by = req.moved_by.unwrap_or_else(|| "system".to_string());
    let timer = OpTimer::start("kanban.move");
    let result = state
        .tasks
        .move_task(&req.task_id, column, &moved_by, req.position);
    timer.finish(&result);
    Ok(ApiOk(result?))
}
