//! Task CRUD handlers

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiOk, ApiResult};
use crate::observe::OpTimer;
use crate::validate::{self, Validator};
use crate::AppState;
use vibex_store::{
    NewAttachment, NewTask, Task, TaskAttachment, TaskFilter, TaskPriority, TaskStatus, TaskUpdate,
};

const STATUS_VALUES: &str = "pending, in_progress, review, completed, blocked";
const PRIORITY_VALUES: &str = "low, medium, high, urgent";

#[derive(Deserialize)]
pub struct ListTasksQuery {
    status: Option<String>,
    priority: Option<String>,
    user_id: Option<String>,
    q: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<TaskPage> {
    let mut v = Validator::new();
    let status = v.parse_opt("status", query.status.as_deref(), TaskStatus::parse, STATUS_VALUES);
    let priority = v.parse_opt(
        "priority",
        query.priority.as_deref(),
        TaskPriority::parse,
        PRIORITY_VALUES,
    );
    v.finish()?;

    let filter = TaskFilter {
        status,
        priority,
        user_id: query.user_id,
        title_contains: query.q,
        limit: query.limit,
        offset: query.offset,
    };
    let (tasks, total) = state.tasks.list_tasks(&filter)?;
    Ok(ApiOk(TaskPage {
        tasks,
        total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    status: Option<String>,
    priority: Option<String>,
    user_id: Option<String>,
    metadata: Option<serde_json::Value>,
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Task> {
    let mut v = Validator::new();
    validate::title_limits(&mut v, &req.title);
    let status = v.parse_opt("status", req.status.as_deref(), TaskStatus::parse, STATUS_VALUES);
    let priority = v.parse_opt(
        "priority",
        req.priority.as_deref(),
        TaskPriority::parse,
        PRIORITY_VALUES,
    );
    v.require_object("metadata", &req.metadata);
    v.finish()?;

    let timer = OpTimer::start("tasks.create");
    let result = state.tasks.create_task(NewTask {
        title: req.title.trim().to_string(),
        description: req.description,
        status,
        priority,
        user_id: req.user_id,
        metadata: req.metadata,
    });
    timer.finish(&result);
    Ok(ApiOk(result?))
}

pub async fn get_task(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Task> {
    Ok(ApiOk(state.tasks.get_task(&id)?))
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    metadata: Option<serde_json::Value>,
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Task> {
    let mut v = Validator::new();
    if let Some(title) = &req.title {
        validate::title_limits(&mut v, title);
    }
    let status = v.parse_opt("status", req.status.as_deref(), TaskStatus::parse, STATUS_VALUES);
    let priority = v.parse_opt(
        "priority",
        req.priority.as_deref(),
        TaskPriority::parse,
        PRIORITY_VALUES,
    );
    v.require_object("metadata", &req.metadata);

    let provided = req.title.is_some()
        || req.description.is_some()
        || req.status.is_some()
        || req.priority.is_some()
        || req.metadata.is_some();
    if !provided {
        v.issue("body", "at least one field must be provided");
    }
    v.finish()?;

    let update = TaskUpdate {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        status,
        priority,
        metadata: req.metadata,
    };

    let timer = OpTimer::start("tasks.update");
    let result = state.tasks.update_task(&id, update);
    timer.finish(&result);
    Ok(ApiOk(result?))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    state.tasks.delete_task(&id)?;
    Ok(ApiOk(DeletedResponse { id, deleted: true }))
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<TaskAttachment>> {
    Ok(ApiOk(state.tasks.list_attachments(&id)?))
}

#[derive(Deserialize)]
pub struct AddAttachmentRequest {
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    content_type: String,
    #[serde(default)]
    size_bytes: i64,
    #[serde(default)]
    url: String,
}

pub async fn add_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AddAttachmentRequest>,
) -> ApiResult<TaskAttachment> {
    let mut v = Validator::new();
    v.require_non_empty("file_name", &req.file_name);
    v.require_non_empty("url", &req.url);
    if req.size_bytes < 0 {
        v.issue("size_bytes", "must not be negative");
    }
    v.finish()?;

    let attachment = state.tasks.add_attachment(
        &id,
        NewAttachment {
            file_name: req.file_name,
            content_type: req.content_type,
            size_bytes: req.size_bytes,
            url: req.url,
        },
    )?;
    Ok(ApiOk(attachment))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    state.tasks.delete_attachment(&id)?;
    Ok(ApiOk(DeletedResponse { id, deleted: true }))
}
