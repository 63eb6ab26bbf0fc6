//! Environment CRUD handlers

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiOk, ApiResult};
use crate::validate::Validator;
use crate::AppState;
use vibex_store::{Environment, EnvironmentUpdate, NewEnvironment};

#[derive(Deserialize)]
pub struct ListQuery {
    user_id: Option<String>,
}

pub async fn list_environments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Environment>> {
    Ok(ApiOk(state.tasks.list_environments(query.user_id.as_deref())?))
}

#[derive(Deserialize)]
pub struct CreateEnvironmentRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    config: Option<serde_json::Value>,
    user_id: Option<String>,
}

pub async fn create_environment(
    State(state): State<AppState>,
    Json(req): Json<CreateEnvironmentRequest>,
) -> ApiResult<Environment> {
    let mut v = Validator::new();
    v.require_non_empty("name", &req.name);
    v.require_max_len("name", &req.name, 100);
    v.require_object("config", &req.config);
    v.finish()?;

    let environment = state.tasks.create_environment(NewEnvironment {
        name: req.name.trim().to_string(),
        description: req.description,
        config: req.config,
        user_id: req.user_id,
    })?;
    Ok(ApiOk(environment))
}

pub async fn get_environment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Environment> {
    Ok(ApiOk(state.tasks.get_environment(&id)?))
}

#[derive(Deserialize)]
pub struct UpdateEnvironmentRequest {
    name: Option<String>,
    description: Option<String>,
    config: Option<serde_json::Value>,
}

pub async fn update_environment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateEnvironmentRequest>,
) -> ApiResult<Environment> {
    let mut v = Validator::new();
    if let Some(name) = &req.name {
        v.require_non_empty("name", name);
        v.require_max_len("name", name, 100);
    }
    v.require_object("config", &req.config);
    if req.name.is_none() && req.description.is_none() && req.config.is_none() {
        v.issue("body", "at least one field must be provided");
    }
    v.finish()?;

    let environment = state.tasks.update_environment(
        &id,
        EnvironmentUpdate {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            config: req.config,
        },
    )?;
    Ok(ApiOk(environment))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

pub async fn delete_environment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    state.tasks.delete_environment(&id)?;
    Ok(ApiOk(DeletedResponse { id, deleted: true }))
}
