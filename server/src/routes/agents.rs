//! Agent registry handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::agents::AgentSnapshot;
use crate::error::{ApiError, ApiOk, ApiResult};
use crate::validate::Validator;
use crate::AppState;

pub async fn list_agents(State(state): State<AppState>) -> ApiResult<Vec<AgentSnapshot>> {
    let agents = state.agents.read().await.list();
    Ok(ApiOk(agents))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    id: Option<String>,
    #[serde(default)]
    agent_type: String,
    #[serde(default)]
    capabilities: Vec<String>,
}

pub async fn register_agent(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<AgentSnapshot> {
    let mut v = Validator::new();
    v.require_non_empty("agent_type", &req.agent_type);
    if let Some(id) = &req.id {
        v.require_non_empty("id", id);
    }
    v.finish()?;

    let id = req
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let snapshot = state
        .agents
        .write()
        .await
        .register(id, req.agent_type, req.capabilities);
    Ok(ApiOk(snapshot))
}

#[derive(Serialize)]
pub struct UnregisterResponse {
    pub id: String,
    pub removed: bool,
}

pub async fn unregister_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<UnregisterResponse> {
    let removed = state.agents.write().await.remove(&id);
    if !removed {
        return Err(ApiError::NotFound(format!("agent not found: {id}")));
    }
    Ok(ApiOk(UnregisterResponse { id, removed: true }))
}

#[derive(Deserialize)]
pub struct HeartbeatRequest {
    #[serde(default = "default_status")]
    status: String,
}

fn default_status() -> String {
    "idle".to_string()
}

#[derive(Serialize)]
pub struct HeartbeatResponse {
    pub id: String,
    pub status: String,
}

pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<HeartbeatRequest>,
) -> ApiResult<HeartbeatResponse> {
    let accepted = state.agents.write().await.heartbeat(&id, &req.status);
    if !accepted {
        return Err(ApiError::NotFound(format!("agent not found: {id}")));
    }
    Ok(ApiOk(HeartbeatResponse {
        id,
        status: req.status,
    }))
}
