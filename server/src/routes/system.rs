//! Service status, health and provider credential reporting

use axum::extract::{Path, State};
use serde::Serialize;

use crate::error::{ApiError, ApiOk, ApiResult};
use crate::AppState;
use vibex_gateway::PROVIDERS;
use vibex_store::TaskStatus;

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub total_tasks: i64,
    pub in_progress_tasks: i64,
    pub stored_memories: i64,
    pub active_agents: usize,
    pub brainstorm_sessions: usize,
}

pub async fn get_status(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let (_, total_tasks) = state.tasks.list_tasks(&Default::default())?;
    let in_progress = state.tasks.count_by_status(TaskStatus::InProgress)?;
    let stored_memories = state.memories.count()?;
    let active_agents = state.agents.read().await.active_count();
    let brainstorm_sessions = state.brainstorms.read().await.len();

    Ok(ApiOk(StatusResponse {
        status: "running".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        total_tasks,
        in_progress_tasks: in_progress,
        stored_memories,
        active_agents,
        brainstorm_sessions,
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub components: Vec<ComponentHealth>,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let tasks_ok = state.tasks.count_by_status(TaskStatus::Pending).is_ok();
    let memories_ok = state.memories.count().is_ok();

    let components = vec![
        ComponentHealth {
            name: "task-store".into(),
            status: if tasks_ok { "healthy" } else { "unhealthy" }.into(),
        },
        ComponentHealth {
            name: "memory-store".into(),
            status: if memories_ok { "healthy" } else { "unhealthy" }.into(),
        },
    ];

    Ok(ApiOk(HealthResponse {
        healthy: tasks_ok && memories_ok,
        components,
    }))
}

#[derive(Serialize)]
pub struct AuthStatusResponse {
    pub provider: String,
    pub connected: bool,
    pub model: Option<String>,
}

/// `GET /api/auth/:provider/status` — credential presence, never the key
pub async fn auth_status(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> ApiResult<AuthStatusResponse> {
    if !PROVIDERS.contains(&provider.as_str()) {
        return Err(ApiError::NotFound(format!("unknown provider: {provider}")));
    }

    Ok(ApiOk(AuthStatusResponse {
        connected: state.providers.is_available(&provider),
        model: state.providers.model_name(&provider).map(|m| m.to_string()),
        provider,
    }))
}
