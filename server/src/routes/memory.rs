//! Agent memory handlers

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiOk, ApiResult};
use crate::observe::OpTimer;
use crate::validate::{self, Validator};
use crate::AppState;
use vibex_memory::{AgentMemory, ArchivePolicy, MemorySearchResult, NewMemory};

#[derive(Deserialize)]
pub struct ListMemoriesQuery {
    agent_type: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct MemoryPage {
    pub memories: Vec<AgentMemory>,
    pub total: i64,
}

pub async fn list_memories(
    State(state): State<AppState>,
    Query(query): Query<ListMemoriesQuery>,
) -> ApiResult<MemoryPage> {
    let (memories, total) =
        state
            .memories
            .list(query.agent_type.as_deref(), query.limit, query.offset)?;
    Ok(ApiOk(MemoryPage { memories, total }))
}

#[derive(Deserialize)]
pub struct StoreMemoryRequest {
    #[serde(default)]
    agent_type: String,
    #[serde(default)]
    context_key: String,
    #[serde(default)]
    content: String,
    importance: Option<i64>,
    metadata: Option<serde_json::Value>,
}

pub async fn store_memory(
    State(state): State<AppState>,
    Json(req): Json<StoreMemoryRequest>,
) -> ApiResult<AgentMemory> {
    let mut v = Validator::new();
    v.require_non_empty("agent_type", &req.agent_type);
    v.require_non_empty("context_key", &req.context_key);
    validate::content_limits(&mut v, "content", &req.content);
    if let Some(importance) = req.importance {
        v.require_range("importance", importance, 1, 10);
    }
    v.require_object("metadata", &req.metadata);
    v.finish()?;

    let timer = OpTimer::start("memory.store");
    let result = state.memories.store(NewMemory {
        agent_type: req.agent_type,
        context_key: req.context_key,
        content: req.content,
        importance: req.importance,
        metadata: req.metadata,
    });
    timer.finish(&result);
    Ok(ApiOk(result?))
}

pub async fn get_memory(
    State(state): State<AppState>,
    Path((agent_type, context_key)): Path<(String, String)>,
) -> ApiResult<AgentMemory> {
    Ok(ApiOk(state.memories.get(&agent_type, &context_key)?))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
    agent_type: Option<String>,
    #[serde(default = "default_search_limit")]
    limit: usize,
    #[serde(default)]
    min_similarity: f32,
}

fn default_search_limit() -> usize {
    10
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<MemorySearchResult>,
}

pub async fn search_memories(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let mut v = Validator::new();
    v.require_non_empty("q", &query.q);
    if !(0.0..=1.0).contains(&query.min_similarity) {
        v.issue("min_similarity", "must be between 0.0 and 1.0");
    }
    v.finish()?;

    let timer = OpTimer::start("memory.search");
    let result = state.memories.search(
        &query.q,
        query.agent_type.as_deref(),
        query.limit,
        query.min_similarity,
    );
    timer.finish(&result);
    Ok(ApiOk(SearchResponse {
        query: query.q,
        results: result?,
    }))
}

#[derive(Deserialize, Default)]
pub struct ArchiveRequest {
    max_age_days: Option<i64>,
    max_importance: Option<i64>,
    max_access_count: Option<i64>,
}

#[derive(Serialize)]
pub struct ArchiveResponse {
    pub removed: usize,
}

pub async fn archive_memories(
    State(state): State<AppState>,
    Json(req): Json<ArchiveRequest>,
) -> ApiResult<ArchiveResponse> {
    let defaults = state.archive_policy;
    let policy = ArchivePolicy {
        max_age_days: req.max_age_days.unwrap_or(defaults.max_age_days),
        max_importance: req.max_importance.unwrap_or(defaults.max_importance),
        max_access_count: req.max_access_count.unwrap_or(defaults.max_access_count),
    };

    let mut v = Validator::new();
    if policy.max_age_days < 1 {
        v.issue("max_age_days", "must be at least 1");
    }
    v.finish()?;

    let timer = OpTimer::start("memory.archive");
    let result = state.memories.archive(&policy);
    timer.finish(&result);
    Ok(ApiOk(ArchiveResponse { removed: result? }))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

pub async fn delete_memory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedResponse> {
    state.memories.delete(&id)?;
    Ok(ApiOk(DeletedResponse { id, deleted: true }))
}
