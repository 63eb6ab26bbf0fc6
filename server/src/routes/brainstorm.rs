//! Brainstorm session handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::brainstorm::{BrainstormSession, Idea, SessionStatus};
use crate::error::{ApiError, ApiOk, ApiResult};
use crate::observe::OpTimer;
use crate::validate::{self, Validator};
use crate::AppState;
use vibex_store::{NewTask, Task};

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    topic: String,
    created_by: Option<String>,
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<BrainstormSession> {
    let mut v = Validator::new();
    v.require_non_empty("topic", &req.topic);
    v.require_max_len("topic", &req.topic, 200);
    v.finish()?;

    let session = BrainstormSession::new(req.topic.trim().to_string(), req.created_by);
    info!("Brainstorm session created: {} ({})", session.id, session.topic);
    state
        .brainstorms
        .write()
        .await
        .insert(session.id.clone(), session.clone());
    Ok(ApiOk(session))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<BrainstormSession> {
    let sessions = state.brainstorms.read().await;
    let session = sessions
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("brainstorm session not found: {id}")))?;
    Ok(ApiOk(session))
}

#[derive(Deserialize)]
pub struct TranscriptRequest {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub new_ideas: Vec<Idea>,
    pub total_ideas: usize,
}

pub async fn append_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TranscriptRequest>,
) -> ApiResult<TranscriptResponse> {
    let mut v = Validator::new();
    validate::content_limits(&mut v, "text", &req.text);
    v.finish()?;

    let timer = OpTimer::start("brainstorm.transcript");
    let result = {
        let mut sessions = state.brainstorms.write().await;
        match sessions.get_mut(&id) {
            Some(session) if session.status == SessionStatus::Completed => {
                Err(ApiError::Conflict(format!(
                    "brainstorm session already completed: {id}"
                )))
            }
            Some(session) => {
                let new_ideas = session.append_transcript(&req.text, &state.extractor);
                Ok(TranscriptResponse {
                    session_id: id.clone(),
                    total_ideas: session.ideas.len(),
                    new_ideas,
                })
            }
            None => Err(ApiError::NotFound(format!(
                "brainstorm session not found: {id}"
            ))),
        }
    };
    timer.finish(&result);
    Ok(ApiOk(result?))
}

#[derive(Deserialize, Default)]
pub struct FinalizeRequest {
    /// Specific idea ids to convert; empty means every actionable idea
    #[serde(default)]
    idea_ids: Vec<String>,
    user_id: Option<String>,
}

#[derive(Serialize)]
pub struct FinalizeResponse {
    pub session: BrainstormSession,
    pub created_tasks: Vec<Task>,
}

pub async fn finalize_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<FinalizeRequest>,
) -> ApiResult<FinalizeResponse> {
    let timer = OpTimer::start("brainstorm.finalize");

    let chosen: Result<Vec<Idea>, ApiError> = {
        let sessions = state.brainstorms.read().await;
        match sessions.get(&id) {
            Some(session) if session.status == SessionStatus::Completed => Err(
                ApiError::Conflict(format!("brainstorm session already completed: {id}")),
            ),
            Some(session) => {
                let ideas: Vec<Idea> = if req.idea_ids.is_empty() {
                    session.actionable_ideas().into_iter().cloned().collect()
                } else {
                    session
                        .ideas
                        .iter()
                        .filter(|idea| req.idea_ids.contains(&idea.id))
                        .cloned()
                        .collect()
                };
                Ok(ideas)
            }
            None => Err(ApiError::NotFound(format!(
                "brainstorm session not found: {id}"
            ))),
        }
    };

    let result = match chosen {
        Ok(ideas) => create_tasks_from_ideas(&state, &id, ideas, req.user_id.as_deref()),
        Err(e) => Err(e),
    };
    timer.finish(&result);
    let created_tasks = result?;

    let session = {
        let mut sessions = state.brainstorms.write().await;
        match sessions.get_mut(&id) {
            Some(session) => {
                session.complete();
                session.clone()
            }
            None => return Err(ApiError::NotFound(format!("brainstorm session not found: {id}"))),
        }
    };

    info!(
        "Brainstorm {} finalized: {} tasks created",
        id,
        created_tasks.len()
    );
    Ok(ApiOk(FinalizeResponse {
        session,
        created_tasks,
    }))
}

fn create_tasks_from_ideas(
    state: &AppState,
    session_id: &str,
    ideas: Vec<Idea>,
    user_id: Option<&str>,
) -> Result<Vec<Task>, ApiError> {
    let mut created = Vec::new();
    for idea in ideas {
        let title: String = idea.text.chars().take(200).collect();
        let task = state.tasks.create_task(NewTask {
            title,
            description: format!("Captured during brainstorm session {session_id}"),
            user_id: user_id.map(|u| u.to_string()),
            metadata: Some(serde_json::json!({
                "brainstorm": {
                    "session_id": session_id,
                    "idea_id": idea.id,
                    "kind": idea.kind.as_str(),
                }
            })),
            ..Default::default()
        })?;
        created.push(task);
    }
    Ok(created)
}
