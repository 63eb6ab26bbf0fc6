//! HTTP route table

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::{dashboard, events, AppState};

pub mod agents;
pub mod brainstorm;
pub mod chat;
pub mod environments;
pub mod kanban;
pub mod memory;
pub mod system;
pub mod tasks;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::page))
        .route("/api/status", get(system::get_status))
        .route("/api/health", get(system::health_check))
        .route("/api/auth/:provider/status", get(system::auth_status))
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/kanban", get(kanban::board))
        .route("/api/tasks/kanban/move", post(kanban::move_task))
        .route(
            "/api/tasks/:id",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/api/tasks/:id/attachments",
            get(tasks::list_attachments).post(tasks::add_attachment),
        )
        .route("/api/attachments/:id", delete(tasks::delete_attachment))
        .route(
            "/api/environments",
            get(environments::list_environments).post(environments::create_environment),
        )
        .route(
            "/api/environments/:id",
            get(environments::get_environment)
                .patch(environments::update_environment)
                .delete(environments::delete_environment),
        )
        .route(
            "/api/agent-memory",
            get(memory::list_memories).post(memory::store_memory),
        )
        .route("/api/agent-memory/search", get(memory::search_memories))
        .route("/api/agent-memory/archive", post(memory::archive_memories))
        .route(
            "/api/agent-memory/entry/:agent_type/:context_key",
            get(memory::get_memory),
        )
        .route("/api/agent-memory/:id", delete(memory::delete_memory))
        .route("/api/agents", get(agents::list_agents))
        .route("/api/agents/register", post(agents::register_agent))
        .route("/api/agents/:id", delete(agents::unregister_agent))
        .route("/api/agents/:id/heartbeat", post(agents::heartbeat))
        .route("/api/chat", post(chat::chat))
        .route("/api/chat/budget", get(chat::budget_status))
        .route("/api/chat/usage", get(chat::usage))
        .route("/api/brainstorm", post(brainstorm::create_session))
        .route("/api/brainstorm/:id", get(brainstorm::get_session))
        .route(
            "/api/brainstorm/:id/transcript",
            post(brainstorm::append_transcript),
        )
        .route(
            "/api/brainstorm/:id/finalize",
            post(brainstorm::finalize_session),
        )
        .route("/api/events", get(events::sse_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
