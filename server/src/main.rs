//! VibeX server — tasks, kanban board, AI chat, agent memory, live telemetry.
//!
//! A single HTTP service: JSON API under /api, embedded dashboard at /,
//! server-sent telemetry at /api/events. SQLite for tasks and memories,
//! hosted AI providers behind the gateway crate.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod agents;
mod brainstorm;
mod config;
mod dashboard;
mod error;
mod events;
mod observe;
mod routes;
mod validate;

use agents::AgentRegistry;
use brainstorm::{BrainstormSession, IdeaExtractor};
use vibex_gateway::{
    AnthropicClient, BudgetManager, GeminiClient, OpenAiClient, ProviderRouter, ProviderSet,
};
use vibex_memory::{ArchivePolicy, MemoryStore};
use vibex_store::{TaskStore, WipLimits};

/// Mutable gateway internals shared behind one lock
pub struct GatewayState {
    pub router: ProviderRouter,
    pub budget: BudgetManager,
}

/// Shared application state handed to every route handler
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskStore>,
    pub memories: Arc<MemoryStore>,
    pub providers: Arc<ProviderSet>,
    pub gateway: Arc<RwLock<GatewayState>>,
    pub agents: Arc<RwLock<AgentRegistry>>,
    pub brainstorms: Arc<RwLock<HashMap<String, BrainstormSession>>>,
    pub extractor: Arc<IdeaExtractor>,
    pub archive_policy: ArchivePolicy,
    pub started_at: Instant,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .init();

    info!("VibeX server starting...");

    let config = config::load_config()?;

    // API keys come from the environment, never the config file
    let anthropic_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    let openai_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    let gemini_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();

    let available: Vec<&str> = [
        (!anthropic_key.is_empty()).then_some("anthropic"),
        (!openai_key.is_empty()).then_some("openai"),
        (!gemini_key.is_empty()).then_some("gemini"),
    ]
    .iter()
    .filter_map(|x| *x)
    .collect();

    if available.is_empty() {
        warn!("No provider API keys configured — chat endpoints will reject requests");
    } else {
        info!("Available providers: {}", available.join(", "));
    }

    let providers = ProviderSet {
        anthropic: AnthropicClient::new(
            anthropic_key,
            config.providers.anthropic.base_url.clone(),
            config.providers.anthropic.model.clone(),
            config.providers.anthropic.timeout_seconds,
        ),
        openai: OpenAiClient::new(
            openai_key,
            config.providers.openai.base_url.clone(),
            config.providers.openai.model.clone(),
            config.providers.openai.timeout_seconds,
        ),
        gemini: GeminiClient::new(
            gemini_key,
            config.providers.gemini.base_url.clone(),
            config.providers.gemini.model.clone(),
            config.providers.gemini.timeout_seconds,
        ),
    };

    let budget = BudgetManager::new(&[
        ("anthropic", config.providers.anthropic.monthly_budget_usd),
        ("openai", config.providers.openai.monthly_budget_usd),
        ("gemini", config.providers.gemini.monthly_budget_usd),
    ]);

    let tasks = TaskStore::with_wip_limits(
        &config.database.tasks_db,
        WipLimits {
            in_progress: config.kanban.in_progress_limit,
            review: config.kanban.review_limit,
        },
    )
    .context("Failed to open task store")?;
    let memories =
        MemoryStore::new(&config.database.memory_db).context("Failed to open memory store")?;

    let archive_policy = ArchivePolicy {
        max_age_days: config.memory.archive_max_age_days,
        max_importance: config.memory.archive_max_importance,
        max_access_count: config.memory.archive_max_access_count,
    };

    let state = AppState {
        tasks: Arc::new(tasks),
        memories: Arc::new(memories),
        providers: Arc::new(providers),
        gateway: Arc::new(RwLock::new(GatewayState {
            router: ProviderRouter::new(),
            budget,
        })),
        agents: Arc::new(RwLock::new(AgentRegistry::new())),
        brainstorms: Arc::new(RwLock::new(HashMap::new())),
        extractor: Arc::new(
            IdeaExtractor::new().context("Failed to compile idea extraction patterns")?,
        ),
        archive_policy,
        started_at: Instant::now(),
    };

    // Background archival sweep for agent memories
    let cancel = CancellationToken::new();
    let sweep_state = state.clone();
    let sweep_cancel = cancel.clone();
    let sweep_interval = config.memory.sweep_interval_seconds;
    tokio::spawn(async move {
        archival_sweep(sweep_state, sweep_interval, sweep_cancel).await;
    });

    let app = routes::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;
    info!("VibeX listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    info!("Shutdown signal received");
    cancel.cancel();
}

/// Periodically expire stale, unimportant, rarely-read memories
async fn archival_sweep(state: AppState, interval_seconds: u64, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds.max(60)));
    // interval fires immediately; skip the startup tick
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Archival sweep shutting down");
                break;
            }
            _ = ticker.tick() => {
                match state.memories.archive(&state.archive_policy) {
                    Ok(0) => {}
                    Ok(removed) => info!("Archival sweep removed {removed} memories"),
                    Err(e) => warn!("Archival sweep failed: {e}"),
                }
            }
        }
    }
}
