//! AI chat handlers backed by the provider gateway

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{ApiOk, ApiResult};
use crate::observe::OpTimer;
use crate::validate::{self, Validator};
use crate::AppState;
use vibex_gateway::{BudgetStatus, ChatRequest, UsageSummary, PROVIDERS};

#[derive(Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    system: String,
    #[serde(default)]
    provider: String,
    #[serde(default)]
    max_tokens: i32,
    #[serde(default)]
    temperature: f32,
    #[serde(default = "default_allow_fallback")]
    allow_fallback: bool,
    #[serde(default)]
    user_id: String,
}

fn default_allow_fallback() -> bool {
    true
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub model: String,
    pub provider: String,
    pub tokens: i64,
    pub latency_ms: i64,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> ApiResult<ChatResponse> {
    let mut v = Validator::new();
    validate::content_limits(&mut v, "message", &body.message);
    if !body.provider.is_empty() && !PROVIDERS.contains(&body.provider.as_str()) {
        v.issue("provider", format!("must be one of: {}", PROVIDERS.join(", ")));
    }
    v.finish()?;

    let request = ChatRequest {
        prompt: body.message,
        system_prompt: body.system,
        max_tokens: body.max_tokens,
        temperature: body.temperature,
        preferred_provider: body.provider,
        allow_fallback: body.allow_fallback,
        requested_by: body.user_id,
    };

    let timer = OpTimer::start("chat.completion");
    let result = {
        let mut gateway = state.gateway.write().await;
        // Destructure to borrow router and budget independently
        let crate::GatewayState { router, budget } = &mut *gateway;
        router.route(&request, &state.providers, budget).await
    };
    timer.finish(&result);

    let outcome = result?;
    let tokens = outcome.tokens_used();
    Ok(ApiOk(ChatResponse {
        reply: outcome.text,
        model: outcome.model,
        provider: outcome.provider,
        tokens,
        latency_ms: outcome.latency_ms,
    }))
}

pub async fn budget_status(State(state): State<AppState>) -> ApiResult<BudgetStatus> {
    let gateway = state.gateway.read().await;
    Ok(ApiOk(gateway.budget.status()))
}

#[derive(Deserialize)]
pub struct UsageQuery {
    #[serde(default)]
    provider: String,
    #[serde(default = "default_days")]
    days: i64,
}

fn default_days() -> i64 {
    30
}

pub async fn usage(
    State(state): State<AppState>,
    Query(query): Query<UsageQuery>,
) -> ApiResult<UsageSummary> {
    let gateway = state.gateway.read().await;
    Ok(ApiOk(gateway.budget.usage(&query.provider, query.days)))
}
