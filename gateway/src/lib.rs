//! VibeX AI gateway — provider clients, routing and budget tracking.
//!
//! Wraps the Anthropic, OpenAI and Gemini chat APIs behind one request
//! type with provider preference, fallback, response caching and monthly
//! budget enforcement.

use serde::Serialize;
use thiserror::Error;

pub mod anthropic;
pub mod budget;
pub mod gemini;
pub mod openai;
pub mod router;

pub use anthropic::AnthropicClient;
pub use budget::{BudgetManager, BudgetStatus, UsageRecord, UsageSummary};
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use router::{ProviderRouter, ProviderSet};

/// Known providers, in routing-preference order
pub const PROVIDERS: [&str; 3] = ["anthropic", "openai", "gemini"];

/// One chat completion request as routed through the gateway
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub max_tokens: i32,
    pub temperature: f32,
    /// Empty means "pick the best available provider"
    pub preferred_provider: String,
    pub allow_fallback: bool,
    pub requested_by: String,
}

/// A completed chat exchange
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub text: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub latency_ms: i64,
    pub model: String,
    pub provider: String,
}

impl ChatOutcome {
    pub fn tokens_used(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no AI provider is configured")]
    NoProvider,
    #[error("AI budget exceeded: {0}")]
    BudgetExceeded(String),
    #[error("{provider} request failed: {message}")]
    Upstream { provider: String, message: String },
}
