//! OpenAI chat completions client

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ChatOutcome;

const DEFAULT_MAX_TOKENS: i32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.3;

// USD per million tokens
const INPUT_COST_PER_MTOK: f64 = 2.5;
const OUTPUT_COST_PER_MTOK: f64 = 10.0;

pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    max_tokens: i32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: i64,
    completion_tokens: i64,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String, model: String, timeout_seconds: u64) -> Self {
        Self {
            api_key,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_seconds))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
            model,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    pub fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub async fn infer(
        &self,
        prompt: &str,
        system_prompt: &str,
        max_tokens: i32,
        temperature: f32,
    ) -> Result<ChatOutcome> {
        if !self.is_available() {
            bail!("OpenAI API key not configured");
        }

        let max_tokens = if max_tokens <= 0 {
            DEFAULT_MAX_TOKENS
        } else {
            max_tokens
        };
        let temperature = if temperature <= 0.0 {
            DEFAULT_TEMPERATURE
        } else {
            temperature
        };

        let mut messages = Vec::new();
        if !system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        let body = CompletionRequest {
            model: self.model.clone(),
            max_tokens,
            temperature,
            messages,
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;
        let latency = start.elapsed().as_millis() as i64;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {status}: {body}");
        }

        let parsed: CompletionResponse = response.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .map(|c| c.message.content)
            .collect::<Vec<_>>()
            .join("");

        info!(
            "OpenAI response: {} in / {} out tokens, {latency}ms",
            parsed.usage.prompt_tokens, parsed.usage.completion_tokens
        );

        Ok(ChatOutcome {
            text,
            input_tokens: parsed.usage.prompt_tokens,
            output_tokens: parsed.usage.completion_tokens,
            latency_ms: latency,
            model: parsed.model,
            provider: "openai".to_string(),
        })
    }
}

/// Request cost at published per-MTok rates
pub fn cost_usd(input_tokens: i64, output_tokens: i64) -> f64 {
    input_tokens as f64 * INPUT_COST_PER_MTOK / 1_000_000.0
        + output_tokens as f64 * OUTPUT_COST_PER_MTOK / 1_000_000.0
}
