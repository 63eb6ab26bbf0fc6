//! Anthropic Messages API client

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ChatOutcome;

const DEFAULT_MAX_TOKENS: i32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.3;

// USD per million tokens
const INPUT_COST_PER_MTOK: f64 = 3.0;
const OUTPUT_COST_PER_MTOK: f64 = 15.0;

pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: i32,
    temperature: f32,
    system: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: i64,
    output_tokens: i64,
}

impl AnthropicClient {
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
            bail!("Anthropic API key not configured");
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

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens,
            temperature,
            system: system_prompt.to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;
        let latency = start.elapsed().as_millis() as i64;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Anthropic API error {status}: {body}");
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        info!(
            "Anthropic response: {} in / {} out tokens, {latency}ms",
            parsed.usage.input_tokens, parsed.usage.output_tokens
        );

        Ok(ChatOutcome {
            text,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
            latency_ms: latency,
            model: parsed.model,
            provider: "anthropic".to_string(),
        })
    }
}

/// Request cost at published per-MTok rates
pub fn cost_usd(input_tokens: i64, output_tokens: i64) -> f64 {
    input_tokens as f64 * INPUT_COST_PER_MTOK / 1_000_000.0
        + output_tokens as f64 * OUTPUT_COST_PER_MTOK / 1_000_000.0
}
