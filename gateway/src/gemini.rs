//! Google Gemini generateContent client

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ChatOutcome;

const DEFAULT_MAX_TOKENS: i32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.3;

// USD per million tokens
const INPUT_COST_PER_MTOK: f64 = 1.25;
const OUTPUT_COST_PER_MTOK: f64 = 5.0;

pub struct GeminiClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: i32,
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
}

impl GeminiClient {
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
            bail!("Gemini API key not configured");
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

        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: if system_prompt.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: vec![Part {
                        text: system_prompt.to_string(),
                    }],
                })
            },
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
                temperature,
            },
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;
        let latency = start.elapsed().as_millis() as i64;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Gemini API error {status}: {body}");
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        let (input_tokens, output_tokens) = parsed
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or((0, 0));

        info!("Gemini response: {input_tokens} in / {output_tokens} out tokens, {latency}ms");

        Ok(ChatOutcome {
            text,
            input_tokens,
            output_tokens,
            latency_ms: latency,
            model: parsed.model_version.unwrap_or_else(|| self.model.clone()),
            provider: "gemini".to_string(),
        })
    }
}

/// Request cost at published per-MTok rates
pub fn cost_usd(input_tokens: i64, output_tokens: i64) -> f64 {
    input_tokens as f64 * INPUT_COST_PER_MTOK / 1_000_000.0
        + output_tokens as f64 * OUTPUT_COST_PER_MTOK / 1_000_000.0
}
