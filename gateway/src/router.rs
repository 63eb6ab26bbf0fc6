//! Provider router — selects a provider by preference, availability and
//! budget, with fallback and a TTL response cache.

use anyhow::Result;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::anthropic::AnthropicClient;
use crate::budget::BudgetManager;
use crate::gemini::GeminiClient;
use crate::openai::OpenAiClient;
use crate::{ChatOutcome, ChatRequest, GatewayError, PROVIDERS};

/// The configured provider clients, one per backend
pub struct ProviderSet {
    pub anthropic: AnthropicClient,
    pub openai: OpenAiClient,
    pub gemini: GeminiClient,
}

impl ProviderSet {
    pub fn is_available(&self, provider: &str) -> bool {
        match provider {
            "anthropic" => self.anthropic.is_available(),
            "openai" => self.openai.is_available(),
            "gemini" => self.gemini.is_available(),
            _ => false,
        }
    }

    pub fn model_name(&self, provider: &str) -> Option<&str> {
        match provider {
            "anthropic" => Some(self.anthropic.model_name()),
            "openai" => Some(self.openai.model_name()),
            "gemini" => Some(self.gemini.model_name()),
            _ => None,
        }
    }

    async fn infer(&self, provider: &str, request: &ChatRequest) -> Result<ChatOutcome> {
        match provider {
            "anthropic" => {
                self.anthropic
                    .infer(
                        &request.prompt,
                        &request.system_prompt,
                        request.max_tokens,
                        request.temperature,
                    )
                    .await
            }
            "openai" => {
                self.openai
                    .infer(
                        &request.prompt,
                        &request.system_prompt,
                        request.max_tokens,
                        request.temperature,
                    )
                    .await
            }
            "gemini" => {
                self.gemini
                    .infer(
                        &request.prompt,
                        &request.system_prompt,
                        request.max_tokens,
                        request.temperature,
                    )
                    .await
            }
            other => anyhow::bail!("unknown provider: {other}"),
        }
    }
}

struct CachedResponse {
    outcome: ChatOutcome,
    cached_at: i64,
    ttl_seconds: i64,
}

/// Routes chat requests to the best available provider
pub struct ProviderRouter {
    cache: HashMap<u64, CachedResponse>,
    cache_max_entries: usize,
    cache_ttl_seconds: i64,
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            cache_max_entries: 1000,
            cache_ttl_seconds: 3600,
        }
    }

    /// Providers to try, in order. An explicit preference goes first;
    /// otherwise every available provider within budget, in the fixed
    /// preference order.
    pub fn candidates(
        &self,
        request: &ChatRequest,
        providers: &ProviderSet,
        budget: &BudgetManager,
    ) -> Vec<&'static str> {
        let preferred = request.preferred_provider.as_str();
        let mut list: Vec<&'static str> = Vec::new();

        if !preferred.is_empty() {
            if let Some(name) = PROVIDERS.iter().find(|p| **p == preferred) {
                list.push(name);
            }
            if request.allow_fallback {
                for name in PROVIDERS {
                    if name != preferred
                        && providers.is_available(name)
                        && !budget.is_provider_exceeded(name)
                    {
                        list.push(name);
                    }
                }
            }
            return list;
        }

        for name in PROVIDERS {
            if providers.is_available(name) && !budget.is_provider_exceeded(name) {
                list.push(name);
            }
        }
        if !request.allow_fallback {
            list.truncate(1);
        }
        list
    }

    /// Route a request: cache, budget pre-check, provider call, fallback
    pub async fn route(
        &mut self,
        request: &ChatRequest,
        providers: &ProviderSet,
        budget: &mut BudgetManager,
    ) -> Result<ChatOutcome, GatewayError> {
        let key = hash_request(&request.prompt, &request.system_prompt);
        if let Some(cached) = self.get_cached(key) {
            info!("Gateway cache hit");
            return Ok(cached);
        }

        let candidates = self.candidates(request, providers, budget);
        if candidates.is_empty() {
            return if budget.is_exhausted() {
                Err(GatewayError::BudgetExceeded(
                    "all provider budgets exceeded for this billing period".to_string(),
                ))
            } else {
                Err(GatewayError::NoProvider)
            };
        }

        let mut last_err = None;
        for provider in candidates {
            if let Err(reason) = budget.pre_check(provider) {
                warn!("Skipping {provider}: {reason}");
                last_err = Some(GatewayError::BudgetExceeded(reason));
                continue;
            }

            match providers.infer(provider, request).await {
                Ok(outcome) => {
                    budget.record_usage(
                        provider,
                        outcome.input_tokens,
                        outcome.output_tokens,
                        &outcome.model,
                    );
                    self.cache_response(key, &outcome);
                    return Ok(outcome);
                }
                Err(e) => {
                    warn!("{provider} request failed: {e}");
                    last_err = Some(GatewayError::Upstream {
                        provider: provider.to_string(),
                        message: e.to_string(),
                    });
                    if !request.allow_fallback {
                        break;
                    }
                }
            }
        }

        Err(last_err.unwrap_or(GatewayError::NoProvider))
    }

    fn get_cached(&self, key: u64) -> Option<ChatOutcome> {
        let now = chrono::Utc::now().timestamp();
        self.cache.get(&key).and_then(|cached| {
            if now - cached.cached_at < cached.ttl_seconds {
                Some(cached.outcome.clone())
            } else {
                None
            }
        })
    }

    fn cache_response(&mut self, key: u64, outcome: &ChatOutcome) {
        if self.cache.len() >= self.cache_max_entries {
            let oldest = self
                .cache
                .iter()
                .min_by_key(|(_, v)| v.cached_at)
                .map(|(k, _)| *k);
            if let Some(k) = oldest {
                self.cache.remove(&k);
            }
        }

        self.cache.insert(
            key,
            CachedResponse {
                outcome: outcome.clone(),
                cached_at: chrono::Utc::now().timestamp(),
                ttl_seconds: self.cache_ttl_seconds,
            },
        );
    }
}

/// Cache key over the request text
fn hash_request(prompt: &str, system_prompt: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    prompt.hash(&mut hasher);
    system_prompt.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn providers(anthropic_key: &str, openai_key: &str, gemini_key: &str) -> ProviderSet {
        ProviderSet {
            anthropic: AnthropicClient::new(
                anthropic_key.into(),
                "https://api.anthropic.com".into(),
                "claude-sonnet-4-20250514".into(),
                5,
            ),
            openai: OpenAiClient::new(
                openai_key.into(),
                "https://api.openai.com".into(),
                "gpt-4o".into(),
                5,
            ),
            gemini: GeminiClient::new(
                gemini_key.into(),
                "https://generativelanguage.googleapis.com".into(),
                "gemini-2.0-flash".into(),
                5,
            ),
        }
    }

    fn budget() -> BudgetManager {
        BudgetManager::new(&[("anthropic", 100.0), ("openai", 50.0), ("gemini", 20.0)])
    }

    fn request(preferred: &str, allow_fallback: bool) -> ChatRequest {
        ChatRequest {
            prompt: "hello".into(),
            preferred_provider: preferred.into(),
            allow_fallback,
            ..Default::default()
        }
    }

    fn outcome(text: &str) -> ChatOutcome {
        ChatOutcome {
            text: text.into(),
            input_tokens: 10,
            output_tokens: 20,
            latency_ms: 5,
            model: "test-model".into(),
            provider: "anthropic".into(),
        }
    }

    #[test]
    fn test_candidates_default_order() {
        let router = ProviderRouter::new();
        let set = providers("a", "b", "c");
        let candidates = router.candidates(&request("", true), &set, &budget());
        assert_eq!(candidates, vec!["anthropic", "openai", "gemini"]);
    }

    #[test]
    fn test_candidates_skip_unavailable() {
        let router = ProviderRouter::new();
        let set = providers("", "b", "c");
        let candidates = router.candidates(&request("", true), &set, &budget());
        assert_eq!(candidates, vec!["openai", "gemini"]);
    }

    #[test]
    fn test_candidates_preferred_first() {
        let router = ProviderRouter::new();
        let set = providers("a", "b", "c");
        let candidates = router.candidates(&request("gemini", true), &set, &budget());
        assert_eq!(candidates[0], "gemini");
        assert!(candidates.contains(&"anthropic"));
    }

    #[test]
    fn test_candidates_preferred_no_fallback() {
        let router = ProviderRouter::new();
        let set = providers("a", "b", "c");
        let candidates = router.candidates(&request("openai", false), &set, &budget());
        assert_eq!(candidates, vec!["openai"]);
    }

    #[test]
    fn test_candidates_skip_exceeded_budget() {
        let router = ProviderRouter::new();
        let set = providers("a", "b", "c");
        let mut budget = BudgetManager::new(&[("anthropic", 0.0), ("openai", 50.0), ("gemini", 20.0)]);
        budget.record_usage("anthropic", 1000, 1000, "claude-sonnet");
        let candidates = router.candidates(&request("", true), &set, &budget);
        assert_eq!(candidates, vec!["openai", "gemini"]);
    }

    #[test]
    fn test_candidates_no_fallback_takes_first_only() {
        let router = ProviderRouter::new();
        let set = providers("a", "b", "c");
        let candidates = router.candidates(&request("", false), &set, &budget());
        assert_eq!(candidates, vec!["anthropic"]);
    }

    #[test]
    fn test_hash_request_deterministic() {
        assert_eq!(hash_request("p", "s"), hash_request("p", "s"));
        assert_ne!(hash_request("p", "s"), hash_request("p2", "s"));
        assert_ne!(hash_request("p", "s"), hash_request("p", "s2"));
    }

    #[test]
    fn test_cache_round_trip_and_expiry() {
        let mut router = ProviderRouter::new();
        let key = hash_request("prompt", "system");
        assert!(router.get_cached(key).is_none());

        router.cache_response(key, &outcome("cached"));
        let hit = router.get_cached(key).unwrap();
        assert_eq!(hit.text, "cached");

        // Entries past their TTL are ignored
        if let Some(entry) = router.cache.get_mut(&key) {
            entry.cached_at -= 7200;
        }
        assert!(router.get_cached(key).is_none());
    }

    #[test]
    fn test_cache_eviction_at_capacity() {
        let mut router = ProviderRouter::new();
        for i in 0..router.cache_max_entries + 5 {
            router.cache_response(hash_request(&format!("p{i}"), ""), &outcome("x"));
        }
        assert!(router.cache.len() <= router.cache_max_entries);
    }

    #[tokio::test]
    async fn test_route_with_no_providers() {
        let mut router = ProviderRouter::new();
        let set = providers("", "", "");
        let mut budget = budget();
        let err = router
            .route(&request("", true), &set, &mut budget)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NoProvider));
    }

    #[tokio::test]
    async fn test_route_budget_exhausted() {
        let mut router = ProviderRouter::new();
        let set = providers("a", "b", "c");
        let mut budget = BudgetManager::new(&[("anthropic", 0.0)]);
        budget.record_usage("anthropic", 1000, 1000, "m");
        let err = router
            .route(&request("", true), &set, &mut budget)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::BudgetExceeded(_)));
    }

    #[tokio::test]
    async fn test_route_serves_cache_before_providers() {
        let mut router = ProviderRouter::new();
        let set = providers("", "", "");
        let mut budget = budget();
        let req = request("", true);

        router.cache_response(
            hash_request(&req.prompt, &req.system_prompt),
            &outcome("from cache"),
        );
        let got = router.route(&req, &set, &mut budget).await.unwrap();
        assert_eq!(got.text, "from cache");
    }
}
