//! VibeX configuration loading and parsing

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "vibex.toml";

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct VibexConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub kanban: KanbanSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_tasks_db")]
    pub tasks_db: String,
    #[serde(default = "default_memory_db")]
    pub memory_db: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            tasks_db: default_tasks_db(),
            memory_db: default_memory_db(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "ProviderConfig::anthropic_defaults")]
    pub anthropic: ProviderConfig,
    #[serde(default = "ProviderConfig::openai_defaults")]
    pub openai: ProviderConfig,
    #[serde(default = "ProviderConfig::gemini_defaults")]
    pub gemini: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic: ProviderConfig::anthropic_defaults(),
            openai: ProviderConfig::openai_defaults(),
            gemini: ProviderConfig::gemini_defaults(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_monthly_budget")]
    pub monthly_budget_usd: f64,
}

impl ProviderConfig {
    fn anthropic_defaults() -> Self {
        Self {
            base_url: "https://api.anthropic.com".into(),
            model: "claude-sonnet-4-20250514".into(),
            timeout_seconds: default_timeout(),
            monthly_budget_usd: default_monthly_budget(),
        }
    }

    fn openai_defaults() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "gpt-4o".into(),
            timeout_seconds: default_timeout(),
            monthly_budget_usd: default_monthly_budget(),
        }
    }

    fn gemini_defaults() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-2.0-flash".into(),
            timeout_seconds: default_timeout(),
            monthly_budget_usd: default_monthly_budget(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MemorySettings {
    #[serde(default = "default_archive_age")]
    pub archive_max_age_days: i64,
    #[serde(default = "default_archive_importance")]
    pub archive_max_importance: i64,
    #[serde(default = "default_archive_access")]
    pub archive_max_access_count: i64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            archive_max_age_days: default_archive_age(),
            archive_max_importance: default_archive_importance(),
            archive_max_access_count: default_archive_access(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct KanbanSettings {
    #[serde(default = "default_in_progress_limit")]
    pub in_progress_limit: usize,
    #[serde(default = "default_review_limit")]
    pub review_limit: usize,
}

impl Default for KanbanSettings {
    fn default() -> Self {
        Self {
            in_progress_limit: default_in_progress_limit(),
            review_limit: default_review_limit(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_tasks_db() -> String {
    "data/tasks.db".into()
}
fn default_memory_db() -> String {
    "data/memory.db".into()
}
fn default_timeout() -> u64 {
    120
}
fn default_monthly_budget() -> f64 {
    100.0
}
fn default_archive_age() -> i64 {
    90
}
fn default_archive_importance() -> i64 {
    3
}
fn default_archive_access() -> i64 {
    2
}
fn default_sweep_interval() -> u64 {
    3600
}
fn default_in_progress_limit() -> usize {
    5
}
fn default_review_limit() -> usize {
    3
}

/// Load configuration from VIBEX_CONFIG (default ./vibex.toml)
pub fn load_config() -> Result<VibexConfig> {
    let config_path =
        std::env::var("VIBEX_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    if Path::new(&config_path).exists() {
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {config_path}"))?;
        let config: VibexConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {config_path}"))?;
        Ok(config)
    } else {
        tracing::warn!("Config file not found at {config_path}, using defaults");
        Ok(VibexConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VibexConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.tasks_db, "data/tasks.db");
        assert_eq!(config.kanban.in_progress_limit, 5);
        assert_eq!(config.kanban.review_limit, 3);
        assert_eq!(config.memory.archive_max_age_days, 90);
        assert_eq!(config.providers.openai.model, "gpt-4o");
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml_str = r#"
[server]
port = 3000

[kanban]
in_progress_limit = 2
"#;
        let config: VibexConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.kanban.in_progress_limit, 2);
        assert_eq!(config.kanban.review_limit, 3);
    }

    #[test]
    fn test_parse_provider_overrides() {
        let toml_str = r#"
[providers.anthropic]
base_url = "https://proxy.internal"
model = "claude-opus-4"
monthly_budget_usd = 250.0

[memory]
archive_max_age_days = 30
"#;
        let config: VibexConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.anthropic.base_url, "https://proxy.internal");
        assert_eq!(config.providers.anthropic.model, "claude-opus-4");
        assert_eq!(config.providers.anthropic.monthly_budget_usd, 250.0);
        // untouched sections keep defaults
        assert_eq!(config.providers.gemini.model, "gemini-2.0-flash");
        assert_eq!(config.memory.archive_max_age_days, 30);
        assert_eq!(config.memory.sweep_interval_seconds, 3600);
    }
}
