//! Budget manager — tracks provider spend and enforces monthly limits

use chrono::Datelike;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::PROVIDERS;

struct ProviderBudget {
    monthly_budget_usd: f64,
    used_usd: f64,
}

/// One recorded API call
#[derive(Debug, Clone, Serialize)]
pub struct UsageRecord {
    pub provider: String,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct ProviderBudgetStatus {
    pub provider: String,
    pub monthly_budget_usd: f64,
    pub used_usd: f64,
    pub exceeded: bool,
}

#[derive(Debug, Serialize)]
pub struct BudgetStatus {
    pub providers: Vec<ProviderBudgetStatus>,
    pub total_used_usd: f64,
    pub daily_rate_usd: f64,
    pub days_remaining: i32,
    pub exhausted: bool,
}

#[derive(Debug, Serialize)]
pub struct UsageSummary {
    pub records: Vec<UsageRecord>,
    pub total_cost_usd: f64,
    pub total_requests: i64,
    pub total_tokens: i64,
}

/// Tracks per-provider monthly spend
pub struct BudgetManager {
    providers: HashMap<String, ProviderBudget>,
    usage_records: Vec<UsageRecord>,
    month_start: i64,
}

impl BudgetManager {
    /// `budgets` pairs a provider name with its monthly USD budget
    pub fn new(budgets: &[(&str, f64)]) -> Self {
        let providers = budgets
            .iter()
            .map(|(name, budget)| {
                (
                    name.to_string(),
                    ProviderBudget {
                        monthly_budget_usd: *budget,
                        used_usd: 0.0,
                    },
                )
            })
            .collect();
        Self {
            providers,
            usage_records: Vec::new(),
            month_start: current_month_start(),
        }
    }

    /// Record a completed call and its cost
    pub fn record_usage(&mut self, provider: &str, input_tokens: i64, output_tokens: i64, model: &str) {
        self.maybe_reset_monthly();

        let cost = cost_for(provider, input_tokens, output_tokens);
        if let Some(entry) = self.providers.get_mut(provider) {
            entry.used_usd += cost;

            if entry.used_usd > entry.monthly_budget_usd * 0.8 {
                warn!(
                    "{provider} budget warning: ${:.2} / ${:.2}",
                    entry.used_usd, entry.monthly_budget_usd
                );
            }
        }

        self.usage_records.push(UsageRecord {
            provider: provider.to_string(),
            model: model.to_string(),
            input_tokens,
            output_tokens,
            cost_usd: cost,
            timestamp: chrono::Utc::now().timestamp(),
        });

        info!(
            "API usage: provider={provider} tokens={} cost=${cost:.4}",
            input_tokens + output_tokens
        );
    }

    /// True when every configured provider has exceeded its budget
    pub fn is_exhausted(&self) -> bool {
        !self.providers.is_empty()
            && self
                .providers
                .values()
                .all(|p| p.used_usd >= p.monthly_budget_usd)
    }

    /// Unknown providers are always treated as exceeded
    pub fn is_provider_exceeded(&self, provider: &str) -> bool {
        match self.providers.get(provider) {
            Some(p) => p.used_usd >= p.monthly_budget_usd,
            None => true,
        }
    }

    /// Reject a request before it is sent when the budget cannot cover it
    pub fn pre_check(&self, provider: &str) -> Result<(), String> {
        if self.is_exhausted() {
            return Err("all provider budgets exceeded for this billing period".to_string());
        }
        if self.is_provider_exceeded(provider) {
            return match self.providers.get(provider) {
                Some(p) => Err(format!(
                    "{provider} budget exceeded: ${:.2} / ${:.2}",
                    p.used_usd, p.monthly_budget_usd
                )),
                None => Err(format!("unknown provider: {provider}")),
            };
        }
        Ok(())
    }

    pub fn remaining(&self, provider: &str) -> f64 {
        self.providers
            .get(provider)
            .map(|p| (p.monthly_budget_usd - p.used_usd).max(0.0))
            .unwrap_or(0.0)
    }

    pub fn status(&self) -> BudgetStatus {
        let now = chrono::Utc::now();
        let day_of_month = now.day() as i32;
        let days_remaining = (30 - day_of_month).max(0);

        let providers: Vec<ProviderBudgetStatus> = PROVIDERS
            .iter()
            .filter_map(|name| {
                self.providers.get(*name).map(|p| ProviderBudgetStatus {
                    provider: name.to_string(),
                    monthly_budget_usd: p.monthly_budget_usd,
                    used_usd: p.used_usd,
                    exceeded: p.used_usd >= p.monthly_budget_usd,
                })
            })
            .collect();

        let total_used: f64 = providers.iter().map(|p| p.used_usd).sum();
        let daily_rate = if day_of_month > 0 {
            total_used / day_of_month as f64
        } else {
            0.0
        };

        BudgetStatus {
            providers,
            total_used_usd: total_used,
            daily_rate_usd: daily_rate,
            days_remaining,
            exhausted: self.is_exhausted(),
        }
    }

    /// Usage records for a provider (empty name = all) over the last `days`
    pub fn usage(&self, provider: &str, days: i64) -> UsageSummary {
        let cutoff = chrono::Utc::now().timestamp() - days * 86_400;
        let records: Vec<UsageRecord> = self
            .usage_records
            .iter()
            .filter(|r| (provider.is_empty() || r.provider == provider) && r.timestamp >= cutoff)
            .cloned()
            .collect();

        let total_cost = records.iter().map(|r| r.cost_usd).sum();
        let total_requests = records.len() as i64;
        let total_tokens = records
            .iter()
            .map(|r| r.input_tokens + r.output_tokens)
            .sum();

        UsageSummary {
            records,
            total_cost_usd: total_cost,
            total_requests,
            total_tokens,
        }
    }

    fn maybe_reset_monthly(&mut self) {
        let current_start = current_month_start();
        if current_start > self.month_start {
            info!("New billing month, resetting provider spend counters");
            for entry in self.providers.values_mut() {
                entry.used_usd = 0.0;
            }
            self.usage_records.clear();
            self.month_start = current_start;
        }
    }
}

fn cost_for(provider: &str, input_tokens: i64, output_tokens: i64) -> f64 {
    match provider {
        "anthropic" => crate::anthropic::cost_usd(input_tokens, output_tokens),
        "openai" => crate::openai::cost_usd(input_tokens, output_tokens),
        "gemini" => crate::gemini::cost_usd(input_tokens, output_tokens),
        _ => 0.0,
    }
}

fn current_month_start() -> i64 {
    let now = chrono::Utc::now();
    let start = now.date_naive().with_day(1).unwrap_or(now.date_naive());
    start
        .and_hms_opt(0, 0, 0)
        .map(|dt: chrono::NaiveDateTime| dt.and_utc().timestamp())
        .unwrap_or(0)
}
