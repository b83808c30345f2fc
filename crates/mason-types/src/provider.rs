use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Transport/execution family a provider belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Api,
    Cli,
    Local,
}

/// Static provider configuration, loaded once at startup from the
/// providers document. Never mutated after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDefinition {
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_provider_type")]
    pub r#type: ProviderType,
    #[serde(default)]
    pub adapter: Option<String>,
    #[serde(default = "default_rate_limit_strategy")]
    pub rate_limit_strategy: String,
    #[serde(default = "default_confidence_weight")]
    pub confidence_weight: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub config: Value,
}

impl ProviderDefinition {
    /// The definition's effective adapter key: the explicit `adapter`
    /// field if set, otherwise the provider's own `name`.
    pub fn adapter_key(&self) -> &str {
        self.adapter.as_deref().unwrap_or(&self.name)
    }
}

fn default_priority() -> u32 {
    99
}

fn default_provider_type() -> ProviderType {
    ProviderType::Cli
}

fn default_rate_limit_strategy() -> String {
    "none".to_string()
}

fn default_confidence_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

/// Providers document root shape: `{"providers": [...]}`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersDocument {
    #[serde(default)]
    pub providers: Vec<ProviderDefinition>,
}

/// Mutable runtime state tracked per provider for the daemon's lifetime.
///
/// Invariants: if `rate_limited_until` is set and in the future, the
/// provider is excluded from selection. A success resets
/// `consecutive_failures` to 0 and clears `rate_limited_until`.
#[derive(Debug, Clone)]
pub struct ProviderState {
    pub available: bool,
    pub rate_limited_until: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            available: true,
            rate_limited_until: None,
            consecutive_failures: 0,
            last_success: None,
            last_failure: None,
        }
    }
}

impl ProviderState {
    /// True when the cooldown, if any, has not yet elapsed.
    pub fn is_rate_limited_at(&self, now: DateTime<Utc>) -> bool {
        self.rate_limited_until.map(|until| until > now).unwrap_or(false)
    }
}

/// Per-provider historical counters, as snapshotted from the QA service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProviderStats {
    #[serde(default)]
    pub total_runs: u64,
    #[serde(default)]
    pub successes: u64,
    #[serde(default)]
    pub failures: u64,
    #[serde(default)]
    pub provider_failures: u64,
    #[serde(default)]
    pub success_rate: f64,
    #[serde(default)]
    pub avg_duration_ms: u64,
}

/// `GET /queue/provider-stats` response: provider name -> stats.
pub type ProviderStatsMap = HashMap<String, ProviderStats>;
