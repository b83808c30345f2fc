use std::collections::HashMap;

use chrono::{Duration, Utc};
use mason_types::{ProviderDefinition, ProviderState, ProviderType};

/// Holds the static provider definitions loaded once at startup plus their
/// mutable runtime state (§4.2). All lookups by unknown name are no-ops,
/// never errors — a stray `mark_success("typo")` is silently dropped.
pub struct ProviderRegistry {
    definitions: Vec<ProviderDefinition>,
    states: HashMap<String, ProviderState>,
    default_cooldown_seconds: i64,
}

impl ProviderRegistry {
    pub fn new(definitions: Vec<ProviderDefinition>, default_cooldown_seconds: i64) -> Self {
        let states = definitions
            .iter()
            .map(|d| (d.name.clone(), ProviderState::default()))
            .collect();
        Self {
            definitions,
            states,
            default_cooldown_seconds,
        }
    }

    pub fn definitions(&self) -> &[ProviderDefinition] {
        &self.definitions
    }

    pub fn state(&self, name: &str) -> Option<&ProviderState> {
        self.states.get(name)
    }

    /// Enabled definitions, ascending priority.
    pub fn enabled_providers(&self) -> Vec<ProviderDefinition> {
        let mut enabled: Vec<ProviderDefinition> =
            self.definitions.iter().filter(|d| d.enabled).cloned().collect();
        enabled.sort_by_key(|d| d.priority);
        enabled
    }

    /// Enabled definitions whose runtime state is available and not on
    /// cooldown, ascending priority.
    pub fn available_providers(&self) -> Vec<ProviderDefinition> {
        let now = Utc::now();
        self.enabled_providers()
            .into_iter()
            .filter(|d| {
                self.states
                    .get(&d.name)
                    .map(|s| s.available && !s.is_rate_limited_at(now))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn local_providers(&self) -> Vec<ProviderDefinition> {
        self.available_providers()
            .into_iter()
            .filter(|d| d.r#type == ProviderType::Local)
            .collect()
    }

    pub fn mark_rate_limited(&mut self, name: &str, cooldown_seconds: Option<i64>) {
        let cooldown = cooldown_seconds.unwrap_or(self.default_cooldown_seconds);
        if let Some(state) = self.states.get_mut(name) {
            state.rate_limited_until = Some(Utc::now() + Duration::seconds(cooldown));
            state.consecutive_failures += 1;
        }
    }

    pub fn mark_success(&mut self, name: &str) {
        if let Some(state) = self.states.get_mut(name) {
            state.last_success = Some(Utc::now());
            state.rate_limited_until = None;
            state.consecutive_failures = 0;
        }
    }

    pub fn mark_failure(&mut self, name: &str, is_rate_limit: bool) {
        let cooldown = self.default_cooldown_seconds;
        if let Some(state) = self.states.get_mut(name) {
            state.last_failure = Some(Utc::now());
            state.consecutive_failures += 1;
            if is_rate_limit {
                state.rate_limited_until = Some(Utc::now() + Duration::seconds(cooldown));
            }
        }
    }

    /// Operational override: clears cooldowns and failure counters on
    /// every tracked provider.
    pub fn reset_cooldowns(&mut self) {
        for state in self.states.values_mut() {
            state.rate_limited_until = None;
            state.consecutive_failures = 0;
        }
    }
}
