use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mason_types::ProviderDefinition;

use crate::cli::CliAdapter;
use crate::echo::EchoAdapter;
use crate::local_http::LocalHttpAdapter;
use crate::provider::{Provider, DEFAULT_RATE_LIMIT_PATTERNS};

/// Builds one initialized adapter per enabled provider definition, keyed
/// by provider name. Definitions whose `adapter_key()` names no known
/// adapter implementation are skipped — the execution engine treats a
/// missing adapter as a configuration error, not a task failure (§4.4).
///
/// Falls back to a single `EchoAdapter` when the resulting map would
/// otherwise be empty, so the daemon can still exercise its dispatch loop
/// with no adapters configured.
pub fn build_adapters(
    definitions: &[ProviderDefinition],
    artifacts_root: &std::path::Path,
) -> HashMap<String, Arc<dyn Provider>> {
    let mut adapters: HashMap<String, Arc<dyn Provider>> = HashMap::new();

    for defn in definitions.iter().filter(|d| d.enabled) {
        let Some(adapter) = build_one(defn, artifacts_root) else {
            continue;
        };
        adapters.insert(defn.name.clone(), adapter);
    }

    if adapters.is_empty() {
        adapters.insert("local".to_string(), Arc::new(EchoAdapter::new("local")));
    }

    adapters
}

fn build_one(defn: &ProviderDefinition, artifacts_root: &std::path::Path) -> Option<Arc<dyn Provider>> {
    let config = &defn.config;
    let timeout_seconds = config
        .get("timeout_seconds")
        .and_then(|v| v.as_u64())
        .unwrap_or(300);
    let timeout = Duration::from_secs(timeout_seconds);

    match defn.adapter_key() {
        "claude_cli" => {
            let executable = config
                .get("executable")
                .and_then(|v| v.as_str())
                .unwrap_or("claude")
                .to_string();
            let patterns = rate_limit_patterns(config);
            Some(Arc::new(CliAdapter::new(
                defn.name.clone(),
                executable,
                Vec::new(),
                artifacts_root.join("claude"),
                timeout,
                patterns,
            )))
        }
        "goose" => {
            let executable = config
                .get("executable")
                .and_then(|v| v.as_str())
                .unwrap_or("goose")
                .to_string();
            let model = config
                .get("model")
                .and_then(|v| v.as_str())
                .unwrap_or("qwen2.5-coder:14b")
                .to_string();
            Some(Arc::new(CliAdapter::new(
                defn.name.clone(),
                executable,
                vec!["run".to_string(), "--model".to_string(), model],
                artifacts_root.join("goose"),
                timeout,
                // Goose has no rate-limit surface; matches the original's
                // empty RATE_LIMIT_PATTERNS for this adapter.
                Vec::new(),
            )))
        }
        "ollama" => {
            let model = config
                .get("model")
                .and_then(|v| v.as_str())
                .unwrap_or("qwen2.5-coder:14b")
                .to_string();
            let host = config
                .get("host")
                .and_then(|v| v.as_str())
                .unwrap_or("http://localhost:11434")
                .to_string();
            Some(Arc::new(LocalHttpAdapter::new(
                defn.name.clone(),
                model,
                host,
                timeout,
            )))
        }
        "echo" => Some(Arc::new(EchoAdapter::new(defn.name.clone()))),
        _ => {
            tracing::warn!(provider = %defn.name, adapter = %defn.adapter_key(), "unknown_adapter_key");
            None
        }
    }
}

fn rate_limit_patterns(config: &serde_json::Value) -> Vec<String> {
    config
        .get("rate_limit_patterns")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_else(|| {
            DEFAULT_RATE_LIMIT_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
}
