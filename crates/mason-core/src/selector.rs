use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use mason_observability::{emit_event, MasonEvent};
use mason_types::{ProviderDefinition, ProviderStatsMap, SelectionContext};
use tokio::sync::Mutex;
use tracing::Level;

use crate::clients::QaClient;
use crate::registry::ProviderRegistry;

/// A neutral prior used when the QA service has no run history yet for a
/// provider (`total_runs == 0`).
const NEUTRAL_SUCCESS_RATE: f64 = 0.5;

/// Per-attempt provider scoring and ranking (§4.3). Holds injected,
/// shared-ownership handles to the registry and QA client rather than
/// owning either — both outlive any one `ProviderSelector` (§9 design
/// note on weak back-references).
pub struct ProviderSelector {
    registry: Arc<Mutex<ProviderRegistry>>,
    qa: Arc<dyn QaClient>,
    stats_cache: Mutex<ProviderStatsMap>,
    high_load_threshold: u64,
}

impl ProviderSelector {
    pub fn new(
        registry: Arc<Mutex<ProviderRegistry>>,
        qa: Arc<dyn QaClient>,
        high_load_threshold: u64,
    ) -> Self {
        Self {
            registry,
            qa,
            stats_cache: Mutex::new(ProviderStatsMap::default()),
            high_load_threshold,
        }
    }

    /// Picks a provider for the next attempt, or `None` if nothing is
    /// eligible. Steps match §4.3 exactly, including the documented
    /// fallback to the full available set when every provider has already
    /// been tried this task.
    pub async fn select(&self, ctx: &SelectionContext) -> Option<ProviderDefinition> {
        let available = self.registry.lock().await.available_providers();
        if available.is_empty() {
            return None;
        }

        let tried: HashSet<&str> = ctx.providers_tried.iter().map(String::as_str).collect();
        let mut candidates: Vec<ProviderDefinition> = available
            .iter()
            .filter(|d| !tried.contains(d.name.as_str()))
            .cloned()
            .collect();
        if candidates.is_empty() {
            candidates = available;
        }
        if candidates.is_empty() {
            return None;
        }

        if let Ok(stats) = self.qa.queue_stats().await {
            if stats.total_active > self.high_load_threshold {
                candidates = self.prefer_local(candidates).await;
            }
        }

        if let Ok(stats) = self.qa.provider_stats().await {
            *self.stats_cache.lock().await = stats;
        }

        let cache = self.stats_cache.lock().await;
        best_by_score(candidates, &cache)
    }

    async fn prefer_local(&self, candidates: Vec<ProviderDefinition>) -> Vec<ProviderDefinition> {
        let locals = self.registry.lock().await.local_providers();
        if locals.is_empty() {
            return candidates;
        }
        let local_names: HashSet<&str> = locals.iter().map(|d| d.name.as_str()).collect();
        let intersected: Vec<ProviderDefinition> = candidates
            .iter()
            .filter(|d| local_names.contains(d.name.as_str()))
            .cloned()
            .collect();
        if intersected.is_empty() {
            return candidates;
        }
        emit_event(Level::INFO, MasonEvent::named("high_load_local_preferred"));
        intersected
    }

    /// Forwards the outcome of one attempt to the registry.
    pub async fn report_result(&self, provider: &str, success: bool, is_rate_limit: bool) {
        let mut registry = self.registry.lock().await;
        if success {
            registry.mark_success(provider);
        } else {
            registry.mark_failure(provider, is_rate_limit);
        }
    }
}

/// `score(p) = (1/priority(p)) * success_rate(p) * confidence_weight(p)`.
/// Returns the highest-scoring candidate, breaking ties by input order
/// (candidates arrive ascending-priority from the registry, so a strict
/// `>` comparison keeps the first of any tied group).
fn best_by_score(
    candidates: Vec<ProviderDefinition>,
    stats: &ProviderStatsMap,
) -> Option<ProviderDefinition> {
    let mut best: Option<(ProviderDefinition, f64)> = None;
    for candidate in candidates {
        let score = score_provider(&candidate, stats);
        let replace = match &best {
            Some((_, best_score)) => score.partial_cmp(best_score) == Some(Ordering::Greater),
            None => true,
        };
        if replace {
            best = Some((candidate, score));
        }
    }
    best.map(|(def, _)| def)
}

fn score_provider(def: &ProviderDefinition, stats: &ProviderStatsMap) -> f64 {
    let success_rate = stats
        .get(&def.name)
        .filter(|s| s.total_runs > 0)
        .map(|s| s.success_rate)
        .unwrap_or(NEUTRAL_SUCCESS_RATE);
    (1.0 / def.priority as f64) * success_rate * def.confidence_weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mason_types::{ArtifactBundle, ProviderStats, ProviderType, QueueStats, RetryTask, TaskPacket};
    use serde_json::Value;
    use std::sync::Mutex as StdMutex;
    use uuid::Uuid;

    struct StubQa {
        total_active: u64,
        stats: ProviderStatsMap,
        queue_calls: StdMutex<u32>,
    }

    impl StubQa {
        fn new(total_active: u64, stats: ProviderStatsMap) -> Self {
            Self { total_active, stats, queue_calls: StdMutex::new(0) }
        }
    }

    #[async_trait]
    impl QaClient for StubQa {
        async fn queue_stats(&self) -> Result<QueueStats, crate::error::MasonError> {
            *self.queue_calls.lock().unwrap() += 1;
            Ok(QueueStats { total_active: self.total_active, ..Default::default() })
        }

        async fn provider_stats(&self) -> Result<ProviderStatsMap, crate::error::MasonError> {
            Ok(self.stats.clone())
        }

        async fn retry_queue(&self) -> Result<Vec<RetryTask>, crate::error::MasonError> {
            Ok(Vec::new())
        }

        async fn submit_task(&self, _packet: &TaskPacket) -> Result<(), crate::error::MasonError> {
            Ok(())
        }

        async fn start_run(
            &self,
            _task_id: Uuid,
            _provider_name: &str,
            _confidence_weight: f64,
        ) -> Result<String, crate::error::MasonError> {
            Ok("run-1".to_string())
        }

        async fn complete_run(&self, _task_id: Uuid, _run_id: &str, _bundle: &ArtifactBundle) -> bool {
            true
        }
    }

    fn def(name: &str, priority: u32, r#type: ProviderType, confidence_weight: f64) -> ProviderDefinition {
        ProviderDefinition {
            name: name.to_string(),
            priority,
            r#type,
            adapter: None,
            rate_limit_strategy: "none".to_string(),
            confidence_weight,
            enabled: true,
            config: Value::Null,
        }
    }

    fn ctx(task_id: Uuid) -> SelectionContext {
        SelectionContext::new_for_fresh_task(task_id, 3)
    }

    fn stats(total_runs: u64, success_rate: f64) -> ProviderStats {
        ProviderStats { total_runs, success_rate, ..Default::default() }
    }

    #[tokio::test]
    async fn selects_higher_scoring_provider() {
        let registry = Arc::new(Mutex::new(ProviderRegistry::new(
            vec![
                def("a", 1, ProviderType::Api, 1.0),
                def("b", 2, ProviderType::Api, 1.0),
            ],
            300,
        )));
        let mut provider_stats = ProviderStatsMap::default();
        provider_stats.insert("a".to_string(), stats(10, 0.9));
        provider_stats.insert("b".to_string(), stats(10, 0.9));
        let qa: Arc<dyn QaClient> = Arc::new(StubQa::new(0, provider_stats));
        let selector = ProviderSelector::new(registry, qa, 50);

        let chosen = selector.select(&ctx(Uuid::new_v4())).await.unwrap();
        assert_eq!(chosen.name, "a");
    }

    #[tokio::test]
    async fn excludes_providers_already_tried() {
        let registry = Arc::new(Mutex::new(ProviderRegistry::new(
            vec![
                def("a", 1, ProviderType::Api, 1.0),
                def("b", 2, ProviderType::Api, 1.0),
            ],
            300,
        )));
        let qa: Arc<dyn QaClient> = Arc::new(StubQa::new(0, ProviderStatsMap::default()));
        let selector = ProviderSelector::new(registry, qa, 50);

        let mut context = ctx(Uuid::new_v4());
        context.providers_tried.push("a".to_string());
        let chosen = selector.select(&context).await.unwrap();
        assert_eq!(chosen.name, "b");
    }

    #[tokio::test]
    async fn falls_back_to_full_set_when_all_tried() {
        let registry = Arc::new(Mutex::new(ProviderRegistry::new(
            vec![def("a", 1, ProviderType::Api, 1.0)],
            300,
        )));
        let qa: Arc<dyn QaClient> = Arc::new(StubQa::new(0, ProviderStatsMap::default()));
        let selector = ProviderSelector::new(registry, qa, 50);

        let mut context = ctx(Uuid::new_v4());
        context.providers_tried.push("a".to_string());
        let chosen = selector.select(&context).await.unwrap();
        assert_eq!(chosen.name, "a");
    }

    #[tokio::test]
    async fn high_load_prefers_local_even_with_lower_score() {
        let registry = Arc::new(Mutex::new(ProviderRegistry::new(
            vec![
                def("api", 1, ProviderType::Api, 1.0),
                def("local", 2, ProviderType::Local, 1.0),
            ],
            300,
        )));
        let mut provider_stats = ProviderStatsMap::default();
        provider_stats.insert("api".to_string(), stats(10, 1.0));
        provider_stats.insert("local".to_string(), stats(10, 0.1));
        let qa: Arc<dyn QaClient> = Arc::new(StubQa::new(100, provider_stats));
        let selector = ProviderSelector::new(registry, qa, 50);

        let chosen = selector.select(&ctx(Uuid::new_v4())).await.unwrap();
        assert_eq!(chosen.name, "local");
    }

    #[tokio::test]
    async fn report_result_updates_registry() {
        let registry = Arc::new(Mutex::new(ProviderRegistry::new(
            vec![def("a", 1, ProviderType::Api, 1.0)],
            300,
        )));
        let qa: Arc<dyn QaClient> = Arc::new(StubQa::new(0, ProviderStatsMap::default()));
        let selector = ProviderSelector::new(registry.clone(), qa, 50);

        selector.report_result("a", false, true).await;
        assert!(registry.lock().await.available_providers().is_empty());

        selector.report_result("a", true, false).await;
        assert!(registry.lock().await.available_providers().iter().any(|d| d.name == "a"));
    }
}
