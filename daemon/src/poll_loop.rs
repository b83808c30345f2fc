use std::sync::Arc;
use std::time::Duration;

use mason_core::{BacklogClient, ExecutionEngine, QaClient, TaskCompiler};
use mason_observability::{emit_event, MasonEvent};
use mason_types::SelectionContext;
use tokio_util::sync::CancellationToken;
use tracing::Level;

/// Top-level driver (§4.5): retry phase before new-story phase, every
/// cycle, with `running`/`shutdown` checked between retry tasks, between
/// stories, between a story's packets, and on each one-second tick of the
/// inter-cycle sleep.
pub struct PollLoop {
    backlog: Arc<dyn BacklogClient>,
    qa: Arc<dyn QaClient>,
    compiler: TaskCompiler,
    engine: Arc<ExecutionEngine>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl PollLoop {
    pub fn new(
        backlog: Arc<dyn BacklogClient>,
        qa: Arc<dyn QaClient>,
        compiler: TaskCompiler,
        engine: Arc<ExecutionEngine>,
        poll_interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self { backlog, qa, compiler, engine, poll_interval, shutdown }
    }

    pub async fn run(&self) {
        while !self.shutdown.is_cancelled() {
            self.run_cycle().await;
            self.sleep_interruptible().await;
        }
    }

    /// One full cycle. Exceptions never escape a cycle in the original;
    /// here every fallible step is already handled inline (logged,
    /// operation abandoned), so there is nothing left to catch at this
    /// level — the per-call `match`/`if let Err` arms are the try/except
    /// equivalent.
    async fn run_cycle(&self) {
        self.retry_phase().await;
        self.new_work_phase().await;
    }

    async fn retry_phase(&self) {
        let retries = match self.qa.retry_queue().await {
            Ok(retries) => retries,
            Err(err) => {
                tracing::warn!(error = %err, "retry_queue_fetch_failed");
                return;
            }
        };

        for retry in retries {
            if self.shutdown.is_cancelled() {
                return;
            }
            let ctx = SelectionContext {
                task_id: retry.task_id,
                attempt: retry.attempt,
                max_attempts: retry.max_attempts,
                providers_tried: retry.providers_tried,
                last_failure_reason: retry.last_failure_reason,
                is_retry: true,
            };
            self.engine.run(ctx, None).await;
        }
    }

    async fn new_work_phase(&self) {
        let stories = match self.backlog.ready_stories().await {
            Ok(stories) => stories,
            Err(err) => {
                tracing::warn!(error = %err, "ready_stories_fetch_failed");
                return;
            }
        };

        for story in stories {
            if self.shutdown.is_cancelled() {
                return;
            }

            self.backlog.mark_in_progress(story.id).await;

            let packets = self.compiler.compile(&story);
            emit_event(
                Level::INFO,
                MasonEvent::named("story_decomposed")
                    .story(&story.id.to_string())
                    .detail(&format!("{} task(s)", packets.len())),
            );

            for packet in packets {
                if self.shutdown.is_cancelled() {
                    return;
                }

                if let Err(err) = self.qa.submit_task(&packet).await {
                    tracing::warn!(
                        task_id = %packet.identity.task_id,
                        error = %err,
                        "task_submit_failed",
                    );
                    continue;
                }

                let ctx = SelectionContext::new_for_fresh_task(
                    packet.identity.task_id,
                    packet.execution.max_attempts,
                );
                self.engine.run(ctx, Some(packet)).await;
            }
        }
    }

    async fn sleep_interruptible(&self) {
        let ticks = self.poll_interval.as_secs().max(1);
        for _ in 0..ticks {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                _ = self.shutdown.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mason_core::{CompilerConfig, MasonError, ProviderRegistry, ProviderSelector};
    use mason_types::{ProviderStatsMap, QueueStats, RetryTask, Story};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct CountingBacklog {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BacklogClient for CountingBacklog {
        async fn ready_stories(&self) -> Result<Vec<Story>, MasonError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn get_story(&self, _story_id: i64) -> Result<Story, MasonError> {
            Err(MasonError::Http("not implemented in stub".to_string()))
        }

        async fn mark_in_progress(&self, _story_id: i64) -> bool {
            true
        }
    }

    struct EmptyQa;

    #[async_trait]
    impl QaClient for EmptyQa {
        async fn queue_stats(&self) -> Result<QueueStats, MasonError> {
            Ok(QueueStats::default())
        }

        async fn provider_stats(&self) -> Result<ProviderStatsMap, MasonError> {
            Ok(ProviderStatsMap::default())
        }

        async fn retry_queue(&self) -> Result<Vec<RetryTask>, MasonError> {
            Ok(Vec::new())
        }

        async fn submit_task(&self, _packet: &mason_types::TaskPacket) -> Result<(), MasonError> {
            Ok(())
        }

        async fn start_run(
            &self,
            _task_id: uuid::Uuid,
            _provider_name: &str,
            _confidence_weight: f64,
        ) -> Result<String, MasonError> {
            Ok("run-1".to_string())
        }

        async fn complete_run(
            &self,
            _task_id: uuid::Uuid,
            _run_id: &str,
            _bundle: &mason_types::ArtifactBundle,
        ) -> bool {
            true
        }
    }

    /// Scenario: SIGTERM-equivalent cancellation during the inter-cycle
    /// sleep flips `running` within roughly a second and the loop returns
    /// without starting another cycle.
    #[tokio::test(start_paused = true)]
    async fn shutdown_during_sleep_stops_the_loop_promptly() {
        let backlog = Arc::new(CountingBacklog { calls: AtomicUsize::new(0) });
        let qa: Arc<dyn QaClient> = Arc::new(EmptyQa);
        let compiler = TaskCompiler::new(CompilerConfig { default_max_attempts: 3, max_tasks_per_story: 10 });
        let registry = Arc::new(Mutex::new(ProviderRegistry::new(Vec::new(), 300)));
        let selector = Arc::new(ProviderSelector::new(registry, qa.clone(), 50));
        let engine = Arc::new(ExecutionEngine::new(selector, qa.clone(), HashMap::new()));

        let shutdown = CancellationToken::new();
        let poll_loop = PollLoop::new(
            backlog.clone(),
            qa,
            compiler,
            engine,
            Duration::from_secs(30),
            shutdown.clone(),
        );

        let shutdown_trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            shutdown_trigger.cancel();
        });

        tokio::time::timeout(Duration::from_secs(5), poll_loop.run()).await.unwrap();

        // One cycle ran before the sleep was interrupted; no second cycle
        // started once `running` flipped false.
        assert_eq!(backlog.calls.load(Ordering::SeqCst), 1);
    }
}
