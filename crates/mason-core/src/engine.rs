use std::collections::HashMap;
use std::sync::Arc;

use mason_observability::{emit_event, MasonEvent};
use mason_providers::Provider;
use mason_types::{ExecutionStatus, SelectionContext, TaskPacket};
use tracing::Level;

use crate::clients::QaClient;
use crate::selector::ProviderSelector;

/// Drives one `SelectionContext` through attempts with per-attempt
/// provider failover (§4.4). The loop condition is `attempt < max_attempts`;
/// `provider_failure` outcomes retry without consuming an attempt,
/// `failure` outcomes do.
pub struct ExecutionEngine {
    selector: Arc<ProviderSelector>,
    qa: Arc<dyn QaClient>,
    adapters: HashMap<String, Arc<dyn Provider>>,
}

impl ExecutionEngine {
    pub fn new(
        selector: Arc<ProviderSelector>,
        qa: Arc<dyn QaClient>,
        adapters: HashMap<String, Arc<dyn Provider>>,
    ) -> Self {
        Self { selector, qa, adapters }
    }

    /// `packet` is `None` for tasks pulled from the retry queue — see the
    /// retry-packet-recovery design note (§9). In that case the engine
    /// selects a provider, discovers it has nothing to submit, logs
    /// `no_task_packet_for_retry`, and returns without consuming an
    /// attempt or calling out to any adapter.
    pub async fn run(&self, mut ctx: SelectionContext, packet: Option<TaskPacket>) {
        let task_id = ctx.task_id.to_string();

        while ctx.attempt < ctx.max_attempts {
            let Some(provider_def) = self.selector.select(&ctx).await else {
                emit_event(
                    Level::WARN,
                    MasonEvent::named("no_provider_available")
                        .task(&task_id)
                        .attempt(ctx.attempt),
                );
                return;
            };

            let Some(packet) = packet.as_ref() else {
                emit_event(
                    Level::WARN,
                    MasonEvent::named("no_task_packet_for_retry")
                        .task(&task_id)
                        .provider(&provider_def.name)
                        .attempt(ctx.attempt),
                );
                return;
            };

            let Some(adapter) = self.adapters.get(&provider_def.name).cloned() else {
                let err = crate::error::MasonError::ProviderNotInitialized(provider_def.name.clone());
                tracing::warn!(provider = %provider_def.name, task_id = %task_id, error = %err, "provider_not_initialized");
                ctx.providers_tried.push(provider_def.name.clone());
                continue;
            };

            let run_id = match self
                .qa
                .start_run(ctx.task_id, &provider_def.name, provider_def.confidence_weight)
                .await
            {
                Ok(run_id) => run_id,
                Err(err) => {
                    tracing::error!(task_id = %task_id, error = %err, "start_run_failed");
                    return;
                }
            };

            let bundle = adapter.generate(packet).await;

            if !self.qa.complete_run(ctx.task_id, &run_id, &bundle).await {
                tracing::warn!(task_id = %task_id, run_id = %run_id, "complete_run_failed");
            }

            match bundle.execution_status {
                ExecutionStatus::Success => {
                    self.selector.report_result(&provider_def.name, true, false).await;
                    return;
                }
                ExecutionStatus::ProviderFailure => {
                    self.selector
                        .report_result(&provider_def.name, false, bundle.is_rate_limit)
                        .await;
                    ctx.providers_tried.push(provider_def.name.clone());
                    ctx.last_failure_reason = bundle.error.clone();
                    emit_event(
                        Level::INFO,
                        MasonEvent::named("provider_failure_failover")
                            .task(&task_id)
                            .provider(&provider_def.name)
                            .attempt(ctx.attempt),
                    );
                }
                ExecutionStatus::Failure => {
                    self.selector.report_result(&provider_def.name, false, false).await;
                    ctx.providers_tried.push(provider_def.name.clone());
                    ctx.last_failure_reason = bundle.error.clone();
                    ctx.attempt += 1;
                    emit_event(
                        Level::WARN,
                        MasonEvent::named("task_failed")
                            .task(&task_id)
                            .provider(&provider_def.name)
                            .attempt(ctx.attempt)
                            .detail(bundle.error.as_deref().unwrap_or("")),
                    );
                }
            }
        }

        emit_event(
            Level::ERROR,
            MasonEvent::named("task_exhausted")
                .task(&task_id)
                .attempt(ctx.attempt)
                .detail(&ctx.providers_tried.join(",")),
        );
    }
}
