pub mod build;
pub mod cli;
pub mod echo;
pub mod local_http;
pub mod provider;

pub use build::build_adapters;
pub use cli::CliAdapter;
pub use echo::EchoAdapter;
pub use local_http::LocalHttpAdapter;
pub use provider::{build_prompt, matches_any_pattern, Provider, DEFAULT_RATE_LIMIT_PATTERNS};

#[cfg(test)]
mod tests {
    use super::*;
    use mason_types::{
        ComplexityHint, TaskConstraints, TaskExecution, TaskGoal, TaskIdentity, TaskInputs,
        TaskMetadata, TaskPacket, TaskProviderContext,
    };
    use uuid::Uuid;

    fn sample_packet() -> TaskPacket {
        TaskPacket {
            identity: TaskIdentity {
                task_id: Uuid::new_v4(),
                story_id: 1,
                epic_id: None,
            },
            goal: TaskGoal {
                title: "Add retry support".to_string(),
                description: "Wire up retries for the poller".to_string(),
                success_criteria: vec!["Retries use backoff".to_string()],
            },
            constraints: TaskConstraints::default(),
            inputs: TaskInputs::default(),
            execution: TaskExecution {
                max_attempts: 3,
                current_attempt: 0,
                timeout_seconds: 300,
            },
            provider_context: TaskProviderContext {
                preferred_model: None,
                complexity_hint: ComplexityHint::Medium,
            },
            metadata: TaskMetadata {
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
                source_domain: "devbacklog".to_string(),
                priority: 0,
                est_points: None,
            },
        }
    }

    #[tokio::test]
    async fn echo_adapter_always_succeeds() {
        let adapter = EchoAdapter::new("local");
        let packet = sample_packet();
        let bundle = adapter.generate(&packet).await;
        assert_eq!(bundle.execution_status, mason_types::ExecutionStatus::Success);
        assert!(adapter.is_available().await);
        assert!(!adapter.detect_rate_limit("anything"));
    }

    #[test]
    fn build_prompt_includes_title_and_criteria() {
        let packet = sample_packet();
        let prompt = build_prompt(&packet);
        assert!(prompt.contains("Add retry support"));
        assert!(prompt.contains("Retries use backoff"));
    }
}
