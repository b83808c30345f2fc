use async_trait::async_trait;
use mason_types::{ArtifactBundle, TaskPacket};

use crate::provider::Provider;

/// Always-succeeds stub adapter. Used in this crate's own tests and, per
/// the teacher's `LocalEchoProvider` pattern, as the registry's fallback
/// when no adapters initialize — keeps the daemon able to start and
/// exercise the dispatch loop in a bare dev environment.
pub struct EchoAdapter {
    name: String,
}

impl EchoAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Provider for EchoAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, packet: &TaskPacket) -> ArtifactBundle {
        ArtifactBundle::success(packet.identity.task_id, &self.name)
            .with_logs(format!("echo: {}", packet.goal.title))
            .with_duration(0)
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn detect_rate_limit(&self, _text: &str) -> bool {
        false
    }
}
