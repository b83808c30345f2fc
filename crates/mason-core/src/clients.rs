use async_trait::async_trait;
use mason_types::{ArtifactBundle, ProviderStatsMap, QueueStats, RetryTask, Story, TaskPacket};
use uuid::Uuid;

use crate::error::MasonError;

/// The backlog service collaborator (§6). Mason only reads ready-for-dev
/// stories and best-effort marks them in progress; the concrete HTTP
/// wiring lives in `mason-clients`, kept out of `mason-core` so the
/// scheduling engine can be exercised against an in-memory stand-in.
#[async_trait]
pub trait BacklogClient: Send + Sync {
    async fn ready_stories(&self) -> Result<Vec<Story>, MasonError>;

    /// `GET /stories/{id}`, used by operational tooling and the (currently
    /// unresolved) retry-packet-recovery path — see the design note in §9.
    async fn get_story(&self, story_id: i64) -> Result<Story, MasonError>;

    /// `POST /stories/{id}/in-progress`. Best-effort: failures are
    /// swallowed per §6, so the poll loop never aborts a story on this call.
    async fn mark_in_progress(&self, story_id: i64) -> bool;
}

/// The QA service collaborator (§6): run accounting, statistics, the
/// retry queue, and task submission.
#[async_trait]
pub trait QaClient: Send + Sync {
    async fn queue_stats(&self) -> Result<QueueStats, MasonError>;

    async fn provider_stats(&self) -> Result<ProviderStatsMap, MasonError>;

    async fn retry_queue(&self) -> Result<Vec<RetryTask>, MasonError>;

    async fn submit_task(&self, packet: &TaskPacket) -> Result<(), MasonError>;

    async fn start_run(
        &self,
        task_id: Uuid,
        provider_name: &str,
        confidence_weight: f64,
    ) -> Result<String, MasonError>;

    /// Best-effort: transport/status failures are logged by the caller,
    /// not propagated, per §4.4 step 5.
    async fn complete_run(&self, task_id: Uuid, run_id: &str, bundle: &ArtifactBundle) -> bool;
}
