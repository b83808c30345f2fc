use serde::Deserialize;
use uuid::Uuid;

/// `GET /queue/stats` snapshot. Mason only consumes `total_active`; the
/// remaining counters are carried through for observability/debugging.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QueueStats {
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub queued: u64,
    #[serde(default)]
    pub running: u64,
    #[serde(default)]
    pub awaiting_qa: u64,
    #[serde(default)]
    pub in_qa: u64,
    #[serde(default)]
    pub passed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub retry: u64,
    #[serde(default)]
    pub exhausted: u64,
    #[serde(default)]
    pub escalated: u64,
    #[serde(default)]
    pub total_active: u64,
    #[serde(default)]
    pub total_completed: u64,
    #[serde(default)]
    pub total_failed: u64,
}

/// A task pulled off `GET /tasks/retry-queue`, with enough context to
/// reconstruct a `SelectionContext` for a retry attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryTask {
    pub task_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub last_provider: Option<String>,
    #[serde(default)]
    pub last_failure_reason: Option<String>,
    #[serde(default)]
    pub providers_tried: Vec<String>,
}

fn default_max_attempts() -> u32 {
    3
}

/// Opaque acknowledgement returned by `POST /tasks`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSubmitAck {
    #[serde(default)]
    pub task_id: Option<Uuid>,
}

/// `POST /tasks/{id}/start-run` response.
#[derive(Debug, Clone, Deserialize)]
pub struct StartRunResponse {
    pub run_id: String,
}
