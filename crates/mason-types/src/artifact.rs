use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome classification for one provider invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failure,
    ProviderFailure,
}

/// What a provider returns to Mason after one `generate` call.
///
/// Invariant: `is_rate_limit == true` implies
/// `execution_status == ExecutionStatus::ProviderFailure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub task_id: Uuid,
    pub provider: String,
    pub execution_status: ExecutionStatus,
    #[serde(default)]
    pub files_modified: Vec<String>,
    #[serde(default)]
    pub diff_summary: Option<String>,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub artifacts_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub is_rate_limit: bool,
}

impl ArtifactBundle {
    /// Builds a `success` bundle.
    pub fn success(task_id: Uuid, provider: impl Into<String>) -> Self {
        Self {
            task_id,
            provider: provider.into(),
            execution_status: ExecutionStatus::Success,
            files_modified: Vec::new(),
            diff_summary: None,
            logs: None,
            duration_ms: None,
            artifacts_path: None,
            error: None,
            is_rate_limit: false,
        }
    }

    /// Builds a `failure` bundle carrying an error message.
    pub fn failure(task_id: Uuid, provider: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id,
            provider: provider.into(),
            execution_status: ExecutionStatus::Failure,
            files_modified: Vec::new(),
            diff_summary: None,
            logs: None,
            duration_ms: None,
            artifacts_path: None,
            error: Some(error.into()),
            is_rate_limit: false,
        }
    }

    /// Builds a `provider_failure` bundle, optionally flagged as a rate limit.
    pub fn provider_failure(
        task_id: Uuid,
        provider: impl Into<String>,
        error: impl Into<String>,
        is_rate_limit: bool,
    ) -> Self {
        Self {
            task_id,
            provider: provider.into(),
            execution_status: ExecutionStatus::ProviderFailure,
            files_modified: Vec::new(),
            diff_summary: None,
            logs: None,
            duration_ms: None,
            artifacts_path: None,
            error: Some(error.into()),
            is_rate_limit,
        }
    }

    pub fn with_logs(mut self, logs: impl Into<String>) -> Self {
        self.logs = Some(logs.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_files_modified(mut self, files: Vec<String>) -> Self {
        self.files_modified = files;
        self
    }

    pub fn with_artifacts_path(mut self, path: impl Into<String>) -> Self {
        self.artifacts_path = Some(path.into());
        self
    }
}
