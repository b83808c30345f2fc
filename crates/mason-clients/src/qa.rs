use std::time::Duration;

use async_trait::async_trait;
use mason_core::{MasonError, QaClient};
use mason_types::{ArtifactBundle, ProviderStatsMap, QueueStats, RetryTask, StartRunResponse, TaskPacket};
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed `QaClient`. Every fallible call returns
/// `Result<T, MasonError>` except `complete_run`, which swallows
/// transport/status errors and returns a plain `bool`, matching the
/// original's try/except swallowing for that one endpoint (§6).
pub struct HttpQaClient {
    base_url: String,
    http: Client,
}

impl HttpQaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::builder()
                .timeout(CLIENT_TIMEOUT)
                .build()
                .expect("failed to build qa http client"),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl QaClient for HttpQaClient {
    async fn queue_stats(&self) -> Result<QueueStats, MasonError> {
        let response = self
            .http
            .get(self.url("/queue/stats"))
            .send()
            .await
            .map_err(|e| MasonError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MasonError::Http(format!("GET /queue/stats returned {}", response.status())));
        }
        response.json().await.map_err(|e| MasonError::Http(e.to_string()))
    }

    async fn provider_stats(&self) -> Result<ProviderStatsMap, MasonError> {
        let response = self
            .http
            .get(self.url("/queue/provider-stats"))
            .send()
            .await
            .map_err(|e| MasonError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MasonError::Http(format!(
                "GET /queue/provider-stats returned {}",
                response.status()
            )));
        }
        response.json().await.map_err(|e| MasonError::Http(e.to_string()))
    }

    async fn retry_queue(&self) -> Result<Vec<RetryTask>, MasonError> {
        let response = self
            .http
            .get(self.url("/tasks/retry-queue"))
            .send()
            .await
            .map_err(|e| MasonError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MasonError::Http(format!(
                "GET /tasks/retry-queue returned {}",
                response.status()
            )));
        }
        response.json().await.map_err(|e| MasonError::Http(e.to_string()))
    }

    async fn submit_task(&self, packet: &TaskPacket) -> Result<(), MasonError> {
        let response = self
            .http
            .post(self.url("/tasks"))
            .json(packet)
            .send()
            .await
            .map_err(|e| MasonError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MasonError::Http(format!("POST /tasks returned {}", response.status())));
        }
        Ok(())
    }

    async fn start_run(
        &self,
        task_id: Uuid,
        provider_name: &str,
        confidence_weight: f64,
    ) -> Result<String, MasonError> {
        let response = self
            .http
            .post(self.url(&format!("/tasks/{task_id}/start-run")))
            .json(&json!({
                "provider_name": provider_name,
                "confidence_weight": confidence_weight,
            }))
            .send()
            .await
            .map_err(|e| MasonError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(MasonError::Http(format!(
                "POST /tasks/{task_id}/start-run returned {}",
                response.status()
            )));
        }
        let parsed: StartRunResponse =
            response.json().await.map_err(|e| MasonError::Http(e.to_string()))?;
        Ok(parsed.run_id)
    }

    async fn complete_run(&self, task_id: Uuid, run_id: &str, bundle: &ArtifactBundle) -> bool {
        let body = json!({
            "run_id": run_id,
            "execution_status": bundle.execution_status,
            "files_modified": bundle.files_modified,
            "diff_summary": bundle.diff_summary,
            "logs": bundle.logs,
            "duration_ms": bundle.duration_ms,
            "artifacts_path": bundle.artifacts_path,
        });

        match self.http.post(self.url(&format!("/tasks/{task_id}/complete-run"))).json(&body).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::warn!(task_id = %task_id, run_id, error = %err, "complete_run_request_failed");
                false
            }
        }
    }
}
