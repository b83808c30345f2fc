use std::time::{Duration, Instant};

use async_trait::async_trait;
use mason_types::{ArtifactBundle, TaskPacket};
use reqwest::Client;
use serde_json::json;

use crate::provider::{build_prompt, Provider};

/// Direct-HTTP adapter for a locally hosted model server (e.g. Ollama).
/// Grounded on the original `OllamaProvider`: no rate limits, fully local
/// execution, a single non-streaming completion request per attempt.
pub struct LocalHttpAdapter {
    name: String,
    model: String,
    host: String,
    timeout: Duration,
    client: Client,
}

impl LocalHttpAdapter {
    pub fn new(name: impl Into<String>, model: impl Into<String>, host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            host: host.into(),
            timeout,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Provider for LocalHttpAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, packet: &TaskPacket) -> ArtifactBundle {
        let task_id = packet.identity.task_id;
        let prompt = build_prompt(packet);
        let url = format!("{}/api/generate", self.host.trim_end_matches('/'));
        let started = Instant::now();

        let request = self.client.post(url).json(&json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        }));

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                return ArtifactBundle::failure(task_id, &self.name, err.to_string())
                    .with_duration(started.elapsed().as_millis() as u64)
            }
            Err(_) => {
                return ArtifactBundle::failure(
                    task_id,
                    &self.name,
                    format!("timeout after {}s", self.timeout.as_secs()),
                )
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return ArtifactBundle::failure(
                task_id,
                &self.name,
                format!("request failed with status {status}: {body}"),
            )
            .with_duration(duration_ms);
        }

        let value: serde_json::Value = match response.json().await {
            Ok(value) => value,
            Err(err) => {
                return ArtifactBundle::failure(task_id, &self.name, err.to_string())
                    .with_duration(duration_ms)
            }
        };

        let text = value
            .get("response")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        ArtifactBundle::success(task_id, &self.name)
            .with_logs(text)
            .with_duration(duration_ms)
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.host.trim_end_matches('/'));
        self.client
            .get(url)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn detect_rate_limit(&self, _text: &str) -> bool {
        false
    }
}
