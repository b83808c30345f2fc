use std::time::Duration;

use async_trait::async_trait;
use mason_core::{BacklogClient, MasonError};
use mason_types::{Story, StoryListResponse};
use reqwest::Client;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed `BacklogClient`, owning a single `Client` instance for
/// the daemon's lifetime (§6), matching the original's
/// `httpx.Client(timeout=30.0)` per-client pattern.
pub struct HttpBacklogClient {
    base_url: String,
    http: Client,
}

impl HttpBacklogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::builder()
                .timeout(CLIENT_TIMEOUT)
                .build()
                .expect("failed to build backlog http client"),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl BacklogClient for HttpBacklogClient {
    async fn ready_stories(&self) -> Result<Vec<Story>, MasonError> {
        let response = self
            .http
            .get(self.url("/stories?status=ready_for_dev"))
            .send()
            .await
            .map_err(|e| MasonError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MasonError::Http(format!("GET /stories returned {}", response.status())));
        }

        // The list endpoint is either a bare array or `{"data": [...]}`;
        // `StoryListResponse`'s untagged enum handles both shapes (§6).
        let parsed: StoryListResponse =
            response.json().await.map_err(|e| MasonError::Http(e.to_string()))?;
        Ok(parsed.into_stories())
    }

    async fn get_story(&self, story_id: i64) -> Result<Story, MasonError> {
        let response = self
            .http
            .get(self.url(&format!("/stories/{story_id}")))
            .send()
            .await
            .map_err(|e| MasonError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MasonError::Http(format!(
                "GET /stories/{story_id} returned {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| MasonError::Http(e.to_string()))
    }

    async fn mark_in_progress(&self, story_id: i64) -> bool {
        match self.http.post(self.url(&format!("/stories/{story_id}/in-progress"))).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::warn!(story_id, error = %err, "mark_in_progress_failed");
                false
            }
        }
    }
}
