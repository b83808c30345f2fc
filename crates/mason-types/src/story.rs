use serde::{Deserialize, Serialize};

/// A unit of backlog work, as returned by the DevBacklog API.
///
/// Immutable within the daemon; consumed once by the task compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub acceptance_criteria: String,
    #[serde(default)]
    pub epic_id: Option<i64>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub est_points: Option<i32>,
}

/// Wrapper shape some DevBacklog deployments use for list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StoryListEnvelope {
    pub data: Vec<Story>,
}

/// Either a bare JSON array of stories, or `{"data": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoryListResponse {
    Wrapped(StoryListEnvelope),
    Bare(Vec<Story>),
}

impl StoryListResponse {
    pub fn into_stories(self) -> Vec<Story> {
        match self {
            StoryListResponse::Wrapped(envelope) => envelope.data,
            StoryListResponse::Bare(stories) => stories,
        }
    }
}
