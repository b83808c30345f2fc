use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Formats `now` the way the compiler stamps `metadata.created_at`:
/// millisecond-precision ISO-8601 with a trailing literal `Z`.
pub fn format_created_at(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Complexity hint carried through to a provider so it can size its effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityHint {
    Low,
    Medium,
    High,
}

impl Default for ComplexityHint {
    fn default() -> Self {
        ComplexityHint::Medium
    }
}

impl ComplexityHint {
    /// Matches the original compiler's `est_points` thresholds exactly.
    pub fn from_est_points(est_points: Option<i32>) -> Self {
        match est_points {
            None => ComplexityHint::Medium,
            Some(points) if points <= 2 => ComplexityHint::Low,
            Some(points) if points <= 5 => ComplexityHint::Medium,
            Some(_) => ComplexityHint::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIdentity {
    pub task_id: Uuid,
    pub story_id: i64,
    #[serde(default)]
    pub epic_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGoal {
    pub title: String,
    pub description: String,
    pub success_criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskConstraints {
    #[serde(default)]
    pub file_scope: Vec<String>,
    #[serde(default)]
    pub style_rules: Vec<String>,
    #[serde(default)]
    pub forbidden: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskInputs {
    #[serde(default)]
    pub context_files: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub retry_guidance: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskExecution {
    pub max_attempts: u32,
    pub current_attempt: u32,
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaskProviderContext {
    #[serde(default)]
    pub preferred_model: Option<String>,
    #[serde(default)]
    pub complexity_hint: ComplexityHint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// ISO-8601, millisecond precision, trailing literal `Z`. Kept as a
    /// `String` rather than `DateTime<Utc>` so the wire representation is
    /// pinned exactly rather than left to chrono's default serde format.
    pub created_at: String,
    pub source_domain: String,
    pub priority: i32,
    #[serde(default)]
    pub est_points: Option<i32>,
}

/// TaskPacket v1 — the normalized unit of work dispatched to providers.
///
/// Invariant: `0 <= execution.current_attempt <= execution.max_attempts`.
/// `identity.task_id` is unique across a daemon lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPacket {
    pub identity: TaskIdentity,
    pub goal: TaskGoal,
    #[serde(default)]
    pub constraints: TaskConstraints,
    #[serde(default)]
    pub inputs: TaskInputs,
    pub execution: TaskExecution,
    #[serde(default)]
    pub provider_context: TaskProviderContext,
    pub metadata: TaskMetadata,
}

impl TaskPacket {
    /// Returns a copy with retry guidance applied and the attempt counter
    /// set to `attempt`. The receiver is left unmodified.
    pub fn enriched_for_retry(&self, guidance: Vec<String>, attempt: u32) -> TaskPacket {
        let mut enriched = self.clone();
        enriched.inputs.retry_guidance = guidance;
        enriched.execution.current_attempt = attempt;
        enriched
    }
}
