use async_trait::async_trait;
use mason_types::{ArtifactBundle, TaskPacket};

/// The provider capability set every adapter implements. Matches the
/// original Python `BaseProvider` contract: `generate` never raises —
/// internal errors become an `ArtifactBundle` with `execution_status`
/// set appropriately rather than an `Err`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The provider's registry name (distinct from the adapter key — two
    /// providers can share an adapter implementation under different
    /// names/configs).
    fn name(&self) -> &str;

    /// Executes the task and returns the outcome. Never returns an error;
    /// failures are represented as `ArtifactBundle { execution_status: Failure | ProviderFailure, .. }`.
    async fn generate(&self, packet: &TaskPacket) -> ArtifactBundle;

    /// Cheap liveness probe, used by operational tooling — not consulted
    /// by the selection algorithm itself (availability there is tracked
    /// via `ProviderState`, updated from `generate` outcomes).
    async fn is_available(&self) -> bool;

    /// Pure classifier: does this combined stdout/stderr (or exception)
    /// text look like a rate-limit signal?
    fn detect_rate_limit(&self, text: &str) -> bool;
}

/// Default substring patterns used to detect rate limiting in combined
/// stdout+stderr output, matched case-insensitively. Mirrors the original
/// `ClaudeCLIProvider.RATE_LIMIT_PATTERNS`.
pub const DEFAULT_RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "too many requests",
    "quota exceeded",
    "429",
    "overloaded",
];

/// Case-insensitive substring match against a pattern list.
pub fn matches_any_pattern(haystack: &str, patterns: &[String]) -> bool {
    let lower = haystack.to_lowercase();
    patterns.iter().any(|p| lower.contains(&p.to_lowercase()))
}

/// Builds the human-readable prompt handed to a generative backend from a
/// task packet: title, description, success criteria, style rules, and any
/// retry guidance from a previous failed attempt. Shared by adapters that
/// speak in plain-text prompts (CLI and local-HTTP).
pub fn build_prompt(packet: &TaskPacket) -> String {
    let mut lines = Vec::new();
    lines.push(format!("# Task: {}", packet.goal.title));
    lines.push(String::new());
    lines.push(packet.goal.description.clone());
    lines.push(String::new());
    lines.push("## Success Criteria".to_string());
    for criterion in &packet.goal.success_criteria {
        lines.push(format!("- {criterion}"));
    }

    if !packet.constraints.file_scope.is_empty() {
        lines.push(String::new());
        lines.push("## File Scope".to_string());
        for f in &packet.constraints.file_scope {
            lines.push(format!("- {f}"));
        }
    }

    if !packet.constraints.style_rules.is_empty() {
        lines.push(String::new());
        lines.push("## Style Rules".to_string());
        for rule in &packet.constraints.style_rules {
            lines.push(format!("- {rule}"));
        }
    }

    if !packet.inputs.retry_guidance.is_empty() {
        lines.push(String::new());
        lines.push("## Previous Attempt Feedback".to_string());
        for guidance in &packet.inputs.retry_guidance {
            lines.push(format!("- {guidance}"));
        }
    }

    lines.join("\n")
}
