use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use mason_types::{ArtifactBundle, TaskPacket};
use tokio::process::Command;

use crate::provider::{build_prompt, matches_any_pattern, Provider};

/// Executes a task by shelling out to a configured CLI executable in an
/// isolated per-task working directory. Grounded on the original
/// `ClaudeCLIProvider`/`GooseProvider` adapters, which differ only in
/// executable name, default model, and timeout — generalized here into
/// one configurable adapter.
pub struct CliAdapter {
    name: String,
    executable: String,
    extra_args: Vec<String>,
    work_root: PathBuf,
    timeout: Duration,
    rate_limit_patterns: Vec<String>,
}

impl CliAdapter {
    pub fn new(
        name: impl Into<String>,
        executable: impl Into<String>,
        extra_args: Vec<String>,
        work_root: PathBuf,
        timeout: Duration,
        rate_limit_patterns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            extra_args,
            work_root,
            timeout,
            rate_limit_patterns,
        }
    }

    fn work_dir(&self, task_id: &str) -> PathBuf {
        self.work_root.join(&self.name).join(task_id)
    }
}

#[async_trait]
impl Provider for CliAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, packet: &TaskPacket) -> ArtifactBundle {
        let task_id = packet.identity.task_id;
        let work_dir = self.work_dir(&task_id.to_string());
        if let Err(err) = tokio::fs::create_dir_all(&work_dir).await {
            return ArtifactBundle::failure(
                task_id,
                &self.name,
                format!("failed to create work dir: {err}"),
            );
        }

        let prompt = build_prompt(packet);
        let mut command = Command::new(&self.executable);
        command.args(&self.extra_args).arg(&prompt).current_dir(&work_dir);

        let started = std::time::Instant::now();
        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return ArtifactBundle::failure(task_id, &self.name, format!("spawn failed: {err}"))
            }
            Err(_) => {
                return ArtifactBundle::failure(
                    task_id,
                    &self.name,
                    format!("timeout after {}s", self.timeout.as_secs()),
                )
                .with_duration(self.timeout.as_millis() as u64)
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let combined = format!("{stdout}{stderr}");

        if self.detect_rate_limit(&combined) {
            return ArtifactBundle::provider_failure(task_id, &self.name, "rate limited", true)
                .with_logs(combined)
                .with_duration(duration_ms);
        }

        if output.status.success() {
            let files_modified = detect_modified_files(&work_dir).await;
            ArtifactBundle::success(task_id, &self.name)
                .with_files_modified(files_modified)
                .with_logs(stdout)
                .with_duration(duration_ms)
                .with_artifacts_path(work_dir.display().to_string())
        } else {
            ArtifactBundle::failure(task_id, &self.name, stderr)
                .with_logs(combined)
                .with_duration(duration_ms)
        }
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.executable)
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn detect_rate_limit(&self, text: &str) -> bool {
        matches_any_pattern(text, &self.rate_limit_patterns)
    }
}

async fn detect_modified_files(work_dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut stack = vec![work_dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_dotfile = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(false);
            if is_dotfile {
                continue;
            }
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if let Ok(relative) = path.strip_prefix(work_dir) {
                files.push(relative.display().to_string());
            }
        }
    }
    files
}
