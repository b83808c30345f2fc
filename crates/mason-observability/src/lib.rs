use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// The single process kind Mason ships today. Kept as an enum (rather than
/// a bare string) so a future split (e.g. a separate admin CLI) slots in
/// without changing the logging call sites.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Daemon,
}

impl ProcessKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessKind::Daemon => "daemon",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggingInitInfo {
    pub process: String,
    pub logs_dir: String,
    pub prefix: String,
    pub retention_days: u64,
    pub initialized_at: DateTime<Utc>,
}

/// One of Mason's stable, named structured log events — `task_exhausted`,
/// `no_provider_available`, `provider_failure_failover`, `task_failed`,
/// `story_decomposed`, `provider_initialized`, `high_load_local_preferred`,
/// and friends.
#[derive(Debug, Clone, Serialize)]
pub struct MasonEvent<'a> {
    pub event: &'a str,
    pub task_id: Option<&'a str>,
    pub story_id: Option<&'a str>,
    pub provider: Option<&'a str>,
    pub attempt: Option<u32>,
    pub detail: Option<&'a str>,
}

impl<'a> MasonEvent<'a> {
    pub fn named(event: &'a str) -> Self {
        Self {
            event,
            task_id: None,
            story_id: None,
            provider: None,
            attempt: None,
            detail: None,
        }
    }

    pub fn task(mut self, task_id: &'a str) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn story(mut self, story_id: &'a str) -> Self {
        self.story_id = Some(story_id);
        self
    }

    pub fn provider(mut self, provider: &'a str) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn detail(mut self, detail: &'a str) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Emits one structured event under the `mason.obs` target at the given
/// level.
pub fn emit_event(level: Level, event: MasonEvent<'_>) {
    macro_rules! log_at {
        ($macro:ident) => {
            tracing::$macro!(
                target: "mason.obs",
                event = event.event,
                task_id = event.task_id.unwrap_or(""),
                story_id = event.story_id.unwrap_or(""),
                provider = event.provider.unwrap_or(""),
                attempt = event.attempt.unwrap_or(0),
                detail = event.detail.unwrap_or(""),
                "mason_event"
            )
        };
    }

    match level {
        Level::ERROR => log_at!(error),
        Level::WARN => log_at!(warn),
        Level::DEBUG => log_at!(debug),
        Level::TRACE => log_at!(trace),
        Level::INFO => log_at!(info),
    }
}

/// Initializes a JSON file layer (daily-rotated) plus a compact console
/// layer, filtered by `RUST_LOG`/`EnvFilter` with an `info` default.
pub fn init_process_logging(
    process: ProcessKind,
    logs_dir: &Path,
    retention_days: u64,
) -> anyhow::Result<(WorkerGuard, LoggingInitInfo)> {
    fs::create_dir_all(logs_dir)?;
    cleanup_old_jsonl(logs_dir, process.as_str(), retention_days)?;

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix(format!("mason.{}", process.as_str()))
        .filename_suffix("jsonl")
        .build(logs_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_current_span(false)
        .with_span_list(false);

    let console_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_ansi(true);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    let info = LoggingInitInfo {
        process: process.as_str().to_string(),
        logs_dir: logs_dir.display().to_string(),
        prefix: format!("mason.{}", process.as_str()),
        retention_days,
        initialized_at: Utc::now(),
    };

    Ok((guard, info))
}

fn cleanup_old_jsonl(logs_dir: &Path, process: &str, retention_days: u64) -> anyhow::Result<()> {
    let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
    let prefix = format!("mason.{}.", process);

    for entry in fs::read_dir(logs_dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if !name.starts_with(&prefix) || !name.ends_with(".jsonl") {
            continue;
        }

        // expected: mason.<proc>.YYYY-MM-DD.jsonl
        let date_part = name.trim_start_matches(&prefix).trim_end_matches(".jsonl");

        let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
            continue;
        };

        let Some(dt) = date.and_hms_opt(0, 0, 0) else {
            continue;
        };

        if DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc) < cutoff {
            let _ = fs::remove_file(path);
        }
    }

    Ok(())
}

pub fn canonical_logs_dir_from_root(root: &Path) -> PathBuf {
    root.join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_logs_dir_joins_logs_folder() {
        let root = PathBuf::from("/tmp/mason");
        let logs = canonical_logs_dir_from_root(&root);
        assert_eq!(logs, PathBuf::from("/tmp/mason").join("logs"));
    }

    #[test]
    fn event_builder_sets_fields() {
        let event = MasonEvent::named("task_exhausted")
            .task("abc")
            .attempt(2)
            .detail("attempts exhausted");
        assert_eq!(event.event, "task_exhausted");
        assert_eq!(event.task_id, Some("abc"));
        assert_eq!(event.attempt, Some(2));
    }
}
