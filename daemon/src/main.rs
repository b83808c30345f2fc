mod poll_loop;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mason_clients::{HttpBacklogClient, HttpQaClient};
use mason_core::{
    load_provider_definitions, load_settings, CompilerConfig, ExecutionEngine, ProviderRegistry,
    ProviderSelector, TaskCompiler,
};
use mason_observability::{
    canonical_logs_dir_from_root, emit_event, init_process_logging, MasonEvent, ProcessKind,
};
use mason_providers::build_adapters;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

use poll_loop::PollLoop;

/// Mason: pulls unassigned backlog work, decomposes it into TaskPackets,
/// dispatches each to a code-generation provider, and reports outcomes to
/// the QA service. A single optional positional argument names the
/// configuration document; omitted, the standard search locations (§6)
/// are tried in order.
#[derive(Parser, Debug)]
#[command(name = "mason-daemon")]
#[command(about = "Mason scheduling/dispatch daemon")]
struct Cli {
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (settings, settings_path) = load_settings(cli.config_path.as_deref()).await?;
    let providers_path = cli.config_path.as_ref().map(|_| {
        settings_path
            .parent()
            .map(|dir| dir.join("providers.json"))
            .unwrap_or_else(|| PathBuf::from("providers.json"))
    });
    let definitions = load_provider_definitions(providers_path.as_deref()).await?;

    let logs_dir = canonical_logs_dir_from_root(&settings.artifacts.root);
    let (_guard, logging_info) = init_process_logging(ProcessKind::Daemon, &logs_dir, 14)?;

    info!(
        config = %settings_path.display(),
        logs_dir = %logging_info.logs_dir,
        providers = definitions.len(),
        "mason starting",
    );

    let registry = Arc::new(Mutex::new(ProviderRegistry::new(
        definitions.clone(),
        settings.provider_selection.rate_limit_cooldown,
    )));

    let backlog: Arc<dyn mason_core::BacklogClient> =
        Arc::new(HttpBacklogClient::new(settings.devbacklog.api_url.clone()));
    let qa: Arc<dyn mason_core::QaClient> =
        Arc::new(HttpQaClient::new(settings.qa_service.api_url.clone()));

    let selector = Arc::new(ProviderSelector::new(
        registry,
        qa.clone(),
        settings.provider_selection.high_load_threshold,
    ));

    let adapters = build_adapters(&definitions, &settings.artifacts.root);
    for name in adapters.keys() {
        emit_event(Level::INFO, MasonEvent::named("provider_initialized").provider(name));
    }

    let engine = Arc::new(ExecutionEngine::new(selector, qa.clone(), adapters));

    let compiler = TaskCompiler::new(CompilerConfig {
        default_max_attempts: settings.decomposition.default_max_attempts,
        max_tasks_per_story: settings.decomposition.max_tasks_per_story,
    });

    let shutdown = CancellationToken::new();
    install_signal_handlers(shutdown.clone());

    let poll_loop = PollLoop::new(
        backlog,
        qa,
        compiler,
        engine,
        Duration::from_secs(settings.devbacklog.poll_interval_seconds),
        shutdown,
    );

    poll_loop.run().await;

    info!("mason shut down cleanly");
    Ok(())
}

/// SIGTERM and SIGINT both request graceful shutdown (§5/§6): flip the
/// `CancellationToken`, which the poll loop observes at the top of each
/// cycle, between tasks/stories/packets, and on each tick of its
/// inter-cycle sleep.
fn install_signal_handlers(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(err) => {
                    tracing::error!(error = %err, "failed to install SIGTERM handler");
                    return;
                }
            };
        let mut sigint =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()) {
                Ok(signal) => signal,
                Err(err) => {
                    tracing::error!(error = %err, "failed to install SIGINT handler");
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
        shutdown.cancel();
    });
}
