//! Game server entry point.
use std::path::Path;

use anyhow::Result;
use runtime::{Runtime, Topic};
use server_bootstrap::{ServerBuilder, ServerConfig};
use tokio::sync::broadcast::error::RecvError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = ServerConfig::from_env()?;
    let _guard = setup_logging(&config.log_dir())?;

    let setup = ServerBuilder::new(config).build()?;
    let runtime = setup.runtime;

    for (name, description) in runtime.extensions().catalogue().describe() {
        tracing::info!(extension = name, description, "Extension available");
    }
    if setup.config.instances.is_empty() {
        tracing::warn!("No instances configured; set MAFIA_INSTANCES to run schedulers");
    }

    let observer = tokio::spawn(log_events(runtime.clone()));
    let schedulers: Vec<_> = setup
        .config
        .instances
        .iter()
        .map(|instance| {
            tracing::info!(instance = %instance.id, "Starting schedulers");
            runtime.spawn_schedulers(instance.id)
        })
        .collect();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    for handle in schedulers {
        handle.shutdown().await;
    }
    observer.abort();

    tracing::info!("Server stopped");
    Ok(())
}

/// Setup logging to both stderr and a log file under `log_dir`.
fn setup_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "server.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!("Log directory: {}", log_dir.display());

    Ok(guard)
}

/// Mirrors phase and scheduler events into the log.
async fn log_events(runtime: Runtime) {
    let mut phases = runtime.events().subscribe(Topic::Phase);
    let mut schedules = runtime.events().subscribe(Topic::Schedule);

    loop {
        let received = tokio::select! {
            event = phases.recv() => event,
            event = schedules.recv() => event,
        };

        match received {
            Ok(event) => tracing::debug!(target: "server::events", ?event, "Event"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(target: "server::events", skipped, "Event observer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
