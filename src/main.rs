use std::fs::OpenOptions;
use std::path::Path;

use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use xds_sync::async_task::spawn_task;
use xds_sync::ControlPlaneBuilder;
use xds_sync::Error;
use xds_sync::Result;
use xds_sync::XdsSyncConfig;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = XdsSyncConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.runtime.instance_id, &settings.runtime.log_dir)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    let control_plane = ControlPlaneBuilder::new(settings, graceful_rx.clone())
        .build()
        .start_metrics_server(graceful_rx.clone())
        .ready()?;

    info!("Control plane started. Waiting for shutdown signal...");
    spawn_task("graceful-shutdown", move || graceful_shutdown(graceful_tx), None);

    if let Err(e) = control_plane.run().await {
        error!("control plane stops: {:?}", e);
    }

    info!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::SignalSenderClosed(format!("Failed to send shutdown signal: {}", e))
    })?;

    info!("Shutdown signal sent");
    Ok(())
}

fn init_observability(
    instance_id: &str,
    log_dir: &Path,
) -> Result<WorkerGuard> {
    let dir = log_dir.join(instance_id);
    std::fs::create_dir_all(&dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("xds.log"))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
