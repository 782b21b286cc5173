//! Run the noisemaker host until SIGINT/SIGTERM, then stop it gracefully.

use std::time::Duration;

use envconfig::Envconfig;
use eyre::Result;
use instruments::InstrumentRegistry;
use noisemaker::config::Config;
use noisemaker::disk::DiskMonitor;
use noisemaker::host::Host;
use noisemaker::report;
use noisemaker::ticker::TickerWorker;
use tokio::signal::unix::SignalKind;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::init_from_env().expect("failed to load configuration from env");
    info!(
        tick_interval_secs = config.tick_interval_secs,
        shutdown_grace_secs = config.shutdown_grace_secs,
        "starting noisemaker"
    );

    let registry = InstrumentRegistry::new();

    let mut host = Host::new("noisemaker", Duration::from_secs(config.shutdown_grace_secs));
    host.add_worker(Box::new(TickerWorker::new(
        &registry,
        Duration::from_secs(config.tick_interval_secs),
    )?));
    host.add_worker(Box::new(DiskMonitor::new(&registry)?));

    let running = host.start();

    let reporter = tokio::spawn(report::run(
        registry.clone(),
        running.shutdown_token(),
        Duration::from_secs(config.snapshot_interval_secs),
    ));

    wait_for_shutdown_signal().await;

    running.stop().await?;
    if let Err(e) = reporter.await {
        error!(error = %e, "snapshot reporter task failed");
    }

    info!("exiting");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())
        .expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }
}
