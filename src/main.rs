use anyhow::Result;
use phoros::api::RestApiClient;
use phoros::clock::SystemClock;
use phoros::config::Config;
use phoros::persistence::FileRecoveryStore;
use phoros::tracker::{SessionTracker, TrackerCommand};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;

    phoros::logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Phoros session tracker {} starting up", env!("APP_VERSION"));

    let api = Arc::new(RestApiClient::new(&config.api)?);
    let store = Box::new(FileRecoveryStore::new(&config.persistence.state_file));
    let clock = Arc::new(SystemClock);

    let mut tracker = SessionTracker::new(api, clock, store, &config);
    tracker
        .boot()
        .await
        .map_err(|e| anyhow::anyhow!("Tracker boot failed: {}", e))?;
    info!("Tracker booted in state '{}'", tracker.state_name());

    // The command side belongs to the embedding portal process; the headless
    // binary only polls and recovers.
    let (_command_tx, command_rx) = mpsc::unbounded_channel::<TrackerCommand>();
    let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel::<()>();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    match tracker.run(command_rx, shutdown_rx).await {
        Ok(()) => {
            info!("Tracker shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Tracker failed: {}", e);
            Err(anyhow::anyhow!("Tracker error: {}", e))
        }
    }
}
