use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use ventpad::api::RestApi;
use ventpad::config::{load_config, Config, ConfigError};
use ventpad::storage::{self, SystemStamper};
use ventpad::{logging, VentpadError};

const CONFIG_ENV: &str = "VENTPAD_CONFIG";

#[tokio::main]
async fn main() -> Result<(), VentpadError> {
    let config_path = env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.yaml"));

    let (config, missing_config) = match load_config(&config_path) {
        Ok(config) => (config, false),
        Err(ConfigError::NotFound(_)) => (Config::default(), true),
        Err(e) => return Err(e.into()),
    };

    logging::init(&config.logging);
    if missing_config {
        warn!(path = %config_path.display(), "config file not found, using defaults");
    }

    let store = storage::open(&config.storage)?;
    let export_offset = config.export.utc_offset()?;
    let api = RestApi::new(store, Arc::new(SystemStamper), config.presets.clone(), export_offset);

    let host: IpAddr = config
        .api
        .host
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("api.host is not an IP address: {}", config.api.host)))?;
    let addr = SocketAddr::new(host, config.api.port);

    // Create a channel for shutdown signal
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let (bound, server) = warp::serve(api.routes()).bind_with_graceful_shutdown(addr, async move {
        shutdown_rx.await.ok();
        info!("shutting down server");
    });
    info!(%bound, "ventpad listening");

    let server_handle = tokio::spawn(server);

    signal::ctrl_c().await?;
    info!("Ctrl+C received, starting graceful shutdown");
    shutdown_tx.send(()).ok();

    if let Err(e) = server_handle.await {
        error!(error = %e, "server task failed");
    }

    info!("server shutdown complete");
    Ok(())
}
