use anyhow::Result;
use helios::bridge;
use helios::config::Config;
use helios::logging::{get_logger, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load configuration from {}: {}", path, e))?,
        None => Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?,
    };
    config.validate()?;

    init_logging(&config.logging)?;
    let logger = get_logger("main");
    logger.info(&format!(
        "Helios {} starting up, polling every {}s",
        env!("APP_VERSION"),
        config.poll_interval_secs
    ));

    let running = start_bridge(&config)?;

    let signal_logger = logger.clone();
    let trigger = running.trigger();
    let stop = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            signal_logger.error(&format!("Failed to listen for Ctrl+C: {}", e));
        }
        signal_logger.info("Ctrl+C pressed, shutting down");
        trigger.fire();
    };

    #[cfg(feature = "web")]
    {
        let state = helios::web::AppState {
            snapshots: running.snapshots.clone(),
            device: running.device.clone(),
            shutdown: running.shutdown_signal(),
        };
        if let Err(e) = helios::web::serve(state, &config.web.host, config.web.port, stop).await {
            logger.error(&format!("Web server error: {}", e));
        }
    }
    #[cfg(not(feature = "web"))]
    stop.await;

    running.shutdown().await?;
    logger.info("Shutdown complete");
    Ok(())
}

#[cfg(feature = "usb")]
fn start_bridge(config: &Config) -> helios::Result<bridge::RunningBridge> {
    let connector = helios::transport::hid::HidConnector::new(&config.device);
    bridge::start(config, connector)
}

#[cfg(not(feature = "usb"))]
fn start_bridge(_config: &Config) -> helios::Result<bridge::RunningBridge> {
    Err(helios::HeliosError::config(
        "built without the `usb` feature; no device transport available",
    ))
}
