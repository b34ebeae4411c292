//! Wiring of the device worker, the poller and the snapshot cache

use crate::config::Config;
use crate::device::{DeviceHandle, spawn_device_worker};
use crate::error::{HeliosError, Result};
use crate::logging::get_logger;
use crate::poller::{PollScheduler, PollSettings};
use crate::snapshot::SnapshotCache;
use crate::transport::DeviceConnector;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Extra time granted to an in-flight exchange when stopping
const WORKER_JOIN_GRACE: Duration = Duration::from_secs(1);

/// Raises the shutdown flag ahead of [`RunningBridge::shutdown`], e.g. from
/// a signal handler, so streaming clients let go before the server drains.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownTrigger {
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }
}

/// A started bridge. Must be created inside a Tokio runtime.
pub struct RunningBridge {
    pub device: DeviceHandle,
    pub snapshots: SnapshotCache,
    shutdown_tx: Arc<watch::Sender<bool>>,
    poller: JoinHandle<()>,
    worker: thread::JoinHandle<()>,
    join_timeout: Duration,
}

/// Spawn the device worker and the poller for `connector`
pub fn start<C: DeviceConnector>(config: &Config, connector: C) -> Result<RunningBridge> {
    let (device, worker) =
        spawn_device_worker(connector, &config.protocol, config.logging.trace_frames)?;
    let (publisher, snapshots) = SnapshotCache::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = PollScheduler::new(device.clone(), publisher, PollSettings::from(config));
    let poller = tokio::spawn(scheduler.run(shutdown_rx));

    Ok(RunningBridge {
        device,
        snapshots,
        shutdown_tx: Arc::new(shutdown_tx),
        poller,
        worker,
        join_timeout: config.protocol.read_deadline() + WORKER_JOIN_GRACE,
    })
}

impl RunningBridge {
    /// Receiver that turns true once shutdown has begun
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Stop the poller, release the device handle and wait briefly for the
    /// worker thread. A worker still busy after the grace period is left to
    /// finish on its own.
    pub async fn shutdown(self) -> Result<()> {
        let logger = get_logger("bridge");
        self.shutdown_tx.send_replace(true);

        self.poller
            .await
            .map_err(|e| HeliosError::generic(format!("Poller task failed: {}", e)))?;
        drop(self.device);

        let worker = self.worker;
        let joined = tokio::time::timeout(
            self.join_timeout,
            tokio::task::spawn_blocking(move || worker.join()),
        )
        .await;
        match joined {
            Ok(Ok(Ok(()))) => logger.info("Bridge stopped"),
            Ok(_) => logger.error("Device worker panicked"),
            Err(_) => logger.warn("Device worker still busy, not waiting any longer"),
        }
        Ok(())
    }
}
