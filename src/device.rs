//! Single-owner device worker
//!
//! The inverter handles one exchange at a time, so exactly one thread owns
//! the [`Transport`]. The poller and every raw-query caller hand it
//! [`DeviceRequest`]s over a bounded queue and await the reply; requests are
//! served strictly in arrival order and one finishes before the next starts.

use crate::config::ProtocolConfig;
use crate::error::{HeliosError, Result};
use crate::logging::get_logger;
use crate::protocol::Command;
use crate::transport::{DeviceConnector, Exchange, Timing, Transport};
use std::thread;
use tokio::sync::{mpsc, oneshot};

pub mod retry;

pub use retry::RetryPolicy;

/// A complete reply to one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Field text between `(` and the checksum; empty for an unframed raw reply
    pub payload: String,
    pub total_read: usize,
    pub attempts: u32,
}

/// A command waiting for the device
#[derive(Debug)]
pub struct DeviceRequest {
    pub command: Command,
    pub reply: oneshot::Sender<Result<Reply>>,
}

/// Cloneable handle for submitting commands to the device worker
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    tx: mpsc::Sender<DeviceRequest>,
}

impl DeviceHandle {
    /// Queue `command` and wait for its reply
    pub async fn execute(&self, command: Command) -> Result<Reply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(DeviceRequest {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| HeliosError::channel_closed("device worker has stopped"))?;
        reply_rx
            .await
            .map_err(|_| HeliosError::channel_closed("device worker dropped the request"))?
    }

    /// Send caller-supplied command text and return the unparsed payload
    pub async fn raw_query(&self, text: &str) -> Result<String> {
        let command = Command::from_text(text)?;
        Ok(self.execute(command).await?.payload)
    }
}

/// Start the worker thread for a physical device
pub fn spawn_device_worker<C: DeviceConnector>(
    connector: C,
    protocol: &ProtocolConfig,
    trace_frames: bool,
) -> Result<(DeviceHandle, thread::JoinHandle<()>)> {
    get_logger("device").info(&format!(
        "Starting device worker for {}",
        connector.describe()
    ));
    let transport = Transport::new(connector, Timing::from(protocol), trace_frames);
    spawn_worker(
        transport,
        RetryPolicy::from(protocol),
        protocol.queue_depth,
    )
}

/// Start the worker thread over any [`Exchange`].
///
/// The thread exits once every [`DeviceHandle`] has been dropped and the
/// queue is drained.
pub fn spawn_worker<E>(
    mut exchange: E,
    policy: RetryPolicy,
    queue_depth: usize,
) -> Result<(DeviceHandle, thread::JoinHandle<()>)>
where
    E: Exchange + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<DeviceRequest>(queue_depth.max(1));
    let worker = thread::Builder::new()
        .name("helios-device".to_string())
        .spawn(move || {
            let logger = get_logger("device");
            while let Some(request) = rx.blocking_recv() {
                let result = policy.run(&mut exchange, &request.command);
                if let Err(e) = &result {
                    logger
                        .for_command(request.command.wire_text())
                        .warn(&format!("Command failed: {}", e));
                }
                // Requester may have given up; nothing to do then
                let _ = request.reply.send(result);
            }
            logger.info("Device worker stopped");
        })?;
    Ok((DeviceHandle { tx }, worker))
}
