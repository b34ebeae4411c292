//! Background poll scheduler
//!
//! A rate-limited check loop rather than a fixed timer: once the poll
//! interval has passed since the last cycle it issues `QMOD`, `QPIGS` and
//! `QPIRI` through the device worker, merges the replies into a fresh
//! snapshot, fills the derived fields and publishes the result in one swap.
//! A cycle the device did not answer keeps the previous readings.
//! Otherwise it sleeps a one second quantum and checks again.

use crate::config::Config;
use crate::device::DeviceHandle;
use crate::logging::{StructuredLogger, get_logger};
use crate::protocol::Command;
use crate::snapshot::{Snapshot, SnapshotPublisher};
use chrono::Utc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

pub mod derive;

pub use derive::{CurrentBias, round2, watt_hours};

/// Sleep between two due-checks while idle
pub const CHECK_QUANTUM: Duration = Duration::from_secs(1);

/// What the scheduler needs from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    pub interval: Duration,
    pub bias: CurrentBias,
    pub measurement: String,
    pub check_quantum: Duration,
}

impl From<&Config> for PollSettings {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            bias: CurrentBias {
                charge: config.charge_current_bias,
                discharge: config.discharge_current_bias,
            },
            measurement: config.measurement.clone(),
            check_quantum: CHECK_QUANTUM,
        }
    }
}

/// Sole writer of the snapshot cache
pub struct PollScheduler {
    device: DeviceHandle,
    publisher: SnapshotPublisher,
    settings: PollSettings,
    last_update: Option<Instant>,
    poll_count: u64,
    logger: StructuredLogger,
}

impl PollScheduler {
    pub fn new(device: DeviceHandle, publisher: SnapshotPublisher, settings: PollSettings) -> Self {
        Self {
            device,
            publisher,
            settings,
            last_update: None,
            poll_count: 0,
            logger: get_logger("poller"),
        }
    }

    /// A cycle is due when none has run yet or the interval has elapsed
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_update {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.settings.interval,
        }
    }

    /// Run one full cycle and publish its outcome.
    ///
    /// A reply that does not parse leaves its fields at zero and is listed
    /// under the snapshot's parse errors; the fresh record is published.
    /// A command without a usable reply keeps the last good record, only
    /// its device errors and poll count change and `updated_at` stays put.
    /// Either way the next cycle is one interval away.
    pub async fn poll_once(&mut self) {
        let started = Instant::now();
        self.logger.debug("Starting poll cycle");

        let mut next = Snapshot::default();
        let mut device_errors = Vec::new();
        for command in &Command::POLL_SEQUENCE {
            let logger = self.logger.for_command(command.wire_text());
            match self.device.execute(command.clone()).await {
                Ok(reply) => {
                    if let Err(e) = next.apply(command, &reply.payload) {
                        logger.warn(&format!("Reply did not parse: {}", e));
                        next.parse_errors.push(e.to_string());
                    }
                }
                Err(e) => {
                    logger.warn(&format!("Command failed: {}", e));
                    device_errors.push(e.to_string());
                }
            }
        }

        self.poll_count = self.poll_count.saturating_add(1);
        self.last_update = Some(Instant::now());

        if !device_errors.is_empty() {
            let mut kept = Snapshot::clone(&self.publisher.current());
            kept.poll_count = self.poll_count;
            kept.device_errors = device_errors;
            self.logger.warn(&format!(
                "Status update failed for {} command(s), keeping previous readings",
                kept.device_errors.len()
            ));
            self.publisher.publish(kept);
            return;
        }

        derive::derive(&mut next, self.settings.interval, self.settings.bias);
        next.measurement = self.settings.measurement.clone();
        next.poll_count = self.poll_count;
        next.updated_at = Some(Utc::now());

        let parse_failures = next.parse_errors.len();
        self.publisher.publish(next);

        if parse_failures == 0 {
            self.logger.debug(&format!(
                "Status update complete in {} ms",
                started.elapsed().as_millis()
            ));
        } else {
            self.logger.warn(&format!(
                "Status update published with {} unparsed reply(s)",
                parse_failures
            ));
        }
    }

    /// Poll until `shutdown` turns true or its sender is dropped
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.logger.info(&format!(
            "Poller started, interval {}s",
            self.settings.interval.as_secs_f64()
        ));

        loop {
            if *shutdown.borrow() {
                break;
            }

            if self.is_due(Instant::now()) {
                tokio::select! {
                    () = self.poll_once() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                continue;
            }

            tokio::select! {
                () = tokio::time::sleep(self.settings.check_quantum) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.logger.info("Poller stopped");
    }
}
