//! Resend policy for short or unframed replies

use super::Reply;
use crate::config::ProtocolConfig;
use crate::error::{HeliosError, Result};
use crate::logging::get_logger;
use crate::protocol::{Command, build_frames};
use crate::transport::Exchange;
use std::thread;
use std::time::Duration;

/// How often, and how patiently, a command is resent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    pub max_attempts: u32,
}

impl From<&ProtocolConfig> for RetryPolicy {
    fn from(config: &ProtocolConfig) -> Self {
        Self {
            backoff: config.retry_backoff(),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ProtocolConfig::default())
    }
}

impl RetryPolicy {
    /// Send `command` until the reply reaches the command's byte threshold
    /// and carries a framed payload.
    ///
    /// Commands without a threshold get a single attempt whose failure is
    /// returned as is. For the others an open, write or read failure counts
    /// as a zero-byte reply, and running out of attempts yields
    /// [`HeliosError::DeviceUnreachable`].
    pub fn run<E>(&self, exchange: &mut E, command: &Command) -> Result<Reply>
    where
        E: Exchange + ?Sized,
    {
        let logger = get_logger("retry").for_command(command.wire_text());
        let frames = build_frames(command.wire_text());

        if !command.is_retried() {
            let raw = exchange.exchange(&frames)?;
            return Ok(Reply {
                payload: raw.payload().unwrap_or_default(),
                total_read: raw.total_read,
                attempts: 1,
            });
        }

        let threshold = command.expected_bytes();
        for attempt in 1..=self.max_attempts {
            match exchange.exchange(&frames) {
                Ok(raw) => match raw.payload() {
                    Some(payload) if raw.total_read >= threshold => {
                        if attempt > 1 {
                            logger.info(&format!("Complete reply after {} attempts", attempt));
                        }
                        return Ok(Reply {
                            payload,
                            total_read: raw.total_read,
                            attempts: attempt,
                        });
                    }
                    _ => logger.warn(&format!(
                        "Short reply ({} of {} bytes), resending (attempt {}/{})",
                        raw.total_read, threshold, attempt, self.max_attempts
                    )),
                },
                Err(e) => logger.warn(&format!(
                    "Exchange failed, resending (attempt {}/{}): {}",
                    attempt, self.max_attempts, e
                )),
            }

            if attempt < self.max_attempts {
                thread::sleep(self.backoff);
            }
        }

        logger.error(&format!(
            "No complete reply after {} attempts",
            self.max_attempts
        ));
        Err(HeliosError::unreachable(
            command.wire_text(),
            self.max_attempts,
        ))
    }
}
