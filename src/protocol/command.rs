use crate::error::{HeliosError, Result};
use std::fmt;

/// Commands the bridge sends to the inverter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `QMOD`: operating mode letter
    ModeQuery,
    /// `QPIGS`: live general status
    StatusQuery,
    /// `QPIRI`: rated and configured values
    RatingQuery,
    /// Anything else, forwarded verbatim and attempted once
    Raw(String),
}

impl Command {
    /// The sequence a poll cycle issues, in order
    pub const POLL_SEQUENCE: [Command; 3] = [
        Command::ModeQuery,
        Command::StatusQuery,
        Command::RatingQuery,
    ];

    /// Build a command from caller-supplied text.
    ///
    /// Text naming one of the known queries maps onto that query so it gets
    /// the same retry treatment as the poller's requests.
    pub fn from_text(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(HeliosError::validation("cmd", "Command cannot be empty"));
        }
        if !text.is_ascii() || text.bytes().any(|b| b.is_ascii_control()) {
            return Err(HeliosError::validation(
                "cmd",
                "Command must be printable ASCII",
            ));
        }
        Ok(match text {
            "QMOD" => Command::ModeQuery,
            "QPIGS" => Command::StatusQuery,
            "QPIRI" => Command::RatingQuery,
            other => Command::Raw(other.to_string()),
        })
    }

    /// Text put on the wire
    pub fn wire_text(&self) -> &str {
        match self {
            Command::ModeQuery => "QMOD",
            Command::StatusQuery => "QPIGS",
            Command::RatingQuery => "QPIRI",
            Command::Raw(text) => text,
        }
    }

    /// Bytes a complete reply is known to reach; 0 disables retrying
    pub fn expected_bytes(&self) -> usize {
        match self {
            Command::ModeQuery => 8,
            Command::StatusQuery | Command::RatingQuery => 104,
            Command::Raw(_) => 0,
        }
    }

    pub fn is_retried(&self) -> bool {
        self.expected_bytes() > 0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_text())
    }
}
