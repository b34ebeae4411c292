//! Error types and handling for Helios
//!
//! This module defines the error types used throughout the application.
//! Device-level failures (open, write, read, retry exhaustion) are ordinary
//! recoverable values; nothing in the protocol path terminates the process.

use thiserror::Error;

/// Result type alias for Helios operations
pub type Result<T> = std::result::Result<T, HeliosError>;

/// Main error type for Helios
#[derive(Debug, Error)]
pub enum HeliosError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// The inverter could not be opened (missing, unplugged, permissions)
    #[error("Device open error: {message}")]
    DeviceOpen { message: String },

    /// A frame could not be written to the inverter
    #[error("Write error: {message}")]
    Write { message: String },

    /// A packet read from the inverter failed
    #[error("Read error: {message}")]
    Read { message: String },

    /// A command never produced a complete reply within the attempt budget
    #[error("Device unreachable: {command} gave no complete reply after {attempts} attempts")]
    DeviceUnreachable { command: String, attempts: u32 },

    /// A reply payload did not match its field schema
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The device worker is gone (process shutting down)
    #[error("Device channel closed: {message}")]
    ChannelClosed { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl HeliosError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        HeliosError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        HeliosError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        HeliosError::Io {
            message: message.into(),
        }
    }

    /// Create a new device-open error
    pub fn device_open<S: Into<String>>(message: S) -> Self {
        HeliosError::DeviceOpen {
            message: message.into(),
        }
    }

    /// Create a new write error
    pub fn write<S: Into<String>>(message: S) -> Self {
        HeliosError::Write {
            message: message.into(),
        }
    }

    /// Create a new read error
    pub fn read<S: Into<String>>(message: S) -> Self {
        HeliosError::Read {
            message: message.into(),
        }
    }

    /// Create a new unreachable-device error
    pub fn unreachable<S: Into<String>>(command: S, attempts: u32) -> Self {
        HeliosError::DeviceUnreachable {
            command: command.into(),
            attempts,
        }
    }

    /// Create a new channel-closed error
    pub fn channel_closed<S: Into<String>>(message: S) -> Self {
        HeliosError::ChannelClosed {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        HeliosError::Web {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        HeliosError::Generic {
            message: message.into(),
        }
    }

    /// Whether the error means the inverter did not answer (as opposed to a bad request)
    pub fn is_device_fault(&self) -> bool {
        matches!(
            self,
            HeliosError::DeviceOpen { .. }
                | HeliosError::Write { .. }
                | HeliosError::Read { .. }
                | HeliosError::DeviceUnreachable { .. }
                | HeliosError::ChannelClosed { .. }
        )
    }
}

/// Failure to map a reply payload onto its positional field schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The reply carried no payload at all
    #[error("{command}: empty payload")]
    EmptyPayload { command: String },

    /// Fewer tokens than the schema binds
    #[error("{command}: expected {expected} fields, got {found}")]
    MissingToken {
        command: String,
        expected: usize,
        found: usize,
    },

    /// A bound token could not be converted to its field type
    #[error("{command}: field {field} (position {index}) has invalid {kind} value '{token}'")]
    InvalidNumber {
        command: String,
        field: &'static str,
        index: usize,
        kind: &'static str,
        token: String,
    },

    /// A fixed separator token was not where the schema expects it
    #[error("{command}: expected '{expected}' at position {index}, found '{found}'")]
    UnexpectedLiteral {
        command: String,
        index: usize,
        expected: &'static str,
        found: String,
    },
}

impl From<std::io::Error> for HeliosError {
    fn from(err: std::io::Error) -> Self {
        HeliosError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HeliosError {
    fn from(err: serde_yaml::Error) -> Self {
        HeliosError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HeliosError {
    fn from(err: serde_json::Error) -> Self {
        HeliosError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "usb")]
impl From<hidapi::HidError> for HeliosError {
    fn from(err: hidapi::HidError) -> Self {
        HeliosError::device_open(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = HeliosError::config("test config error");
        assert!(matches!(err, HeliosError::Config { .. }));

        let err = HeliosError::write("pipe");
        assert!(matches!(err, HeliosError::Write { .. }));

        let err = HeliosError::validation("field", "test validation error");
        assert!(matches!(err, HeliosError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = HeliosError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = HeliosError::unreachable("QPIGS", 10);
        assert_eq!(
            format!("{}", err),
            "Device unreachable: QPIGS gave no complete reply after 10 attempts"
        );
    }

    #[test]
    fn test_device_fault_classification() {
        assert!(HeliosError::device_open("gone").is_device_fault());
        assert!(HeliosError::unreachable("QMOD", 3).is_device_fault());
        assert!(!HeliosError::validation("cmd", "empty").is_device_fault());
        let parse = HeliosError::from(ParseError::EmptyPayload {
            command: "QMOD".to_string(),
        });
        assert!(!parse.is_device_fault());
    }
}
