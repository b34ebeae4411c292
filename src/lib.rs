//! # Helios - USB HID bridge for off-grid solar inverters
//!
//! Polls an inverter that speaks the `QMOD`/`QPIGS`/`QPIRI` ASCII protocol
//! over USB HID and republishes the decoded measurements as a cached JSON
//! snapshot, next to a pass-through for arbitrary raw commands.
//!
//! ## Features
//!
//! - **Checksummed framing**: nibble-table CRC with reserved-byte escaping
//! - **Serialized device access**: one worker thread owns the inverter
//! - **Bounded retries**: short replies are resent, then reported unreachable
//! - **Consistent snapshots**: whole-record swaps, readers never block on I/O
//! - **Web Interface**: `/query`, `/raw`, `/events` over HTTP
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `protocol`: Checksum, framing, command model and reply extraction
//! - `transport`: Device connection, frame writes and the packet read loop
//! - `device`: Single-owner device worker and retry policy
//! - `record`: Positional parsing of reply payloads
//! - `snapshot`: Snapshot record and the publish/read cache
//! - `poller`: Poll scheduling and derived fields
//! - `bridge`: Start/stop wiring of worker, poller and cache
//! - `web`: HTTP server and REST API

pub mod bridge;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod poller;
pub mod protocol;
pub mod record;
pub mod snapshot;
pub mod transport;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use device::DeviceHandle;
pub use error::{HeliosError, Result};
pub use protocol::Command;
pub use snapshot::{Snapshot, SnapshotCache};
