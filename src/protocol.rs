//! Inverter wire protocol
//!
//! Commands are ASCII text followed by a two-byte checksum and a carriage
//! return. Replies come back as `(` + space separated fields + checksum + CR,
//! delivered in 8-byte USB packets.

pub mod checksum;
pub mod command;
pub mod frame;
pub mod response;

pub use checksum::{checksum, crc16};
pub use command::Command;
pub use frame::{Frames, build_frames};
pub use response::{RawResponse, extract_payload};

/// End of every frame and every reply
pub const TERMINATOR: u8 = 0x0D;

/// Never allowed inside a checksum, alongside the terminator and `(`
pub const LINE_FEED: u8 = 0x0A;

/// Opens the field section of a reply
pub const PAYLOAD_OPEN: u8 = b'(';

/// Size of one USB read
pub const PACKET_SIZE: usize = 8;
