use super::{PAYLOAD_OPEN, TERMINATOR};

/// The `(` must sit this close to the start of the buffer to be trusted
pub const DELIMITER_WINDOW: usize = 10;

/// Trailing checksum bytes between the fields and the terminator
const REPLY_CHECKSUM_LEN: usize = 2;

/// Bytes collected for one command attempt
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub buffer: Vec<u8>,
    /// Bytes the device reported, summed over all packet reads
    pub total_read: usize,
    /// Packet reads performed
    pub reads: usize,
}

impl RawResponse {
    /// Payload text, or `None` when the buffer is not a well-framed reply
    pub fn payload(&self) -> Option<String> {
        extract_payload(&self.buffer).map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn has_terminator(&self) -> bool {
        self.buffer.contains(&TERMINATOR)
    }
}

/// Field bytes of a reply: between the first `(` and the first CR, minus the
/// two checksum bytes in front of the CR.
pub fn extract_payload(buffer: &[u8]) -> Option<&[u8]> {
    let start = buffer.iter().position(|&b| b == PAYLOAD_OPEN)?;
    let end = buffer.iter().position(|&b| b == TERMINATOR)?;
    if start >= DELIMITER_WINDOW || end == 0 {
        return None;
    }
    let fields_start = start + 1;
    let fields_end = end.checked_sub(REPLY_CHECKSUM_LEN)?;
    if fields_end < fields_start {
        return None;
    }
    Some(&buffer[fields_start..fields_end])
}
