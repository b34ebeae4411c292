//! Nibble-wise CRC-16 (XMODEM polynomial) used on every command frame.

use super::{LINE_FEED, PAYLOAD_OPEN, TERMINATOR};

const CRC_TABLE: [u16; 16] = [
    0x0000, 0x1021, 0x2042, 0x3063, 0x4084, 0x50a5, 0x60c6, 0x70e7, 0x8108, 0x9129, 0xa14a,
    0xb16b, 0xc18c, 0xd1ad, 0xe1ce, 0xf1ef,
];

/// Raw 16-bit CRC of `data`, before control-byte escaping
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |crc, &byte| {
        let crc = step(crc, byte >> 4);
        step(crc, byte & 0x0f)
    })
}

fn step(crc: u16, nibble: u8) -> u16 {
    let index = ((crc >> 12) as u8 ^ nibble) as usize;
    (crc << 4) ^ CRC_TABLE[index]
}

/// Checksum trailer for a command: high byte, low byte, terminator.
///
/// A checksum byte equal to CR, LF or `(` is bumped by one so the device
/// never mistakes it for framing.
pub fn checksum(data: &[u8]) -> [u8; 3] {
    let [high, low] = crc16(data).to_be_bytes();
    [escape(high), escape(low), TERMINATOR]
}

fn escape(byte: u8) -> u8 {
    match byte {
        TERMINATOR | LINE_FEED | PAYLOAD_OPEN => byte + 1,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_query_checksums() {
        assert_eq!(checksum(b"QPIGS"), [0xb7, 0xa9, 0x0d]);
        assert_eq!(checksum(b"QMOD"), [0x49, 0xc1, 0x0d]);
        assert_eq!(checksum(b"QPIRI"), [0xf8, 0x54, 0x0d]);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc16(b""), 0);
        assert_eq!(checksum(b""), [0x00, 0x00, 0x0d]);
    }

    #[test]
    fn escaping_low_line_feed() {
        // POP02 hashes to 0xe20a
        assert_eq!(crc16(b"POP02"), 0xe20a);
        assert_eq!(checksum(b"POP02"), [0xe2, 0x0b, 0x0d]);
    }

    #[test]
    fn escaping_high_open_paren() {
        assert_eq!(crc16(b"F"), 0x2802);
        assert_eq!(checksum(b"F"), [0x29, 0x02, 0x0d]);
    }

    #[test]
    fn escaping_carriage_return_both_positions() {
        assert_eq!(crc16(b"JN"), 0x4b0d);
        assert_eq!(checksum(b"JN"), [0x4b, 0x0e, 0x0d]);
        assert_eq!(crc16(b"B5"), 0x0d58);
        assert_eq!(checksum(b"B5"), [0x0e, 0x58, 0x0d]);
    }

    #[test]
    fn escaping_high_line_feed_and_low_open_paren() {
        assert_eq!(crc16(b"U"), 0x0a50);
        assert_eq!(checksum(b"U"), [0x0b, 0x50, 0x0d]);
        assert_eq!(crc16(b"BB"), 0x0328);
        assert_eq!(checksum(b"BB"), [0x03, 0x29, 0x0d]);
    }
}
