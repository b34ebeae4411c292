//! Command framing.
//!
//! The device accepts at most 8 bytes per USB write, so a command longer than
//! five characters goes out as two frames. Both frames carry the checksum of
//! the whole command, not of their own half.

use super::checksum::checksum;

/// Characters carried by the first frame of a split command
pub const SPLIT_AT: usize = 5;

/// The frame(s) for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frames {
    Single(Vec<u8>),
    /// Sent with the inter-frame delay between them
    Split(Vec<u8>, Vec<u8>),
}

impl Frames {
    /// Frames in transmission order
    pub fn as_slices(&self) -> Vec<&[u8]> {
        match self {
            Frames::Single(frame) => vec![frame.as_slice()],
            Frames::Split(first, second) => vec![first.as_slice(), second.as_slice()],
        }
    }

    pub fn count(&self) -> usize {
        match self {
            Frames::Single(_) => 1,
            Frames::Split(..) => 2,
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, Frames::Split(..))
    }
}

/// Frame a command: its bytes followed by checksum and terminator
pub fn build_frames(command: &str) -> Frames {
    let bytes = command.as_bytes();
    let trailer = checksum(bytes);

    let frame = |part: &[u8]| {
        let mut out = Vec::with_capacity(part.len() + trailer.len());
        out.extend_from_slice(part);
        out.extend_from_slice(&trailer);
        out
    };

    if bytes.len() <= SPLIT_AT {
        Frames::Single(frame(bytes))
    } else {
        let (head, tail) = bytes.split_at(SPLIT_AT);
        Frames::Split(frame(head), frame(tail))
    }
}
