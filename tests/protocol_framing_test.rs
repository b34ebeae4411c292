use helios::protocol::{Frames, build_frames, checksum, crc16};

const RESERVED: [u8; 3] = [0x0d, 0x0a, 0x28];

fn two_char_commands() -> impl Iterator<Item = String> {
    (b' '..=b'~').flat_map(|a| (b' '..=b'~').map(move |b| String::from_utf8(vec![a, b]).unwrap()))
}

#[test]
fn checksum_is_deterministic() {
    for cmd in ["QPIGS", "QMOD", "QPIRI", "MCHGC030", "PBCV44.0"] {
        assert_eq!(checksum(cmd.as_bytes()), checksum(cmd.as_bytes()));
    }
}

#[test]
fn checksum_never_contains_framing_bytes() {
    let mut escaped = 0;
    for cmd in two_char_commands() {
        let [hi, lo, cr] = checksum(cmd.as_bytes());
        assert_eq!(cr, 0x0d);
        assert!(!RESERVED.contains(&hi), "{cmd}: high byte {hi:#04x}");
        assert!(!RESERVED.contains(&lo), "{cmd}: low byte {lo:#04x}");

        let [raw_hi, raw_lo] = crc16(cmd.as_bytes()).to_be_bytes();
        for (raw, out) in [(raw_hi, hi), (raw_lo, lo)] {
            if RESERVED.contains(&raw) {
                assert_eq!(out, raw + 1);
                escaped += 1;
            } else {
                assert_eq!(out, raw);
            }
        }
    }
    assert!(escaped > 0);
}

#[test]
fn frame_lengths_follow_command_length() {
    for cmd in ["Q", "QMOD", "QPIGS", "QPIGS2", "MCHGC030", "MUCHGC0030"] {
        let trailer = checksum(cmd.as_bytes());
        match build_frames(cmd) {
            Frames::Single(frame) => {
                assert!(cmd.len() <= 5);
                assert_eq!(frame.len(), cmd.len() + 3);
                assert_eq!(frame[cmd.len()..], trailer);
            }
            Frames::Split(first, second) => {
                assert!(cmd.len() > 5);
                assert_eq!(first.len(), 5 + 3);
                assert_eq!(second.len(), cmd.len() - 5 + 3);
                assert_eq!(first[5..], trailer);
                assert_eq!(second[cmd.len() - 5..], trailer);
                assert_eq!(&first[..5], &cmd.as_bytes()[..5]);
                assert_eq!(&second[..cmd.len() - 5], &cmd.as_bytes()[5..]);
            }
        }
    }
}
