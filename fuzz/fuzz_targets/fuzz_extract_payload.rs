#![no_main]
use helios::protocol::{Command, extract_payload};
use helios::snapshot::Snapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Treat the input as a raw read buffer
    let Some(payload) = extract_payload(data) else {
        return;
    };
    let text = String::from_utf8_lossy(payload);

    // Every schema must reject or accept without panicking
    let mut snapshot = Snapshot::default();
    for command in &Command::POLL_SEQUENCE {
        let _ = snapshot.apply(command, &text);
    }
});
