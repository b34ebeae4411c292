//! Device transport
//!
//! Owns the path to the physical inverter: open a connection, write the
//! frame(s) of one command, then read 8-byte packets until one carries the
//! terminator or the read deadline passes. The connection is opened per
//! exchange and released when the exchange returns, on every path, so a
//! replugged inverter is picked up by the next command.
//!
//! All calls here block; the device worker runs them on its own thread.

use crate::config::ProtocolConfig;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger, hex_bytes};
use crate::protocol::{Frames, PACKET_SIZE, RawResponse, TERMINATOR};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "usb")]
pub mod hid;

/// An open connection to the inverter
pub trait DeviceLink {
    /// Write one frame, returning the bytes accepted
    fn write(&mut self, frame: &[u8]) -> Result<usize>;

    /// Read at most `buf.len()` bytes, waiting no longer than `timeout`.
    /// `Ok(0)` means the timeout passed without data.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}

/// Opens connections to the inverter
pub trait DeviceConnector: Send + 'static {
    fn open(&mut self) -> Result<Box<dyn DeviceLink>>;

    /// Human readable identity for logs
    fn describe(&self) -> String;
}

/// One full command exchange: frames out, raw reply in
pub trait Exchange {
    fn exchange(&mut self, frames: &Frames) -> Result<RawResponse>;
}

/// Bus timing applied by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub inter_frame_delay: Duration,
    pub read_timeout: Duration,
    pub read_deadline: Duration,
    pub inter_read_delay: Duration,
}

impl From<&ProtocolConfig> for Timing {
    fn from(config: &ProtocolConfig) -> Self {
        Self {
            inter_frame_delay: config.inter_frame_delay(),
            read_timeout: config.read_timeout(),
            read_deadline: config.read_deadline(),
            inter_read_delay: config.inter_read_delay(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from(&ProtocolConfig::default())
    }
}

/// Frame writer and packet reader over a [`DeviceConnector`]
pub struct Transport<C> {
    connector: C,
    timing: Timing,
    trace_frames: bool,
    logger: StructuredLogger,
}

impl<C: DeviceConnector> Transport<C> {
    pub fn new(connector: C, timing: Timing, trace_frames: bool) -> Self {
        Self {
            connector,
            timing,
            trace_frames,
            logger: get_logger("transport"),
        }
    }

    fn write_frames(&self, link: &mut dyn DeviceLink, frames: &Frames) -> Result<()> {
        for (index, frame) in frames.as_slices().into_iter().enumerate() {
            if index > 0 {
                thread::sleep(self.timing.inter_frame_delay);
            }
            let written = link.write(frame)?;
            if self.trace_frames {
                self.logger.debug(&format!(
                    "{}: {} bytes written",
                    hex_bytes(frame),
                    written
                ));
            }
            if written < frame.len() {
                self.logger.warn(&format!(
                    "Short write: {} of {} bytes accepted",
                    written,
                    frame.len()
                ));
            }
        }
        Ok(())
    }

    fn read_reply(&self, link: &mut dyn DeviceLink) -> RawResponse {
        let started = Instant::now();
        let mut response = RawResponse::default();
        let mut packet = [0u8; PACKET_SIZE];

        while started.elapsed() < self.timing.read_deadline {
            packet.fill(0);
            let read = match link.read_timeout(&mut packet, self.timing.read_timeout) {
                Ok(n) => n.min(PACKET_SIZE),
                Err(e) => {
                    self.logger
                        .debug(&format!("Packet read failed, continuing: {}", e));
                    0
                }
            };
            response.reads += 1;
            response.total_read += read;
            response.buffer.extend_from_slice(&packet[..read]);

            if packet[..read].contains(&TERMINATOR) {
                break;
            }
            // Back-to-back reads make the inverter's USB side drop packets
            thread::sleep(self.timing.inter_read_delay);
        }

        if self.trace_frames {
            self.logger.debug(&format!(
                "{}: {} bytes read",
                hex_bytes(&response.buffer),
                response.total_read
            ));
        }
        if !response.has_terminator() {
            self.logger.debug(&format!(
                "Read deadline of {:?} passed after {} reads without terminator",
                self.timing.read_deadline, response.reads
            ));
        }
        response
    }
}

impl<C: DeviceConnector> Exchange for Transport<C> {
    fn exchange(&mut self, frames: &Frames) -> Result<RawResponse> {
        let mut link = self.connector.open()?;
        self.write_frames(link.as_mut(), frames)?;
        Ok(self.read_reply(link.as_mut()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HeliosError;
    use crate::protocol::build_frames;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        opened: usize,
        closed: usize,
        writes: Vec<(Vec<u8>, Instant)>,
    }

    struct FakeLink {
        log: Arc<Mutex<Log>>,
        packets: VecDeque<Vec<u8>>,
        fail_write: bool,
    }

    impl Drop for FakeLink {
        fn drop(&mut self) {
            self.log.lock().unwrap().closed += 1;
        }
    }

    impl DeviceLink for FakeLink {
        fn write(&mut self, frame: &[u8]) -> Result<usize> {
            if self.fail_write {
                return Err(HeliosError::write("broken pipe"));
            }
            self.log
                .lock()
                .unwrap()
                .writes
                .push((frame.to_vec(), Instant::now()));
            Ok(frame.len())
        }

        fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
            match self.packets.pop_front() {
                Some(p) => {
                    buf[..p.len()].copy_from_slice(&p);
                    Ok(p.len())
                }
                None => Ok(0),
            }
        }
    }

    struct FakeConnector {
        log: Arc<Mutex<Log>>,
        packets: Vec<Vec<u8>>,
        fail_write: bool,
    }

    impl DeviceConnector for FakeConnector {
        fn open(&mut self) -> Result<Box<dyn DeviceLink>> {
            self.log.lock().unwrap().opened += 1;
            Ok(Box::new(FakeLink {
                log: self.log.clone(),
                packets: self.packets.clone().into(),
                fail_write: self.fail_write,
            }))
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    fn quick_timing() -> Timing {
        Timing {
            inter_frame_delay: Duration::from_millis(30),
            read_timeout: Duration::from_millis(1),
            read_deadline: Duration::from_millis(100),
            inter_read_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn timing_defaults_follow_protocol_config() {
        let t = Timing::default();
        assert_eq!(t.inter_frame_delay, Duration::from_millis(350));
        assert_eq!(t.read_deadline, Duration::from_millis(7000));
    }

    #[test]
    fn split_frames_are_spaced_by_inter_frame_delay() {
        let log = Arc::new(Mutex::new(Log::default()));
        let connector = FakeConnector {
            log: log.clone(),
            packets: vec![b"(ACK\x39\x20\r\0".to_vec()],
            fail_write: false,
        };
        let mut transport = Transport::new(connector, quick_timing(), true);
        let raw = transport.exchange(&build_frames("MCHGC030")).unwrap();
        assert_eq!(raw.payload().as_deref(), Some("ACK"));

        let log = log.lock().unwrap();
        assert_eq!(log.writes.len(), 2);
        assert_eq!(log.writes[0].0, b"MCHGC\xe2\x44\r".to_vec());
        assert_eq!(log.writes[1].0, b"030\xe2\x44\r".to_vec());
        assert!(log.writes[1].1.duration_since(log.writes[0].1) >= Duration::from_millis(30));
    }

    #[test]
    fn write_failure_is_returned_and_link_released() {
        let log = Arc::new(Mutex::new(Log::default()));
        let connector = FakeConnector {
            log: log.clone(),
            packets: Vec::new(),
            fail_write: true,
        };
        let mut transport = Transport::new(connector, quick_timing(), false);
        let err = transport.exchange(&build_frames("QPIGS")).unwrap_err();
        assert!(matches!(err, HeliosError::Write { .. }));

        let log = log.lock().unwrap();
        assert_eq!(log.opened, 1);
        assert_eq!(log.closed, 1);
    }

    #[test]
    fn silent_device_stops_at_deadline() {
        let log = Arc::new(Mutex::new(Log::default()));
        let connector = FakeConnector {
            log: log.clone(),
            packets: Vec::new(),
            fail_write: false,
        };
        let mut transport = Transport::new(connector, quick_timing(), false);
        let started = Instant::now();
        let raw = transport.exchange(&build_frames("QMOD")).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(raw.total_read, 0);
        assert!(raw.reads > 0);
        assert_eq!(raw.payload(), None);
        assert_eq!(log.lock().unwrap().closed, 1);
    }
}
