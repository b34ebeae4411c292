//! Scripted inverter used by the integration tests
#![allow(dead_code)]

use helios::error::{HeliosError, Result};
use helios::protocol::{PACKET_SIZE, checksum};
use helios::transport::{DeviceConnector, DeviceLink, Timing};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What one open of the device does
#[derive(Clone)]
pub enum Script {
    /// Opening fails
    Unplugged,
    /// These packets are read back, then silence
    Packets(Vec<Vec<u8>>),
}

/// Everything the fake device saw
#[derive(Debug, Default)]
pub struct DeviceLog {
    pub opens: usize,
    pub closes: usize,
    pub writes: Vec<Vec<u8>>,
    pub reads: usize,
}

type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct ScriptedDevice {
    pub log: Arc<Mutex<DeviceLog>>,
    scripts: Arc<Mutex<VecDeque<Script>>>,
    responder: Option<Responder>,
}

impl ScriptedDevice {
    /// Plays `scripts` in order, one per open; silent once they run out
    pub fn scripted(scripts: Vec<Script>) -> Self {
        Self {
            log: Arc::default(),
            scripts: Arc::new(Mutex::new(scripts.into())),
            responder: None,
        }
    }

    /// Answers every command with `respond(command)`; `None` means silence
    pub fn answering<F>(respond: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            log: Arc::default(),
            scripts: Arc::default(),
            responder: Some(Arc::new(respond)),
        }
    }

    pub fn opens(&self) -> usize {
        self.log.lock().unwrap().opens
    }

    pub fn closes(&self) -> usize {
        self.log.lock().unwrap().closes
    }
}

impl DeviceConnector for ScriptedDevice {
    fn open(&mut self) -> Result<Box<dyn DeviceLink>> {
        self.log.lock().unwrap().opens += 1;
        let packets = if self.responder.is_some() {
            VecDeque::new()
        } else {
            match self.scripts.lock().unwrap().pop_front() {
                Some(Script::Unplugged) => {
                    return Err(HeliosError::device_open("no such device"));
                }
                Some(Script::Packets(p)) => p.into(),
                None => VecDeque::new(),
            }
        };
        Ok(Box::new(ScriptedLink {
            log: self.log.clone(),
            packets,
            responder: self.responder.clone(),
            command: String::new(),
            answered: false,
        }))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

struct ScriptedLink {
    log: Arc<Mutex<DeviceLog>>,
    packets: VecDeque<Vec<u8>>,
    responder: Option<Responder>,
    command: String,
    answered: bool,
}

impl Drop for ScriptedLink {
    fn drop(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }
}

impl DeviceLink for ScriptedLink {
    fn write(&mut self, frame: &[u8]) -> Result<usize> {
        self.log.lock().unwrap().writes.push(frame.to_vec());
        let text = &frame[..frame.len().saturating_sub(3)];
        self.command.push_str(&String::from_utf8_lossy(text));
        Ok(frame.len())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        self.log.lock().unwrap().reads += 1;
        if !self.answered {
            self.answered = true;
            if let Some(respond) = &self.responder
                && let Some(payload) = respond(&self.command)
            {
                self.packets = packets(&reply(&payload)).into();
            }
        }
        match self.packets.pop_front() {
            Some(packet) => {
                buf[..packet.len()].copy_from_slice(&packet);
                Ok(packet.len())
            }
            None => Ok(0),
        }
    }
}

/// A reply as the inverter frames it: `(`, payload, checksum, CR
pub fn reply(payload: &str) -> Vec<u8> {
    let mut bytes = format!("({}", payload).into_bytes();
    let trailer = checksum(&bytes);
    bytes.extend_from_slice(&trailer);
    bytes
}

/// Split into full 8-byte USB packets, zero padded
pub fn packets(bytes: &[u8]) -> Vec<Vec<u8>> {
    bytes
        .chunks(PACKET_SIZE)
        .map(|chunk| {
            let mut packet = chunk.to_vec();
            packet.resize(PACKET_SIZE, 0);
            packet
        })
        .collect()
}

pub fn fast_timing() -> Timing {
    Timing {
        inter_frame_delay: Duration::from_millis(2),
        read_timeout: Duration::from_millis(1),
        read_deadline: Duration::from_millis(60),
        inter_read_delay: Duration::from_millis(1),
    }
}

pub const QPIGS_REPLY: &str = "231.5 50.0 230.1 49.9 0345 0290 007 380 52.10 004 085 0035 04.0 120.5 50.00 00000 00010110 00 00 00000 010";
pub const QPIRI_REPLY: &str = "230.0 21.7 230.0 50.0 21.7 5000 4000 48.0 46.0 42.0 56.4 54.0 2 030 060 1 2 3 - 01 0 0 52.0 0 1 000";

/// A healthy inverter in battery mode
pub fn healthy_inverter() -> ScriptedDevice {
    ScriptedDevice::answering(healthy_reply)
}

/// A healthy inverter that goes silent while the flag is cleared
pub fn pluggable_inverter() -> (ScriptedDevice, Arc<AtomicBool>) {
    let plugged = Arc::new(AtomicBool::new(true));
    let flag = plugged.clone();
    let device = ScriptedDevice::answering(move |command| {
        if flag.load(Ordering::SeqCst) {
            healthy_reply(command)
        } else {
            None
        }
    });
    (device, plugged)
}

fn healthy_reply(command: &str) -> Option<String> {
    match command {
        "QMOD" => Some("B".to_string()),
        "QPIGS" => Some(QPIGS_REPLY.to_string()),
        "QPIRI" => Some(QPIRI_REPLY.to_string()),
        "QPIWS" => Some("00000000000000000000000000000000".to_string()),
        _ => Some("NAK".to_string()),
    }
}
