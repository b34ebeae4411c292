//! USB HID link to the inverter via `hidapi`

use super::{DeviceConnector, DeviceLink};
use crate::config::DeviceConfig;
use crate::error::{HeliosError, Result};
use hidapi::{HidApi, HidDevice};
use std::time::Duration;

/// Opens the first HID device matching the configured vendor/product id
#[derive(Debug, Clone)]
pub struct HidConnector {
    vendor_id: u16,
    product_id: u16,
}

impl HidConnector {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            vendor_id: config.vendor_id,
            product_id: config.product_id,
        }
    }
}

impl DeviceConnector for HidConnector {
    fn open(&mut self) -> Result<Box<dyn DeviceLink>> {
        let api = HidApi::new()
            .map_err(|e| HeliosError::device_open(format!("HID init failed: {}", e)))?;
        let device = api.open(self.vendor_id, self.product_id).map_err(|e| {
            HeliosError::device_open(format!(
                "Cannot open {} (check the cable and udev permissions): {}",
                self.describe(),
                e
            ))
        })?;
        Ok(Box::new(HidLink { device, _api: api }))
    }

    fn describe(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// An open HID handle; closed on drop
struct HidLink {
    device: HidDevice,
    // Declared after `device` so the handle closes before the context goes
    _api: HidApi,
}

impl DeviceLink for HidLink {
    fn write(&mut self, frame: &[u8]) -> Result<usize> {
        self.device
            .write(frame)
            .map_err(|e| HeliosError::write(e.to_string()))
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        self.device
            .read_timeout(buf, millis)
            .map_err(|e| HeliosError::read(e.to_string()))
    }
}
