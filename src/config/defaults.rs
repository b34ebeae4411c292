use super::*;

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x0665,
            product_id: 0x5161,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            inter_frame_delay_ms: 350,
            read_timeout_ms: 500,
            read_deadline_ms: 7_000,
            inter_read_delay_ms: 50,
            retry_backoff_ms: 2_000,
            max_attempts: 10,
            queue_depth: 16,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8088,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/helios.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
            trace_frames: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            protocol: ProtocolConfig::default(),
            poll_interval_secs: 12,
            charge_current_bias: 0,
            discharge_current_bias: 1,
            measurement: "exec_solar".to_string(),
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
