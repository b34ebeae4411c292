//! Published measurement snapshots
//!
//! The poller builds a fresh [`Snapshot`] every successful cycle and swaps it
//! in as a whole through [`SnapshotPublisher`]. Readers hold a [`SnapshotCache`] and
//! get the latest `Arc<Snapshot>` without ever touching the device, so a
//! reader sees either the previous cycle or the new one, never a blend.
//!
//! JSON keys keep the names existing dashboards and InfluxDB pipelines
//! already consume.

use crate::error::ParseError;
use crate::protocol::Command;
use crate::record::{self, ModeReading, RatingReading, Reading, StatusReading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// One complete measurement record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Snapshot {
    // QMOD
    #[serde(rename = "Inverter_mode_str")]
    pub inverter_mode: String,

    // QPIGS
    #[serde(rename = "AC_grid_voltage")]
    pub ac_grid_voltage: f64,
    #[serde(rename = "AC_out_voltage")]
    pub ac_out_voltage: f64,
    #[serde(rename = "PV_in_voltage")]
    pub pv_in_voltage: f64,
    #[serde(rename = "PV_in_current")]
    pub pv_in_current: f64,
    #[serde(rename = "PV_in_watts")]
    pub pv_in_watts: f64,
    #[serde(rename = "PV_in_watthour")]
    pub pv_in_watthour: f64,
    #[serde(rename = "SCC_voltage")]
    pub scc_voltage: f64,
    #[serde(rename = "Load_pct")]
    pub load_pct: i64,
    #[serde(rename = "Load_watts")]
    pub load_watts: f64,
    #[serde(rename = "Load_watthour")]
    pub load_watthour: f64,
    #[serde(rename = "Load_va")]
    pub load_va: i64,
    #[serde(rename = "Bus_voltage")]
    pub bus_voltage: i64,
    #[serde(rename = "Heatsink_temperature")]
    pub heatsink_temperature: i64,
    #[serde(rename = "Battery_capacity")]
    pub battery_capacity: i64,
    #[serde(rename = "Battery_voltage")]
    pub battery_voltage: f64,
    #[serde(rename = "Battery_charge_current")]
    pub battery_charge_current: i64,
    #[serde(rename = "Battery_discharge_current")]
    pub battery_discharge_current: i64,
    #[serde(rename = "Device_status")]
    pub device_status: String,

    // QPIRI
    #[serde(rename = "Battery_recharge_voltage")]
    pub battery_recharge_voltage: f64,
    #[serde(rename = "Battery_under_voltage")]
    pub battery_under_voltage: f64,
    #[serde(rename = "Battery_bulk_voltage")]
    pub battery_bulk_voltage: f64,
    #[serde(rename = "Battery_float_voltage")]
    pub battery_float_voltage: f64,
    #[serde(rename = "Max_grid_charge_current")]
    pub max_grid_charge_current: i64,
    #[serde(rename = "Max_charge_current")]
    pub max_charge_current: i64,
    #[serde(rename = "Out_source_priority")]
    pub out_source_priority: i64,
    #[serde(rename = "Charger_source_priority")]
    pub charger_source_priority: i64,
    #[serde(rename = "Battery_redischarge_voltage")]
    pub battery_redischarge_voltage: f64,

    #[serde(rename = "Measurement")]
    pub measurement: String,

    /// When the cycle that produced this record finished
    #[serde(rename = "UpdatedAt")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Completed poll cycles since start, this one included
    #[serde(rename = "PollCount")]
    pub poll_count: u64,

    /// Replies of the cycle that produced this record which did not parse
    #[serde(rename = "ParseErrors", default, skip_serializing_if = "Vec::is_empty")]
    pub parse_errors: Vec<String>,

    /// Commands of the latest cycle that got no usable reply. When set, the
    /// readings above are carried over from the last good cycle.
    #[serde(rename = "DeviceErrors", default, skip_serializing_if = "Vec::is_empty")]
    pub device_errors: Vec<String>,
}

impl Snapshot {
    /// Decode a polled query's payload into this record.
    ///
    /// On error nothing is written, the fields of that query keep their
    /// current values.
    pub fn apply(&mut self, command: &Command, payload: &str) -> Result<(), ParseError> {
        match record::parse(command, payload) {
            Some(reading) => {
                self.merge(reading?);
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn merge(&mut self, reading: Reading) {
        match reading {
            Reading::Mode(mode) => self.merge_mode(mode),
            Reading::Status(status) => self.merge_status(status),
            Reading::Rating(rating) => self.merge_rating(rating),
        }
    }

    fn merge_mode(&mut self, r: ModeReading) {
        self.inverter_mode = r.mode;
    }

    fn merge_status(&mut self, r: StatusReading) {
        self.ac_grid_voltage = r.grid_voltage;
        self.ac_out_voltage = r.ac_out_voltage;
        self.load_va = r.load_va;
        self.load_watts = r.load_watts;
        self.load_pct = r.load_pct;
        self.bus_voltage = r.bus_voltage;
        self.battery_voltage = r.battery_voltage;
        self.battery_charge_current = r.battery_charge_current;
        self.battery_capacity = r.battery_capacity;
        self.heatsink_temperature = r.heatsink_temperature;
        self.pv_in_current = r.pv_in_current;
        self.pv_in_voltage = r.pv_in_voltage;
        self.scc_voltage = r.scc_voltage;
        self.battery_discharge_current = r.battery_discharge_current;
        self.device_status = r.device_status;
    }

    fn merge_rating(&mut self, r: RatingReading) {
        self.battery_recharge_voltage = r.battery_recharge_voltage;
        self.battery_under_voltage = r.battery_under_voltage;
        self.battery_bulk_voltage = r.battery_bulk_voltage;
        self.battery_float_voltage = r.battery_float_voltage;
        self.max_grid_charge_current = r.max_grid_charge_current;
        self.max_charge_current = r.max_charge_current;
        self.out_source_priority = r.out_source_priority;
        self.charger_source_priority = r.charger_source_priority;
        self.battery_redischarge_voltage = r.battery_redischarge_voltage;
    }
}

/// A snapshot as served, with its age in whole seconds
#[derive(Debug, Serialize)]
pub struct SnapshotView<'a> {
    #[serde(flatten)]
    pub snapshot: &'a Snapshot,
    #[serde(rename = "LastUpdated")]
    pub last_updated: i64,
}

/// Latest snapshot plus how old it is at the time of reading
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub snapshot: Arc<Snapshot>,
    pub age: Duration,
}

impl CachedSnapshot {
    pub fn view(&self) -> SnapshotView<'_> {
        SnapshotView {
            snapshot: &self.snapshot,
            last_updated: i64::try_from(self.age.as_secs()).unwrap_or(i64::MAX),
        }
    }
}

/// Single writer side of the cache, owned by the poller
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    /// Replace the published snapshot as a whole
    pub fn publish(&self, snapshot: Snapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    /// The snapshot readers currently see
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }
}

/// Reader side of the cache; cheap to clone
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    rx: watch::Receiver<Arc<Snapshot>>,
    created: Instant,
}

impl SnapshotCache {
    /// Create a cache holding the all-zero snapshot
    pub fn channel() -> (SnapshotPublisher, SnapshotCache) {
        let (tx, rx) = watch::channel(Arc::new(Snapshot::default()));
        (
            SnapshotPublisher { tx },
            SnapshotCache {
                rx,
                created: Instant::now(),
            },
        )
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.rx.borrow().clone()
    }

    /// Latest snapshot and its age. Before the first publish the age counts
    /// from the creation of the cache.
    pub fn read(&self) -> CachedSnapshot {
        let snapshot = self.current();
        let age = match snapshot.updated_at {
            Some(at) => (Utc::now() - at).to_std().unwrap_or(Duration::ZERO),
            None => self.created.elapsed(),
        };
        CachedSnapshot { snapshot, age }
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        rx
    }
}
