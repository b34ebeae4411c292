//! Typed readings decoded from reply payloads
//!
//! Each query has a fixed positional schema. Parsing is strict: too few
//! tokens, an unconvertible bound token or a misplaced separator fails the
//! whole reading. Tokens the schema discards are not type-checked, and extra
//! trailing tokens appended by newer firmware are ignored.

use crate::error::ParseError;
use crate::protocol::Command;

mod schema;

use schema::Tokens;

/// Tokens a `QPIGS` reply must carry
pub const STATUS_FIELDS: usize = 17;

/// Tokens a `QPIRI` reply must carry
pub const RATING_FIELDS: usize = 23;

/// Position of the `-` separator inside a `QPIRI` reply
const RATING_SEPARATOR: usize = 18;

/// Mode letter sent back for `QMOD` (`B` = battery, `L` = line, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct ModeReading {
    pub mode: String,
}

/// Live values sent back for `QPIGS`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReading {
    pub grid_voltage: f64,
    pub ac_out_voltage: f64,
    pub load_va: i64,
    pub load_watts: f64,
    pub load_pct: i64,
    pub bus_voltage: i64,
    pub battery_voltage: f64,
    pub battery_charge_current: i64,
    pub battery_capacity: i64,
    pub heatsink_temperature: i64,
    pub pv_in_current: f64,
    pub pv_in_voltage: f64,
    pub scc_voltage: f64,
    pub battery_discharge_current: i64,
    pub device_status: String,
}

/// Rated and configured values sent back for `QPIRI`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingReading {
    pub battery_recharge_voltage: f64,
    pub battery_under_voltage: f64,
    pub battery_bulk_voltage: f64,
    pub battery_float_voltage: f64,
    pub max_grid_charge_current: i64,
    pub max_charge_current: i64,
    pub out_source_priority: i64,
    pub charger_source_priority: i64,
    pub battery_redischarge_voltage: f64,
}

/// A decoded reply of one of the polled queries
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Mode(ModeReading),
    Status(StatusReading),
    Rating(RatingReading),
}

pub fn parse_mode(payload: &str) -> Result<ModeReading, ParseError> {
    let tokens = Tokens::new("QMOD", payload);
    tokens.require(1)?;
    Ok(ModeReading {
        mode: tokens.text(0)?,
    })
}

pub fn parse_status(payload: &str) -> Result<StatusReading, ParseError> {
    let t = Tokens::new("QPIGS", payload);
    t.require(STATUS_FIELDS)?;
    // 1 and 3 are grid and output frequency, not kept
    Ok(StatusReading {
        grid_voltage: t.float(0, "grid_voltage")?,
        ac_out_voltage: t.float(2, "ac_out_voltage")?,
        load_va: t.int(4, "load_va")?,
        load_watts: t.float(5, "load_watts")?,
        load_pct: t.int(6, "load_pct")?,
        bus_voltage: t.int(7, "bus_voltage")?,
        battery_voltage: t.float(8, "battery_voltage")?,
        battery_charge_current: t.int(9, "battery_charge_current")?,
        battery_capacity: t.int(10, "battery_capacity")?,
        heatsink_temperature: t.int(11, "heatsink_temperature")?,
        pv_in_current: t.float(12, "pv_in_current")?,
        pv_in_voltage: t.float(13, "pv_in_voltage")?,
        scc_voltage: t.float(14, "scc_voltage")?,
        battery_discharge_current: t.int(15, "battery_discharge_current")?,
        device_status: t.text(16)?,
    })
}

pub fn parse_rating(payload: &str) -> Result<RatingReading, ParseError> {
    let t = Tokens::new("QPIRI", payload);
    t.require(RATING_FIELDS)?;
    t.literal(RATING_SEPARATOR, "-")?;
    Ok(RatingReading {
        battery_recharge_voltage: t.float(8, "battery_recharge_voltage")?,
        battery_under_voltage: t.float(9, "battery_under_voltage")?,
        battery_bulk_voltage: t.float(10, "battery_bulk_voltage")?,
        battery_float_voltage: t.float(11, "battery_float_voltage")?,
        max_grid_charge_current: t.int(13, "max_grid_charge_current")?,
        max_charge_current: t.int(14, "max_charge_current")?,
        out_source_priority: t.int(16, "out_source_priority")?,
        charger_source_priority: t.int(17, "charger_source_priority")?,
        battery_redischarge_voltage: t.float(22, "battery_redischarge_voltage")?,
    })
}

/// Decode the payload of a polled query. Raw commands have no schema.
pub fn parse(command: &Command, payload: &str) -> Option<Result<Reading, ParseError>> {
    match command {
        Command::ModeQuery => Some(parse_mode(payload).map(Reading::Mode)),
        Command::StatusQuery => Some(parse_status(payload).map(Reading::Status)),
        Command::RatingQuery => Some(parse_rating(payload).map(Reading::Rating)),
        Command::Raw(_) => None,
    }
}
