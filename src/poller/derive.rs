//! Values computed from a cycle's raw readings

use crate::snapshot::Snapshot;
use std::time::Duration;

/// Currents at or below this many amperes are left uncorrected
const BIAS_THRESHOLD: i64 = 1;

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Energy of one poll interval at a constant `watts`
pub fn watt_hours(watts: f64, interval: Duration) -> f64 {
    let secs = interval.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    round2(watts / (3600.0 / secs))
}

/// Additive sensor corrections for the battery currents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CurrentBias {
    pub charge: i64,
    pub discharge: i64,
}

impl CurrentBias {
    /// Correct whichever current is flowing; charging wins if both exceed
    /// the threshold.
    pub fn apply(&self, snapshot: &mut Snapshot) {
        if snapshot.battery_charge_current > BIAS_THRESHOLD {
            snapshot.battery_charge_current += self.charge;
        } else if snapshot.battery_discharge_current > BIAS_THRESHOLD {
            snapshot.battery_discharge_current += self.discharge;
        }
    }
}

/// Mode letter reported while the inverter runs from its battery
pub const BATTERY_MODE: &str = "B";

/// Fill the derived power and energy fields, then apply the bias
pub fn derive(snapshot: &mut Snapshot, interval: Duration, bias: CurrentBias) {
    snapshot.pv_in_watts = snapshot.scc_voltage * snapshot.pv_in_current;
    snapshot.pv_in_watthour = watt_hours(snapshot.pv_in_watts, interval);

    if snapshot.inverter_mode == BATTERY_MODE {
        snapshot.load_watthour = watt_hours(snapshot.load_watts, interval);
    }

    bias.apply(snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pv_power_and_energy() {
        let mut s = Snapshot {
            scc_voltage: 50.0,
            pv_in_current: 4.0,
            ..Snapshot::default()
        };
        derive(&mut s, Duration::from_secs(12), CurrentBias::default());
        assert_eq!(s.pv_in_watts, 200.0);
        assert_eq!(s.pv_in_watthour, 0.67);
    }

    #[test]
    fn load_energy_only_on_battery() {
        let mut line = Snapshot {
            inverter_mode: "L".to_string(),
            load_watts: 600.0,
            ..Snapshot::default()
        };
        derive(&mut line, Duration::from_secs(12), CurrentBias::default());
        assert_eq!(line.load_watthour, 0.0);

        let mut battery = Snapshot {
            inverter_mode: "B".to_string(),
            load_watts: 600.0,
            ..Snapshot::default()
        };
        derive(&mut battery, Duration::from_secs(12), CurrentBias::default());
        assert_eq!(battery.load_watthour, 2.0);
    }

    #[test]
    fn bias_prefers_charge_current() {
        let bias = CurrentBias {
            charge: 2,
            discharge: 1,
        };
        let mut both = Snapshot {
            battery_charge_current: 5,
            battery_discharge_current: 5,
            ..Snapshot::default()
        };
        bias.apply(&mut both);
        assert_eq!(both.battery_charge_current, 7);
        assert_eq!(both.battery_discharge_current, 5);

        let mut discharging = Snapshot {
            battery_charge_current: 1,
            battery_discharge_current: 9,
            ..Snapshot::default()
        };
        bias.apply(&mut discharging);
        assert_eq!(discharging.battery_charge_current, 1);
        assert_eq!(discharging.battery_discharge_current, 10);

        let mut idle = Snapshot {
            battery_discharge_current: 1,
            ..Snapshot::default()
        };
        bias.apply(&mut idle);
        assert_eq!(idle.battery_discharge_current, 1);
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(0.666_666), 0.67);
        assert_eq!(round2(1.004), 1.0);
        assert_eq!(watt_hours(100.0, Duration::ZERO), 0.0);
    }
}
