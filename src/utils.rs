/// Cell voltage the firmware treats as a full battery.
pub const BATTERY_MAX_VOLTS: f64 = 3.950;
/// Cell voltage the firmware treats as an empty battery.
pub const BATTERY_MIN_VOLTS: f64 = 3.280;

/// Map a measured cell voltage onto the 0-100 `battery_level` scale.
///
/// Linear between [`BATTERY_MIN_VOLTS`] and [`BATTERY_MAX_VOLTS`], clamped at both ends.
pub fn battery_percent_from_voltage(volts: f64) -> i32 {
    if !volts.is_finite() {
        return 0;
    }
    let fraction = (volts - BATTERY_MIN_VOLTS) / (BATTERY_MAX_VOLTS - BATTERY_MIN_VOLTS);
    (fraction.clamp(0.0, 1.0) * 100.0).round() as i32
}

/// Human-readable label for a battery percentage, used in log output.
pub fn describe_battery_level(level: i32) -> &'static str {
    match level {
        i32::MIN..=0 => "empty",
        1..=15 => "critical",
        16..=40 => "low",
        41..=80 => "ok",
        _ => "full",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_percent_endpoints() {
        assert_eq!(battery_percent_from_voltage(BATTERY_MAX_VOLTS), 100);
        assert_eq!(battery_percent_from_voltage(BATTERY_MIN_VOLTS), 0);
    }

    #[test]
    fn battery_percent_is_clamped() {
        assert_eq!(battery_percent_from_voltage(4.2), 100);
        assert_eq!(battery_percent_from_voltage(3.0), 0);
        assert_eq!(battery_percent_from_voltage(f64::NAN), 0);
    }

    #[test]
    fn battery_percent_midpoint() {
        let mid = (BATTERY_MAX_VOLTS + BATTERY_MIN_VOLTS) / 2.0;
        assert_eq!(battery_percent_from_voltage(mid), 50);
    }

    #[test]
    fn battery_labels() {
        assert_eq!(describe_battery_level(0), "empty");
        assert_eq!(describe_battery_level(10), "critical");
        assert_eq!(describe_battery_level(30), "low");
        assert_eq!(describe_battery_level(75), "ok");
        assert_eq!(describe_battery_level(120), "full");
    }
}
