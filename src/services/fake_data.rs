use crate::db::models::{Device, DeviceMessage, NewDevice, NewDeviceMessage, NewUser, TemperatureUnit};
use crate::services::{devices, ingest, owners};
use crate::utils::{battery_percent_from_voltage, describe_battery_level, BATTERY_MAX_VOLTS, BATTERY_MIN_VOLTS};
use chrono::{DateTime, Duration, Timelike, Utc};
use diesel::PgConnection;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f64::consts::PI;

pub const DEMO_USERNAME: &str = "poolguy-demo";
const STEP_MINUTES: i64 = 15;

struct DemoDevice {
    device_id: &'static str,
    given_name: &'static str,
    unit: TemperatureUnit,
    base_temp_c: f64,
    diurnal_amplitude_c: f64,
    /// Volts lost per day on battery.
    drain_per_day: f64,
}

const DEMO_DEVICES: [DemoDevice; 3] = [
    DemoDevice {
        device_id: "PG-DEMO-0001",
        given_name: "Backyard Pool",
        unit: TemperatureUnit::Celsius,
        base_temp_c: 24.0,
        diurnal_amplitude_c: 1.6,
        drain_per_day: 0.09,
    },
    DemoDevice {
        device_id: "PG-DEMO-0002",
        given_name: "Hot Tub",
        unit: TemperatureUnit::Fahrenheit,
        base_temp_c: 37.5,
        diurnal_amplitude_c: 0.4,
        drain_per_day: 0.14,
    },
    DemoDevice {
        device_id: "PG-DEMO-0003",
        given_name: "Lake Dock",
        unit: TemperatureUnit::Celsius,
        base_temp_c: 17.0,
        diurnal_amplitude_c: 0.9,
        drain_per_day: 0.05,
    },
];

/// Latest reading per demo device, logged once seeding completes.
#[derive(Debug, Serialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub given_name: String,
    pub temperature_value: f64,
    pub unit: String,
    pub battery_level: i32,
    pub battery: &'static str,
    pub reported_at: DateTime<Utc>,
}

impl DeviceSummary {
    fn new(device: &Device, message: &DeviceMessage) -> Self {
        DeviceSummary {
            device_id: device.device_id.clone(),
            given_name: device.given_name.clone(),
            temperature_value: message.temperature_value,
            unit: message.unit.clone(),
            battery_level: message.battery_level,
            battery: describe_battery_level(message.battery_level),
            reported_at: message.created_at,
        }
    }
}

/// Seed `days` of demo history ending at the current quarter hour.
///
/// Re-running only adds readings newer than what each demo device already has.
pub fn run(conn: &mut PgConnection, days: u32) -> Result<Vec<DeviceSummary>, String> {
    seed(conn, days, align_to_step(Utc::now()))
}

fn seed(conn: &mut PgConnection, days: u32, end: DateTime<Utc>) -> Result<Vec<DeviceSummary>, String> {
    let start = window_start(end, days)?;
    let owner = owners::ensure_user(conn, &NewUser::new(DEMO_USERNAME))?;
    let demo_devices = ensure_devices(conn, owner.id)?;

    let mut rng = StdRng::seed_from_u64(0x9001_C0DE_2020_1126u64);

    info!(
        "Demo data: generating {} day(s) of readings for user {} from {} to {} (devices={})",
        days,
        owner.username,
        start,
        end,
        demo_devices.len()
    );

    let mut inserted: usize = 0;
    for (profile, device) in DEMO_DEVICES.iter().zip(demo_devices.iter()) {
        let seeded_until = ingest::latest_message_for_device(conn, device.id)?.map(|m| m.created_at);
        let mut volts = BATTERY_MAX_VOLTS;
        let mut batch = Vec::with_capacity(samples_per_day());
        let mut ts = start;
        let mut current_day = start.date_naive();
        let step = Duration::minutes(STEP_MINUTES);
        let drain_per_step = profile.drain_per_day / samples_per_day() as f64;

        while ts < end {
            if ts.date_naive() != current_day {
                inserted += ingest::record_messages(conn, &batch, &[device.id])?;
                batch.clear();
                current_day = ts.date_naive();
            }

            let day_fraction = ts.time().num_seconds_from_midnight() as f64 / 86_400.0;
            let water_c = compute_water_temp(profile, day_fraction, &mut rng);
            volts = discharge(volts, drain_per_step, &mut rng);

            // Readings already stored still advance the RNG so later values match a fresh run.
            if seeded_until.is_none_or(|until| ts > until) {
                batch.push(
                    NewDeviceMessage::new(round_tenths(profile.unit.from_celsius(water_c)))
                        .with_battery_level(battery_percent_from_voltage(volts))
                        .with_unit(profile.unit.as_str())
                        .with_created_at(ts),
                );
            }
            ts += step;
        }
        inserted += ingest::record_messages(conn, &batch, &[device.id])?;

        info!(
            "Demo data: device {} (\"{}\") seeded, battery at {:.3}V",
            device.device_id, device.given_name, volts
        );
    }

    info!("Demo data: complete (messages={})", inserted);

    let latest = ingest::latest_messages_for_owner(conn, owner.id)?;
    Ok(latest
        .iter()
        .map(|(device, message)| DeviceSummary::new(device, message))
        .collect())
}

fn ensure_devices(conn: &mut PgConnection, owner_id: i64) -> Result<Vec<Device>, String> {
    let existing = devices::devices_for_owner(conn, owner_id)?;
    let mut out = Vec::with_capacity(DEMO_DEVICES.len());
    for profile in &DEMO_DEVICES {
        match existing.iter().find(|d| d.device_id == profile.device_id) {
            Some(device) => out.push(device.clone()),
            None => {
                let new_device = NewDevice::for_owner(owner_id)
                    .with_device_id(profile.device_id)
                    .with_given_name(profile.given_name);
                out.push(devices::register_device(conn, &new_device)?);
            }
        }
    }
    Ok(out)
}

fn window_start(end: DateTime<Utc>, days: u32) -> Result<DateTime<Utc>, String> {
    Duration::try_days(i64::from(days))
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| format!("{} day(s) of demo data reach before the earliest representable time", days))
}

fn align_to_step(ts: DateTime<Utc>) -> DateTime<Utc> {
    let step_seconds = STEP_MINUTES * 60;
    let aligned = (ts.timestamp() / step_seconds) * step_seconds;
    DateTime::<Utc>::from_timestamp(aligned, 0).unwrap_or(ts)
}

fn samples_per_day() -> usize {
    (24 * 60 / STEP_MINUTES) as usize
}

// Water lags air: warmest mid-afternoon, coolest just before dawn.
fn compute_water_temp(profile: &DemoDevice, day_fraction: f64, rng: &mut StdRng) -> f64 {
    let diurnal = ((day_fraction - 0.4) * 2.0 * PI).sin() * profile.diurnal_amplitude_c;
    let noise = rng.random_range(-0.15..=0.15);
    // The DS18B20 path reports negative readings as 0.0.
    (profile.base_temp_c + diurnal + noise).max(0.0)
}

/// Drain the cell by one step; an emptied cell is swapped for a charged one.
fn discharge(volts: f64, drain_per_step: f64, rng: &mut StdRng) -> f64 {
    let jitter = rng.random_range(0.8..=1.2);
    let next = volts - drain_per_step * jitter;
    if next <= BATTERY_MIN_VOLTS {
        BATTERY_MAX_VOLTS
    } else {
        next
    }
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;
    use crate::schema;
    use chrono::TimeZone;
    use diesel::prelude::*;

    fn message_count(conn: &mut PgConnection) -> i64 {
        schema::device_messages::table.count().get_result(conn).unwrap()
    }

    #[test]
    fn aligns_to_quarter_hours() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 13, 52, 41).unwrap();
        assert_eq!(align_to_step(ts), Utc.with_ymd_and_hms(2024, 6, 1, 13, 45, 0).unwrap());
        assert_eq!(samples_per_day(), 96);
    }

    #[test]
    fn water_temperature_stays_near_profile() {
        let mut rng = StdRng::seed_from_u64(1);
        for profile in &DEMO_DEVICES {
            for step in 0..samples_per_day() {
                let day_fraction = step as f64 / samples_per_day() as f64;
                let temp = compute_water_temp(profile, day_fraction, &mut rng);
                let bound = profile.diurnal_amplitude_c + 0.15 + 1e-9;
                assert!((temp - profile.base_temp_c).abs() <= bound, "temp {} out of range", temp);
            }
        }
    }

    #[test]
    fn discharged_battery_is_replaced() {
        let mut rng = StdRng::seed_from_u64(2);
        let drained = discharge(BATTERY_MIN_VOLTS + 0.001, 0.1, &mut rng);
        assert_eq!(drained, BATTERY_MAX_VOLTS);

        let mut rng = StdRng::seed_from_u64(3);
        let partial = discharge(BATTERY_MAX_VOLTS, 0.01, &mut rng);
        assert!(partial < BATTERY_MAX_VOLTS && partial > BATTERY_MAX_VOLTS - 0.02);
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(round_tenths(24.349), 24.3);
        assert_eq!(round_tenths(18.06), 18.1);
    }

    #[test]
    fn window_start_rejects_unrepresentable_spans() {
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(window_start(end, 2).unwrap(), Utc.with_ymd_and_hms(2024, 5, 30, 12, 0, 0).unwrap());
        assert!(window_start(end, u32::MAX).is_err());
    }

    #[test]
    fn reseeding_only_adds_newer_readings() {
        let Some(mut conn) = test_support::connection() else {
            return;
        };
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let before = message_count(&mut conn);

        seed(&mut conn, 1, end).unwrap();
        let seeded = message_count(&mut conn);
        assert_eq!(seeded - before, (DEMO_DEVICES.len() * samples_per_day()) as i64);

        seed(&mut conn, 1, end).unwrap();
        assert_eq!(message_count(&mut conn), seeded);

        // One hour later: four new quarter-hour readings per device.
        let summary = seed(&mut conn, 1, end + Duration::hours(1)).unwrap();
        assert_eq!(message_count(&mut conn), seeded + (DEMO_DEVICES.len() * 4) as i64);
        for device in &summary {
            assert_eq!(device.reported_at, end + Duration::minutes(45));
        }
    }

    #[test]
    fn seeds_each_demo_device_once() {
        let Some(mut conn) = test_support::connection() else {
            return;
        };
        let summary = run(&mut conn, 1).unwrap();
        assert_eq!(summary.len(), DEMO_DEVICES.len());
        let hot_tub = summary.iter().find(|s| s.device_id == "PG-DEMO-0002").unwrap();
        assert_eq!(hot_tub.unit, "F");
        assert!((0..=100).contains(&hot_tub.battery_level));

        // A second run reuses the registered devices.
        run(&mut conn, 1).unwrap();
        let owner = owners::ensure_user(&mut conn, &NewUser::new(DEMO_USERNAME)).unwrap();
        assert_eq!(devices::devices_for_owner(&mut conn, owner.id).unwrap().len(), DEMO_DEVICES.len());
    }
}
