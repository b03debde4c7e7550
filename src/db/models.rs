//! Diesel model structs for device owners, devices and the telemetry they report.
//!
//! Messages and devices are linked many-to-many through `device_message_devices`;
//! a message may be linked to no device at all.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema;

pub const DEFAULT_GIVEN_NAME: &str = "Poolguy Device";
pub const DEFAULT_TEMPERATURE_VALUE: f64 = 0.0;
/// Percentage, nominally 0-100. Not range-checked anywhere.
pub const DEFAULT_BATTERY_LEVEL: i32 = 0;

// Values the firmware writes to `device_messages.unit`.
pub mod units {
    pub const CELSIUS: &str = "C";
    pub const FAHRENHEIT: &str = "F";
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::users)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
}

impl NewUser {
    pub fn new(username: impl Into<String>) -> Self {
        NewUser {
            username: username.into(),
            email: None,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::devices)]
#[diesel(belongs_to(User, foreign_key = owner_id))]
pub struct Device {
    pub id: i64,
    pub owner_id: i64,
    pub device_id: String,
    pub given_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::devices)]
pub struct NewDevice {
    pub owner_id: i64,
    pub device_id: String,
    pub given_name: String,
}

impl NewDevice {
    /// A device for `owner_id` with a freshly generated identifier and the default name.
    ///
    /// Provisioned hardware carries its own id from flashing; use
    /// [`NewDevice::with_device_id`] to record it instead.
    pub fn for_owner(owner_id: i64) -> Self {
        NewDevice {
            owner_id,
            device_id: generate_device_id(),
            given_name: DEFAULT_GIVEN_NAME.to_string(),
        }
    }

    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    pub fn with_given_name(mut self, given_name: impl Into<String>) -> Self {
        self.given_name = given_name.into();
        self
    }
}

/// New UUIDv4 string, generated per call.
pub fn generate_device_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::device_messages)]
pub struct DeviceMessage {
    pub id: i64,
    pub temperature_value: f64,
    pub battery_level: i32,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}

impl DeviceMessage {
    pub fn temperature_unit(&self) -> Result<TemperatureUnit, String> {
        self.unit.parse()
    }

    /// The reading in degrees Celsius, if the stored unit is recognised.
    pub fn temperature_celsius(&self) -> Option<f64> {
        self.temperature_unit()
            .ok()
            .map(|unit| unit.to_celsius(self.temperature_value))
    }
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::device_messages)]
pub struct NewDeviceMessage {
    pub temperature_value: f64,
    pub battery_level: i32,
    pub unit: String,
    /// `None` lets the database stamp the insert time.
    pub created_at: Option<DateTime<Utc>>,
}

impl Default for NewDeviceMessage {
    fn default() -> Self {
        NewDeviceMessage {
            temperature_value: DEFAULT_TEMPERATURE_VALUE,
            battery_level: DEFAULT_BATTERY_LEVEL,
            unit: units::CELSIUS.to_string(),
            created_at: None,
        }
    }
}

impl NewDeviceMessage {
    pub fn new(temperature_value: f64) -> Self {
        NewDeviceMessage {
            temperature_value,
            ..Default::default()
        }
    }

    pub fn with_battery_level(mut self, battery_level: i32) -> Self {
        self.battery_level = battery_level;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

// Join table: device_message_devices
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::device_message_devices)]
#[diesel(primary_key(device_message_id, device_id))]
#[diesel(belongs_to(DeviceMessage))]
#[diesel(belongs_to(Device))]
pub struct DeviceMessageDevice {
    pub device_message_id: i64,
    pub device_id: i64,
}

/// Temperature scale of a reading. The sensor firmware accepts either case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => units::CELSIUS,
            TemperatureUnit::Fahrenheit => units::FAHRENHEIT,
        }
    }

    pub fn to_celsius(&self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    pub fn from_celsius(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "C" | "c" => Ok(TemperatureUnit::Celsius),
            "F" | "f" => Ok(TemperatureUnit::Fahrenheit),
            other => Err(format!("unknown temperature unit: {:?}", other)),
        }
    }
}

impl Display for TemperatureUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stored_message(temperature_value: f64, unit: &str) -> DeviceMessage {
        DeviceMessage {
            id: 1,
            temperature_value,
            battery_level: 80,
            unit: unit.to_string(),
            created_at: Utc.with_ymd_and_hms(2020, 11, 26, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn devices_without_explicit_id_get_distinct_ids() {
        let first = NewDevice::for_owner(7);
        let second = NewDevice::for_owner(7);
        assert_ne!(first.device_id, second.device_id);
        assert!(Uuid::parse_str(&first.device_id).is_ok());
        assert!(first.device_id.len() <= 255);
    }

    #[test]
    fn new_device_uses_default_name_unless_overridden() {
        let device = NewDevice::for_owner(1);
        assert_eq!(device.given_name, "Poolguy Device");
        assert_eq!(device.owner_id, 1);

        let named = NewDevice::for_owner(1)
            .with_device_id("PG-0001")
            .with_given_name("Backyard pool");
        assert_eq!(named.device_id, "PG-0001");
        assert_eq!(named.given_name, "Backyard pool");
    }

    #[test]
    fn message_defaults() {
        let msg = NewDeviceMessage::default();
        assert_eq!(msg.temperature_value, 0.0);
        assert_eq!(msg.battery_level, 0);
        assert_eq!(msg.unit, "C");
        assert!(msg.created_at.is_none());

        let reading = NewDeviceMessage::new(24.5);
        assert_eq!(reading.temperature_value, 24.5);
        assert_eq!(reading.battery_level, 0);
        assert_eq!(reading.unit, "C");
    }

    #[test]
    fn battery_level_is_not_range_checked() {
        let msg = NewDeviceMessage::new(20.0).with_battery_level(150);
        assert_eq!(msg.battery_level, 150);
    }

    #[test]
    fn parses_units_in_either_case() {
        assert_eq!("C".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Celsius));
        assert_eq!("c".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Celsius));
        assert_eq!("F".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Fahrenheit));
        assert_eq!("f".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Fahrenheit));
        assert!("K".parse::<TemperatureUnit>().is_err());
    }

    #[test]
    fn converts_stored_readings_to_celsius() {
        let fahrenheit = stored_message(77.0, "F");
        let celsius = fahrenheit.temperature_celsius().unwrap();
        assert!((celsius - 25.0).abs() < 1e-9);

        assert_eq!(stored_message(21.5, "C").temperature_celsius(), Some(21.5));
        assert_eq!(stored_message(21.5, "kelvin").temperature_celsius(), None);
    }

    #[test]
    fn fahrenheit_round_trips_through_celsius() {
        let unit = TemperatureUnit::Fahrenheit;
        assert!((unit.from_celsius(100.0) - 212.0).abs() < 1e-9);
        assert_eq!(unit.to_string(), "F");
    }
}
