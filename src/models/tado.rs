//! Types exchanged with the tado° API.
//!
//! Resource responses are handed to callers untouched as `serde_json::Value`.
//! What lives here:
//! - identifier newtypes used to build request paths,
//! - request payloads (overlay, early start),
//! - read-only views of the entities the CLI renders. Every field is optional so that
//!   a sparse or newer payload still renders.

use chrono::{DateTime, Utc};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HomeId(pub i64);

impl fmt::Display for HomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub i64);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =====================
// Core enums
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Power {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    AirConditioning,
    Heating,
    HotWater,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HomePresence {
    Home,
    Away,
}

// =====================
// Request payloads
// =====================

/// Requested temperatures strictly below this value switch heating off instead.
pub const HEATING_OFF_BELOW: f64 = 5.0;

/// When a manual overlay ends.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Termination {
    /// Stays until cleared with `end_manual_control`.
    #[default]
    Manual,
    /// Reverts at the next scheduled transition.
    #[serde(rename = "TADO_MODE")]
    Auto,
    /// Reverts after a fixed number of seconds.
    Timer {
        #[serde(rename = "durationInSeconds")]
        duration_in_seconds: u64,
    },
}

impl FromStr for Termination {
    type Err = String;

    /// Accepts `MANUAL`, `AUTO` or a duration in seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(Termination::Manual),
            "AUTO" => Ok(Termination::Auto),
            other => other
                .trim()
                .parse::<u64>()
                .map(|duration_in_seconds| Termination::Timer { duration_in_seconds })
                .map_err(|_| format!("expected MANUAL, AUTO or a duration in seconds, got {:?}", other)),
        }
    }
}

/// Temperature keyed by unit, e.g. `{"celsius": 21.0}`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureValue {
    Celsius(f64),
    Fahrenheit(f64),
}

impl TemperatureValue {
    pub fn new(value: f64, unit: TemperatureUnit) -> Self {
        match unit {
            TemperatureUnit::Celsius => TemperatureValue::Celsius(value),
            TemperatureUnit::Fahrenheit => TemperatureValue::Fahrenheit(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatingSetting {
    #[serde(rename = "type")]
    pub r#type: ZoneType,
    pub power: Power,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<TemperatureValue>,
}

/// Body of `PUT homes/{home}/zones/{zone}/overlay`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayRequest {
    pub setting: HeatingSetting,
    pub termination: Termination,
}

impl OverlayRequest {
    /// Heating override at `temperature`, or heating off when it is below [`HEATING_OFF_BELOW`].
    pub fn heating(temperature: f64, unit: TemperatureUnit, termination: Termination) -> Self {
        let setting = if temperature < HEATING_OFF_BELOW {
            HeatingSetting {
                r#type: ZoneType::Heating,
                power: Power::Off,
                temperature: None,
            }
        } else {
            HeatingSetting {
                r#type: ZoneType::Heating,
                power: Power::On,
                temperature: Some(TemperatureValue::new(temperature, unit)),
            }
        };
        OverlayRequest { setting, termination }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EarlyStart {
    pub enabled: bool,
}

// =====================
// Read-only views
// =====================

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HomeBase {
    pub id: Option<HomeId>,
    pub name: Option<String>,
}

/// `GET me`
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub locale: Option<String>,
    pub homes: Option<Vec<HomeBase>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: Option<ZoneId>,
    pub name: Option<String>,
    pub r#type: Option<ZoneType>,
    pub date_created: Option<DateTime<Utc>>,
    pub device_types: Option<Vec<String>>,
    pub devices: Option<Vec<Value>>,
    pub dazzle_enabled: Option<bool>,
}

// Zone state

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Temperature {
    pub celsius: Option<f64>,
    pub fahrenheit: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureDataPoint {
    pub celsius: Option<f64>,
    pub fahrenheit: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PercentageDataPoint {
    pub percentage: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SensorDataPoints {
    pub inside_temperature: Option<TemperatureDataPoint>,
    pub humidity: Option<PercentageDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDataPoints {
    pub heating_power: Option<PercentageDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSetting {
    pub r#type: Option<ZoneType>,
    pub power: Option<Power>,
    pub temperature: Option<Temperature>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStateLink {
    pub state: Option<String>, // ONLINE/OFFLINE
}

/// `GET homes/{home}/zones/{zone}/state`
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    pub tado_mode: Option<HomePresence>,
    pub setting: Option<ZoneSetting>,
    pub overlay_type: Option<String>,
    pub link: Option<ZoneStateLink>,
    pub activity_data_points: Option<ActivityDataPoints>,
    pub sensor_data_points: Option<SensorDataPoints>,
}

// Devices

pub const GATEWAY_DEVICE_TYPE: &str = "GW03";
pub const VALVE_DEVICE_TYPE: &str = "VA01";

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConnectionState {
    pub value: Option<bool>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMountingState {
    pub value: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_type: Option<String>,
    pub serial_no: Option<String>,
    pub short_serial_no: Option<String>,
    pub current_fw_version: Option<String>,
    pub gateway_operation: Option<String>,
    pub connection_state: Option<DeviceConnectionState>,
    pub mounting_state: Option<DeviceMountingState>,
}

/// A device from `GET homes/{home}/devices`, split by hardware family.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceView {
    Gateway(Device),
    Valve(Device),
    /// Any other device type, kept exactly as received.
    Unsupported(Value),
}

impl DeviceView {
    pub fn from_value(value: Value) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
        let device_type = value.get("deviceType").and_then(Value::as_str).map(str::to_owned);
        match device_type.as_deref() {
            Some(GATEWAY_DEVICE_TYPE) => serde_path_to_error::deserialize(value).map(DeviceView::Gateway),
            Some(VALVE_DEVICE_TYPE) => serde_path_to_error::deserialize(value).map(DeviceView::Valve),
            _ => Ok(DeviceView::Unsupported(value)),
        }
    }
}
