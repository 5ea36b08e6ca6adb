//! Human-readable rendering of the payloads the CLI prints most often.
//!
//! Everything else is printed as pretty JSON.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::{self, Display, Write};

use crate::models::tado::{Device, DeviceView, TemperatureUnit, User, Zone, ZoneState};
use crate::utils::{decode, serde_enum_name};

const MISSING: &str = "-";

fn decode_as<T: DeserializeOwned>(what: &str, value: Value) -> Result<T, String> {
    decode(value).map_err(|e| format!("unexpected {} payload at {}: {}", what, e.path(), e.inner()))
}

fn or_missing<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| MISSING.to_string())
}

fn timestamp(value: Option<&DateTime<Utc>>) -> String {
    or_missing(value.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC")))
}

fn enum_name<T: serde::Serialize>(value: Option<&T>) -> String {
    or_missing(value.and_then(serde_enum_name))
}

pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn zones(value: Value) -> Result<String, String> {
    let zones: Vec<Zone> = decode_as("zones", value)?;
    let mut out = String::new();
    for (i, zone) in zones.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_zone(&mut out, zone).map_err(|e| e.to_string())?;
    }
    Ok(out)
}

fn write_zone(out: &mut String, zone: &Zone) -> fmt::Result {
    writeln!(
        out,
        "{} (ID: {})",
        zone.name.as_deref().unwrap_or(MISSING),
        or_missing(zone.id)
    )?;
    writeln!(out, "Created: {}", timestamp(zone.date_created.as_ref()))?;
    writeln!(out, "Type: {}", enum_name(zone.r#type.as_ref()))?;
    writeln!(
        out,
        "Device Types: {}",
        zone.device_types
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|t| t.join(", "))
            .unwrap_or_else(|| MISSING.to_string())
    )?;
    writeln!(out, "Devices: {}", zone.devices.as_ref().map_or(0, Vec::len))?;
    writeln!(out, "Dazzle: {}", or_missing(zone.dazzle_enabled))
}

pub fn devices(value: Value) -> Result<String, String> {
    let raw: Vec<Value> = decode_as("devices", value)?;
    let mut out = String::new();
    for (i, item) in raw.into_iter().enumerate() {
        let view = DeviceView::from_value(item)
            .map_err(|e| format!("unexpected device payload at [{}].{}: {}", i, e.path(), e.inner()))?;
        if i > 0 {
            out.push('\n');
        }
        write_device(&mut out, &view).map_err(|e| e.to_string())?;
    }
    Ok(out)
}

fn write_device(out: &mut String, view: &DeviceView) -> fmt::Result {
    match view {
        DeviceView::Gateway(d) => {
            write_device_header(out, d)?;
            writeln!(out, "Operation: {}", d.gateway_operation.as_deref().unwrap_or(MISSING))?;
            write_connection(out, d)
        }
        DeviceView::Valve(d) => {
            write_device_header(out, d)?;
            write_connection(out, d)?;
            let mounting = d.mounting_state.as_ref();
            writeln!(
                out,
                "Mounted: {} ({})",
                mounting.and_then(|m| m.value.as_deref()).unwrap_or(MISSING),
                timestamp(mounting.and_then(|m| m.timestamp.as_ref()))
            )
        }
        DeviceView::Unsupported(raw) => {
            let kind = raw.get("deviceType").and_then(Value::as_str).unwrap_or("unknown");
            writeln!(out, "Device type {} has no dedicated layout:", kind)?;
            writeln!(out, "{}", pretty(raw))
        }
    }
}

fn write_device_header(out: &mut String, d: &Device) -> fmt::Result {
    writeln!(out, "Serial: {}", d.serial_no.as_deref().unwrap_or(MISSING))?;
    writeln!(out, "Type: {}", d.device_type.as_deref().unwrap_or(MISSING))?;
    writeln!(out, "Firmware: {}", d.current_fw_version.as_deref().unwrap_or(MISSING))
}

fn write_connection(out: &mut String, d: &Device) -> fmt::Result {
    let conn = d.connection_state.as_ref();
    writeln!(
        out,
        "Connection: {} ({})",
        or_missing(conn.and_then(|c| c.value)),
        timestamp(conn.and_then(|c| c.timestamp.as_ref()))
    )
}

pub fn user(value: Value) -> Result<String, String> {
    let me: User = decode_as("user", value)?;
    let mut out = String::new();
    write_user(&mut out, &me).map_err(|e| e.to_string())?;
    Ok(out)
}

fn write_user(out: &mut String, me: &User) -> fmt::Result {
    writeln!(out, "Name: {}", me.name.as_deref().unwrap_or(MISSING))?;
    writeln!(out, "Email: {}", me.email.as_deref().unwrap_or(MISSING))?;
    writeln!(out, "Username: {}", me.username.as_deref().unwrap_or(MISSING))?;
    writeln!(out, "Locale: {}", me.locale.as_deref().unwrap_or(MISSING))?;
    let homes = me.homes.as_deref().unwrap_or(&[]);
    if homes.is_empty() {
        return writeln!(out, "Homes: {}", MISSING);
    }
    writeln!(out, "Homes:")?;
    for home in homes {
        writeln!(
            out,
            "  {} (ID: {})",
            home.name.as_deref().unwrap_or(MISSING),
            or_missing(home.id)
        )?;
    }
    Ok(())
}

pub fn zone_state(value: Value, unit: TemperatureUnit) -> Result<String, String> {
    let state: ZoneState = decode_as("zone state", value)?;
    let mut out = String::new();
    write_zone_state(&mut out, &state, unit).map_err(|e| e.to_string())?;
    Ok(out)
}

fn degrees(celsius: Option<f64>, fahrenheit: Option<f64>, unit: TemperatureUnit) -> String {
    match unit {
        TemperatureUnit::Celsius => or_missing(celsius.map(|t| format!("{:.1} °C", t))),
        TemperatureUnit::Fahrenheit => or_missing(fahrenheit.map(|t| format!("{:.1} °F", t))),
    }
}

fn write_zone_state(out: &mut String, state: &ZoneState, unit: TemperatureUnit) -> fmt::Result {
    writeln!(out, "Mode: {}", enum_name(state.tado_mode.as_ref()))?;

    let setting = state.setting.as_ref();
    let target = setting
        .and_then(|s| s.temperature.as_ref())
        .map(|t| degrees(t.celsius, t.fahrenheit, unit));
    writeln!(
        out,
        "Setting: {} power {}{}",
        enum_name(setting.and_then(|s| s.r#type.as_ref())),
        enum_name(setting.and_then(|s| s.power.as_ref())),
        target.map(|t| format!(" at {}", t)).unwrap_or_default()
    )?;
    writeln!(out, "Overlay: {}", state.overlay_type.as_deref().unwrap_or(MISSING))?;

    let sensors = state.sensor_data_points.as_ref();
    let inside = sensors.and_then(|s| s.inside_temperature.as_ref());
    writeln!(
        out,
        "Inside temperature: {} ({})",
        degrees(inside.and_then(|t| t.celsius), inside.and_then(|t| t.fahrenheit), unit),
        timestamp(inside.and_then(|t| t.timestamp.as_ref()))
    )?;
    let humidity = sensors.and_then(|s| s.humidity.as_ref());
    writeln!(
        out,
        "Humidity: {}",
        or_missing(humidity.and_then(|h| h.percentage).map(|p| format!("{:.1} %", p)))
    )?;

    let heating = state
        .activity_data_points
        .as_ref()
        .and_then(|a| a.heating_power.as_ref());
    writeln!(
        out,
        "Heating power: {}",
        or_missing(heating.and_then(|h| h.percentage).map(|p| format!("{:.0} %", p)))
    )?;
    writeln!(
        out,
        "Link: {}",
        state.link.as_ref().and_then(|l| l.state.as_deref()).unwrap_or(MISSING)
    )
}
