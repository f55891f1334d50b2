// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Climate sensors: temperature, humidity and pressure.
//!
//! Semantic state layouts:
//!
//! - Temp+Hum+Baro: `temperature;humidity;humidity_status;pressure;forecast`
//! - Temp+Hum: `temperature;humidity;humidity_status`
//!
//! Readings are written with two decimals. Humidity status and forecast are
//! not reported by these devices and are always written as `0`.

use super::battery::{set_battery_percent, set_vendor_battery};
use super::{AdapterKind, Projection, SensorModel, SensorState, numeric_fields};
use crate::directory::{DeviceRecord, TypeDescriptor};
use crate::telemetry::{AttributeRule, AttributeTable};

const TEMPERATURE_PATH: &str = "Temperature Measurement/Report Attributes/MeasuredValue";
const HUMIDITY_PATH: &str = "Relative Humidity Measurement/Report Attributes/MeasuredValue";
const PRESSURE_PATH: &str = "Pressure Measurement/Report Attributes/ScaledValue";
const BATTERY_REMAINING_PATH: &str =
    "Power Configuration/Report Attributes/BatteryPercentageRemaining";

/// Aqara weather sensor readings (`lumi.weather`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Weather {
    /// Temperature in °C.
    pub temperature: f64,
    /// Relative humidity in %.
    pub humidity: f64,
    /// Pressure in hPa.
    pub pressure: f64,
}

static WEATHER_PRIMARY: AttributeTable<SensorState<Weather>> = AttributeTable::new(&[
    (
        TEMPERATURE_PATH,
        AttributeRule::scaled(0.01, |s, v| s.model.temperature = v),
    ),
    (
        HUMIDITY_PATH,
        AttributeRule::scaled(0.01, |s, v| s.model.humidity = v),
    ),
    (
        PRESSURE_PATH,
        AttributeRule::scaled(0.1, |s, v| s.model.pressure = v),
    ),
]);

static WEATHER_VENDOR: AttributeTable<SensorState<Weather>> = AttributeTable::new(&[
    ("1", AttributeRule::scaled(0.001, set_vendor_battery)),
    ("100", AttributeRule::scaled(0.01, |s, v| s.model.temperature = v)),
    ("101", AttributeRule::scaled(0.01, |s, v| s.model.humidity = v)),
    ("102", AttributeRule::scaled(0.01, |s, v| s.model.pressure = v)),
]);

impl SensorModel for Weather {
    const KIND: AdapterKind = AdapterKind::TempHumBaro;
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::TEMP_HUM_BARO;
    const MODELS: &'static [&'static str] = &["lumi.weather"];

    // Any subtype of the Temp+Hum+Baro family is handled the same way.
    fn matches_record(record: &DeviceRecord) -> bool {
        record.descriptor.device_type == Self::DESCRIPTOR.device_type
    }

    fn from_record(record: &DeviceRecord) -> Self {
        let [temperature, humidity, _status, pressure] = numeric_fields(&record.semantic_state);
        Self {
            temperature,
            humidity,
            pressure,
        }
    }

    fn primary_table() -> &'static AttributeTable<SensorState<Self>> {
        &WEATHER_PRIMARY
    }

    fn vendor_table() -> Option<&'static AttributeTable<SensorState<Self>>> {
        Some(&WEATHER_VENDOR)
    }

    fn project(&self) -> Projection {
        Projection {
            discrete: 0,
            semantic: format!(
                "{:.2};{:.2};0;{:.2};0",
                self.temperature, self.humidity, self.pressure
            ),
        }
    }
}

/// Temperature and humidity readings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TempHum {
    /// Temperature in °C.
    pub temperature: f64,
    /// Relative humidity in %.
    pub humidity: f64,
}

static TEMP_HUM_PRIMARY: AttributeTable<SensorState<TempHum>> = AttributeTable::new(&[
    (
        TEMPERATURE_PATH,
        AttributeRule::scaled(0.01, |s, v| s.model.temperature = v),
    ),
    (
        HUMIDITY_PATH,
        AttributeRule::scaled(0.01, |s, v| s.model.humidity = v),
    ),
    (
        BATTERY_REMAINING_PATH,
        AttributeRule::scaled(0.01, set_battery_percent),
    ),
]);

impl SensorModel for TempHum {
    const KIND: AdapterKind = AdapterKind::TempHum;
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::TEMP_HUM;
    const MODELS: &'static [&'static str] = &["lumi.sensor_ht", "lumi.sens"];

    fn matches_record(record: &DeviceRecord) -> bool {
        record.descriptor.device_type == Self::DESCRIPTOR.device_type
    }

    fn from_record(record: &DeviceRecord) -> Self {
        let [temperature, humidity] = numeric_fields(&record.semantic_state);
        Self {
            temperature,
            humidity,
        }
    }

    fn primary_table() -> &'static AttributeTable<SensorState<Self>> {
        &TEMP_HUM_PRIMARY
    }

    fn project(&self) -> Projection {
        Projection {
            discrete: 0,
            semantic: format!("{:.2};{:.2};0", self.temperature, self.humidity),
        }
    }
}
