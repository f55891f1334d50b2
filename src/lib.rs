// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Aqara Bridge - maps AqaraHub MQTT attribute reports onto device records.
//!
//! AqaraHub publishes Zigbee attribute reports from Xiaomi/Aqara sensors as
//! MQTT messages. This library routes each message to the device it concerns,
//! decodes and calibrates the reported value, and writes the resulting state
//! into a device directory supplied by the host application.
//!
//! # Supported Devices
//!
//! - Weather sensor (`lumi.weather`): temperature, humidity, pressure
//! - Temperature/humidity sensor (`lumi.sensor_ht`)
//! - Motion sensor (`lumi.sensor_motion.aq2`), auto-cleared after a quiet period
//! - Door/window contact (`lumi.sensor_magnet.aq2`)
//! - Vibration sensor (`lumi.vibration.aq1`), auto-cleared after a quiet period
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use aqara_bridge::{BridgeConfig, DeviceDirectory, Dispatcher, InMemoryDirectory};
//!
//! let directory = Arc::new(InMemoryDirectory::new());
//! let dispatcher = Dispatcher::new(
//!     BridgeConfig::default().with_debounce(false),
//!     directory.clone(),
//!     directory.clone(),
//! );
//!
//! // A model identifier report registers the device.
//! dispatcher.on_data(
//!     "AqaraHub/00158D0002786756/1/in/Basic/Report Attributes/ModelIdentifier",
//!     br#"{"type":"string","value":"lumi.weather"}"#,
//! );
//!
//! // Attribute reports then update its record.
//! dispatcher.on_data(
//!     "AqaraHub/00158D0002786756/1/in/Temperature Measurement/Report Attributes/MeasuredValue",
//!     br#"{"type":"int16","value":2128}"#,
//! );
//!
//! let record = directory.find_by_device_id("00158D0002786756").unwrap();
//! assert_eq!(record.semantic_state, "21.28;0.00;0;0.00;0");
//! ```
//!
//! ## Live MQTT Feed
//!
//! ```no_run
//! use std::sync::Arc;
//! use aqara_bridge::{BridgeConfig, Dispatcher, InMemoryDirectory};
//! use aqara_bridge::protocol::MqttBridge;
//!
//! #[tokio::main]
//! async fn main() -> aqara_bridge::Result<()> {
//!     let directory = Arc::new(InMemoryDirectory::new());
//!     let dispatcher = Arc::new(Dispatcher::new(
//!         BridgeConfig::default(),
//!         directory.clone(),
//!         directory,
//!     ));
//!
//!     let _bridge = MqttBridge::connect("mqtt://192.168.1.50:1883", dispatcher).await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod directory;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod telemetry;

pub use adapter::{AdapterKind, AdapterRegistry, DeviceAdapter, MessageOutcome, Projection};
pub use directory::{
    DeviceDirectory, DeviceFactory, DeviceRecord, InMemoryDirectory, NewDevice, RecordUpdate,
    TypeDescriptor,
};
pub use error::{DirectoryError, Error, PayloadError, ProtocolError, Result, TransformError};
pub use manager::{BridgeConfig, DebounceTimers, DispatchOutcome, Dispatcher, IgnoreReason};
pub use protocol::Topic;
pub use telemetry::{DecodedValue, decode};
