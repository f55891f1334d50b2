// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Message dispatch and transient-state timers.
//!
//! The [`Dispatcher`] is the entry point for every inbound message. It parses
//! the topic, resolves or registers the owning device, runs the message
//! through the device's adapter, and arms the [`DebounceTimers`] when a
//! motion or vibration detection comes in.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use aqara_bridge::directory::{DeviceDirectory, InMemoryDirectory};
//! use aqara_bridge::manager::{BridgeConfig, Dispatcher};
//!
//! let directory = Arc::new(InMemoryDirectory::new());
//! let dispatcher = Dispatcher::new(
//!     BridgeConfig::default().with_debounce(false),
//!     directory.clone(),
//!     directory.clone(),
//! );
//!
//! let device = "00158D0001E5A1B2";
//! dispatcher.on_data(
//!     &format!("AqaraHub/{device}/1/in/Basic/Report Attributes/ModelIdentifier"),
//!     br#"{"type":"string","value":"lumi.sensor_magnet.aq2"}"#,
//! );
//! dispatcher.on_data(
//!     &format!("AqaraHub/{device}/1/in/OnOff/Report Attributes/OnOff"),
//!     br#"{"type":"bool","value":true}"#,
//! );
//!
//! let record = directory.find_by_device_id(device).unwrap();
//! assert_eq!(record.semantic_state, "Open");
//! ```

mod bridge_config;
mod debounce;
mod dispatcher;

pub use bridge_config::{BridgeConfig, DEFAULT_QUIET_PERIOD, DEFAULT_ROOT_TOPIC};
pub use debounce::{DebounceTimers, TimerGuard};
pub use dispatcher::{DispatchOutcome, Dispatcher, IgnoreReason};
