// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic grammar and the MQTT transport.
//!
//! AqaraHub publishes under two topic shapes:
//!
//! ```text
//! <root>/<device id>/linkquality
//! <root>/<device id>/<endpoint>/in/<cluster>/<command>/<attribute>
//! ```
//!
//! [`Topic`] splits a raw topic into these parts. [`MqttBridge`] (feature
//! `mqtt`) subscribes to `<root>/#` and forwards every publish to a
//! [`Dispatcher`](crate::manager::Dispatcher).

#[cfg(feature = "mqtt")]
mod mqtt;
mod topic;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttBridge, MqttBridgeBuilder};
pub use topic::Topic;
