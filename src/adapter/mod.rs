// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device adapters: per-kind projections of attribute reports onto records.
//!
//! An adapter is a short-lived facade. It is bound to one directory record for
//! the duration of a single message, decodes the payload through the kind's
//! attribute tables, and writes the record back only when the projected state
//! differs from what is stored.
//!
//! # Architecture
//!
//! ```text
//! <root>/<id>/linkquality                      → signal = floor(lq / 10)
//! <root>/<id>/<ep>/in/<primary path>           → primary table rule
//! <root>/<id>/<ep>/in/Basic/.../0xFF01         → vendor table, one write per block
//!                     ↓
//!              Adapter::update()
//!                     ↓
//!   projection unchanged? → skip   else → DeviceDirectory::update_record
//! ```
//!
//! Each kind is a [`SensorModel`]; [`AdapterKind`] is the closed list of kinds
//! in resolution priority order. Adding a kind means adding a model, a variant,
//! and an entry in [`AdapterKind::ALL`].

mod battery;
mod binary;
mod climate;
pub mod registry;

pub use battery::{percent_from_millivolts, percent_from_volts, signal_from_link_quality};
pub use binary::{Contact, Motion, Vibration};
pub use climate::{TempHum, Weather};
pub use registry::AdapterRegistry;

use std::fmt;

use crate::directory::{DeviceDirectory, DeviceRecord, RecordUpdate, TypeDescriptor};
use crate::error::{DirectoryError, PayloadError, Result};
use crate::protocol::Topic;
use crate::telemetry::{self, AttributeTable};

/// Topic path (after the device id) of link-quality reports.
pub const LINK_QUALITY_PATH: &str = "linkquality";

/// Inbound attribute path of the Xiaomi aggregated attribute block.
pub const VENDOR_BLOCK_PATH: &str = "Basic/Report Attributes/0xFF01";

/// Inbound attribute paths that carry a model identifier.
pub const MODEL_IDENTIFIER_PATHS: [&str; 2] = [
    "Basic/Report Attributes/ModelIdentifier",
    "Basic/Read Attributes Response/ModelIdentifier",
];

/// The closed set of adapter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Temperature, humidity and barometric pressure (Aqara weather sensor).
    TempHumBaro,
    /// Temperature and humidity.
    TempHum,
    /// Occupancy sensor with auto-clear.
    MotionSensor,
    /// Door/window contact.
    DoorSensor,
    /// Vibration sensor with auto-clear.
    VibrationSensor,
}

impl AdapterKind {
    /// Every kind, in resolution priority order.
    pub const ALL: [Self; 5] = [
        Self::TempHumBaro,
        Self::TempHum,
        Self::MotionSensor,
        Self::DoorSensor,
        Self::VibrationSensor,
    ];

    /// Returns a human-readable name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::TempHumBaro => "Temp+Hum+Baro",
            Self::TempHum => "Temp+Hum",
            Self::MotionSensor => "Motion Sensor",
            Self::DoorSensor => "Door Contact",
            Self::VibrationSensor => "Vibration Sensor",
        }
    }

    /// Returns the descriptor new records of this kind are created with.
    #[must_use]
    pub fn descriptor(self) -> TypeDescriptor {
        match self {
            Self::TempHumBaro => Weather::DESCRIPTOR,
            Self::TempHum => TempHum::DESCRIPTOR,
            Self::MotionSensor => Motion::DESCRIPTOR,
            Self::DoorSensor => Contact::DESCRIPTOR,
            Self::VibrationSensor => Vibration::DESCRIPTOR,
        }
    }

    /// Returns the model identifiers this kind claims.
    #[must_use]
    pub fn model_signatures(self) -> &'static [&'static str] {
        match self {
            Self::TempHumBaro => Weather::MODELS,
            Self::TempHum => TempHum::MODELS,
            Self::MotionSensor => Motion::MODELS,
            Self::DoorSensor => Contact::MODELS,
            Self::VibrationSensor => Vibration::MODELS,
        }
    }

    /// Returns true if records of this kind auto-clear through the debounce timers.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, Self::MotionSensor | Self::VibrationSensor)
    }

    /// Returns true if `record` was persisted as this kind.
    #[must_use]
    pub fn matches_directory_record(self, record: &DeviceRecord) -> bool {
        match self {
            Self::TempHumBaro => Weather::matches_record(record),
            Self::TempHum => TempHum::matches_record(record),
            Self::MotionSensor => Motion::matches_record(record),
            Self::DoorSensor => Contact::matches_record(record),
            Self::VibrationSensor => Vibration::matches_record(record),
        }
    }

    /// Returns this kind's descriptor if `model` is one of its signatures.
    #[must_use]
    pub fn matches_model(self, model: &str) -> Option<TypeDescriptor> {
        self.model_signatures()
            .contains(&model)
            .then(|| self.descriptor())
    }

    /// Returns this kind's descriptor if the message identifies its model.
    ///
    /// Only model-identifier topics are considered; anything else, including a
    /// payload that fails to decode, yields `None`.
    #[must_use]
    pub fn matches_discovery_payload(
        self,
        topic: &Topic,
        payload: &[u8],
    ) -> Option<TypeDescriptor> {
        discovered_model(topic, payload).and_then(|model| self.matches_model(&model))
    }

    /// Binds an adapter of this kind to `record`.
    #[must_use]
    pub fn bind<'a>(
        self,
        directory: &'a dyn DeviceDirectory,
        record: &DeviceRecord,
    ) -> Box<dyn DeviceAdapter + 'a> {
        match self {
            Self::TempHumBaro => Box::new(Adapter::<Weather>::bind(directory, record)),
            Self::TempHum => Box::new(Adapter::<TempHum>::bind(directory, record)),
            Self::MotionSensor => Box::new(Adapter::<Motion>::bind(directory, record)),
            Self::DoorSensor => Box::new(Adapter::<Contact>::bind(directory, record)),
            Self::VibrationSensor => Box::new(Adapter::<Vibration>::bind(directory, record)),
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extracts the model identifier from a discovery message.
///
/// Returns `None` unless the topic is a model-identifier path and the payload
/// decodes to text. Both the report and the read-response framings are accepted.
#[must_use]
pub fn discovered_model(topic: &Topic, payload: &[u8]) -> Option<String> {
    let path = topic.inbound_attribute_path()?;
    if !MODEL_IDENTIFIER_PATHS.contains(&path.as_str()) {
        return None;
    }
    match telemetry::decode(payload) {
        Ok(telemetry::DecodedValue::Text(model)) => Some(model),
        Ok(other) => {
            tracing::debug!(shape = other.shape(), "Model identifier is not text");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Undecodable model identifier");
            None
        }
    }
}

/// What processing one message did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageOutcome {
    /// The message mapped onto at least one known attribute.
    pub handled: bool,
    /// The record was written.
    pub written: bool,
    /// The message set the kind's transient flag.
    pub transient_raised: bool,
}

impl MessageOutcome {
    /// Outcome for a message the adapter does not act on.
    #[must_use]
    pub const fn ignored() -> Self {
        Self {
            handled: false,
            written: false,
            transient_raised: false,
        }
    }
}

/// The adapter contract, shared by every kind.
pub trait DeviceAdapter {
    /// Returns the adapter's kind.
    fn kind(&self) -> AdapterKind;

    /// Returns the handle of the bound record.
    fn handle(&self) -> u32;

    /// Returns the hub-assigned device identifier.
    fn device_id(&self) -> &str;

    /// Applies one message to the in-memory state and reconciles the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed, a recognized attribute has
    /// the wrong shape, or the directory write fails. State is left untouched
    /// for a malformed payload.
    fn process_message(&mut self, topic: &Topic, payload: &[u8]) -> Result<MessageOutcome>;

    /// Writes the projected state to the record if it differs from the stored one.
    ///
    /// Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if the write fails.
    fn update(&mut self) -> std::result::Result<bool, DirectoryError>;

    /// Clears the transient flag, if the kind has one, and reconciles the record.
    ///
    /// Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if the write fails.
    fn clear_transient(&mut self) -> std::result::Result<bool, DirectoryError>;
}

/// The observable, rounded form of a kind's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Discrete state.
    pub discrete: i32,
    /// Semantic state.
    pub semantic: String,
}

/// Per-kind data and projection logic.
pub trait SensorModel: Sized + Send + 'static {
    /// The kind this model implements.
    const KIND: AdapterKind;
    /// Descriptor of newly created records.
    const DESCRIPTOR: TypeDescriptor;
    /// Model identifiers claimed by this kind.
    const MODELS: &'static [&'static str];

    /// Returns true if `record` was persisted as this kind.
    fn matches_record(record: &DeviceRecord) -> bool {
        record.descriptor == Self::DESCRIPTOR
    }

    /// Rebuilds the model from a stored record.
    fn from_record(record: &DeviceRecord) -> Self;

    /// Rules keyed by full inbound attribute path.
    fn primary_table() -> &'static AttributeTable<SensorState<Self>>;

    /// Rules keyed by vendor block code, for kinds that report one.
    fn vendor_table() -> Option<&'static AttributeTable<SensorState<Self>>> {
        None
    }

    /// Projects the model onto discrete and semantic state.
    fn project(&self) -> Projection;

    /// Clears the transient flag. Returns true if it was set.
    fn clear_transient(&mut self) -> bool {
        false
    }
}

/// Mutable state owned by an adapter while it processes a message.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorState<M> {
    /// Kind-specific readings.
    pub model: M,
    /// Battery level.
    pub battery: u8,
    /// Signal level.
    pub signal: u8,
    transient_raised: bool,
}

impl<M> SensorState<M> {
    /// Records that the current message set the transient flag.
    pub fn raise_transient(&mut self) {
        self.transient_raised = true;
    }

    /// Returns true if the current message set the transient flag.
    #[must_use]
    pub fn transient_raised(&self) -> bool {
        self.transient_raised
    }
}

/// Everything `update()` compares against before writing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    projection: Projection,
    battery: u8,
    signal: u8,
}

/// A [`SensorModel`] bound to one directory record.
pub struct Adapter<'a, M: SensorModel> {
    directory: &'a dyn DeviceDirectory,
    handle: u32,
    device_id: String,
    state: SensorState<M>,
    stored: Snapshot,
}

impl<M: SensorModel> fmt::Debug for Adapter<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("kind", &M::KIND)
            .field("handle", &self.handle)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

impl<'a, M: SensorModel> Adapter<'a, M> {
    /// Binds a new adapter to `record`.
    #[must_use]
    pub fn bind(directory: &'a dyn DeviceDirectory, record: &DeviceRecord) -> Self {
        Self {
            directory,
            handle: record.handle,
            device_id: record.device_id.clone(),
            state: SensorState {
                model: M::from_record(record),
                battery: record.battery_level,
                signal: record.signal_level,
                transient_raised: false,
            },
            stored: Snapshot {
                projection: Projection {
                    discrete: record.discrete_state,
                    semantic: record.semantic_state.clone(),
                },
                battery: record.battery_level,
                signal: record.signal_level,
            },
        }
    }

    /// Returns the adapter state.
    #[must_use]
    pub fn state(&self) -> &SensorState<M> {
        &self.state
    }

    /// Returns the adapter state for direct modification.
    ///
    /// Changes reach the record on the next [`DeviceAdapter::update`].
    pub fn state_mut(&mut self) -> &mut SensorState<M> {
        &mut self.state
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            projection: self.state.model.project(),
            battery: self.state.battery,
            signal: self.state.signal,
        }
    }

    fn reconcile(&mut self) -> Result<MessageOutcome> {
        let written = self.update()?;
        Ok(MessageOutcome {
            handled: true,
            written,
            transient_raised: self.state.transient_raised,
        })
    }

    fn apply_vendor_block(
        &mut self,
        table: &'static AttributeTable<SensorState<M>>,
        payload: &[u8],
    ) -> Result<MessageOutcome> {
        let value = telemetry::decode(payload)?;
        let Some(block) = value.as_map() else {
            return Err(PayloadError::UnexpectedShape {
                expected: "keyed map",
                found: value.shape(),
            }
            .into());
        };

        let mut applied = 0usize;
        for (code, field) in block {
            let Some(rule) = table.get(code) else {
                continue;
            };
            match rule.apply(code, &mut self.state, field) {
                Ok(_) => applied += 1,
                Err(e) => tracing::warn!(
                    device = %self.device_id,
                    error = %e,
                    "Skipping vendor block field"
                ),
            }
        }

        if applied == 0 {
            tracing::trace!(device = %self.device_id, "Vendor block carried no known fields");
            return Ok(MessageOutcome::ignored());
        }
        tracing::debug!(device = %self.device_id, fields = applied, "Applied vendor block");
        self.reconcile()
    }
}

impl<M: SensorModel> DeviceAdapter for Adapter<'_, M> {
    fn kind(&self) -> AdapterKind {
        M::KIND
    }

    fn handle(&self) -> u32 {
        self.handle
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn process_message(&mut self, topic: &Topic, payload: &[u8]) -> Result<MessageOutcome> {
        self.state.transient_raised = false;

        if topic.topic_path().as_deref() == Some(LINK_QUALITY_PATH) {
            let quality = telemetry::decode_number(payload)?;
            self.state.signal = signal_from_link_quality(quality);
            return self.reconcile();
        }

        let Some(path) = topic.inbound_attribute_path() else {
            return Ok(MessageOutcome::ignored());
        };

        if let Some(rule) = M::primary_table().get(&path) {
            let value = telemetry::decode(payload)?;
            rule.apply(&path, &mut self.state, &value)?;
            return self.reconcile();
        }

        if path == VENDOR_BLOCK_PATH
            && let Some(table) = M::vendor_table()
        {
            return self.apply_vendor_block(table, payload);
        }

        tracing::trace!(device = %self.device_id, path = %path, "Unmapped attribute");
        Ok(MessageOutcome::ignored())
    }

    fn update(&mut self) -> std::result::Result<bool, DirectoryError> {
        let current = self.snapshot();
        if current == self.stored {
            tracing::trace!(device = %self.device_id, "State unchanged, skipping write");
            return Ok(false);
        }

        let update = RecordUpdate {
            discrete_state: current.projection.discrete,
            semantic_state: current.projection.semantic.clone(),
            battery_level: Some(current.battery),
            signal_level: Some(current.signal),
        };
        self.directory.update_record(self.handle, &update)?;
        tracing::debug!(
            device = %self.device_id,
            handle = self.handle,
            semantic = %update.semantic_state,
            battery = current.battery,
            signal = current.signal,
            "Record written"
        );
        self.stored = current;
        Ok(true)
    }

    fn clear_transient(&mut self) -> std::result::Result<bool, DirectoryError> {
        if !self.state.model.clear_transient() {
            return Ok(false);
        }
        self.update()
    }
}

/// Splits a `;`-joined semantic state into numeric fields.
///
/// Missing or unparseable fields read as `0.0`, so a freshly created record
/// with an empty state still binds.
pub(crate) fn numeric_fields<const N: usize>(semantic: &str) -> [f64; N] {
    let mut fields = [0.0; N];
    for (slot, raw) in fields.iter_mut().zip(semantic.split(';')) {
        *slot = raw.trim().parse().unwrap_or(0.0);
    }
    fields
}
