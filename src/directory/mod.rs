// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The device directory: the host-owned store of device records.
//!
//! The bridge never owns device records. It reads them through
//! [`DeviceDirectory`], writes them back through
//! [`DeviceDirectory::update_record`], and asks a [`DeviceFactory`] to persist
//! newly discovered devices.
//!
//! [`InMemoryDirectory`] implements both traits and is what the tests and
//! simple embeddings use.

mod memory;

pub use memory::InMemoryDirectory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Type/subtype/switch-type triplet describing what a record represents.
///
/// The numbers follow the Domoticz device type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Device type (e.g. 84 for temperature/humidity/barometer).
    pub device_type: u8,
    /// Device subtype.
    pub subtype: u8,
    /// Switch type, for switch-like devices only.
    pub switch_type: Option<u8>,
}

impl TypeDescriptor {
    /// Temperature + humidity + barometer sensor.
    pub const TEMP_HUM_BARO: Self = Self::sensor(84, 1);
    /// Temperature + humidity sensor.
    pub const TEMP_HUM: Self = Self::sensor(82, 1);
    /// Generic on/off switch, used for vibration sensors.
    pub const ON_OFF_SWITCH: Self = Self::switch(0);
    /// Motion sensor switch.
    pub const MOTION_SENSOR: Self = Self::switch(8);
    /// Door contact switch.
    pub const DOOR_CONTACT: Self = Self::switch(11);

    /// Device type shared by every switch-like descriptor.
    pub const SWITCH_TYPE: u8 = 244;
    /// Subtype shared by every switch-like descriptor.
    pub const SWITCH_SUBTYPE: u8 = 73;

    /// A sensor descriptor with no switch type.
    #[must_use]
    pub const fn sensor(device_type: u8, subtype: u8) -> Self {
        Self {
            device_type,
            subtype,
            switch_type: None,
        }
    }

    /// A switch descriptor with the given switch type.
    #[must_use]
    pub const fn switch(switch_type: u8) -> Self {
        Self {
            device_type: Self::SWITCH_TYPE,
            subtype: Self::SWITCH_SUBTYPE,
            switch_type: Some(switch_type),
        }
    }

    /// Returns true if this describes a switch-like device.
    #[must_use]
    pub fn is_switch(&self) -> bool {
        self.device_type == Self::SWITCH_TYPE && self.subtype == Self::SWITCH_SUBTYPE
    }
}

/// A persisted device record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Stable numeric slot.
    pub handle: u32,
    /// Display name.
    pub name: String,
    /// Opaque identifier assigned by the hub (the topic's device segment).
    pub device_id: String,
    /// What kind of device this record represents.
    pub descriptor: TypeDescriptor,
    /// Discrete state (e.g. 0/1 for switches).
    pub discrete_state: i32,
    /// Semantic state; multi-value kinds join their fields with `;`.
    pub semantic_state: String,
    /// Battery level; 255 means unknown.
    pub battery_level: u8,
    /// Signal quality, 0-100.
    pub signal_level: u8,
    /// Time of the last write, if the directory tracks it.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    /// Battery level reported for devices that have not reported one yet.
    pub const UNKNOWN_BATTERY: u8 = 255;
    /// Signal level reported for devices that have not reported one yet.
    pub const FULL_SIGNAL: u8 = 100;

    /// Builds the initial record for a newly created device.
    #[must_use]
    pub fn from_new_device(device: NewDevice) -> Self {
        Self {
            handle: device.handle,
            name: device.name,
            device_id: device.device_id,
            descriptor: device.descriptor,
            discrete_state: 0,
            semantic_state: String::new(),
            battery_level: Self::UNKNOWN_BATTERY,
            signal_level: Self::FULL_SIGNAL,
            last_update: None,
        }
    }
}

/// A write to an existing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    /// New discrete state.
    pub discrete_state: i32,
    /// New semantic state.
    pub semantic_state: String,
    /// New battery level, if it should change.
    pub battery_level: Option<u8>,
    /// New signal level, if it should change.
    pub signal_level: Option<u8>,
}

impl RecordUpdate {
    /// Applies this update to a record in place.
    pub fn apply_to(&self, record: &mut DeviceRecord) {
        record.discrete_state = self.discrete_state;
        record.semantic_state.clone_from(&self.semantic_state);
        if let Some(battery) = self.battery_level {
            record.battery_level = battery;
        }
        if let Some(signal) = self.signal_level {
            record.signal_level = signal;
        }
    }
}

/// A request to persist a newly discovered device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDevice {
    /// Display name.
    pub name: String,
    /// Slot allocated by the registry.
    pub handle: u32,
    /// The matched adapter kind's descriptor.
    pub descriptor: TypeDescriptor,
    /// Hub-assigned identifier.
    pub device_id: String,
}

/// Read/write access to the host's device records.
///
/// Implementations must be cheap and non-blocking: the bridge calls them while
/// holding its serialization lock.
pub trait DeviceDirectory: Send + Sync {
    /// Returns a snapshot of every record.
    fn records(&self) -> Vec<DeviceRecord>;

    /// Writes `update` into the record at `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if no record exists at `handle` or the store
    /// refuses the write.
    fn update_record(&self, handle: u32, update: &RecordUpdate) -> Result<(), DirectoryError>;

    /// Returns the record carrying `device_id`, if any.
    fn find_by_device_id(&self, device_id: &str) -> Option<DeviceRecord> {
        self.records()
            .into_iter()
            .find(|record| record.device_id == device_id)
    }

    /// Returns the record at `handle`, if any.
    fn get(&self, handle: u32) -> Option<DeviceRecord> {
        self.records()
            .into_iter()
            .find(|record| record.handle == handle)
    }
}

/// Persists newly discovered devices.
pub trait DeviceFactory: Send + Sync {
    /// Creates a record for `device`.
    ///
    /// Handle uniqueness is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] if the record cannot be created.
    fn create_record(&self, device: NewDevice) -> Result<(), DirectoryError>;
}

impl<F> DeviceFactory for F
where
    F: Fn(NewDevice) -> Result<(), DirectoryError> + Send + Sync,
{
    fn create_record(&self, device: NewDevice) -> Result<(), DirectoryError> {
        self(device)
    }
}
