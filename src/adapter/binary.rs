// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary sensors: motion, door contact and vibration.
//!
//! All three project onto a switch record: discrete state `1`/`0` with a
//! matching semantic label. Motion and vibration are transient: a detection
//! raises the flag and the debounce timers clear it after a quiet period.

use super::battery::set_vendor_battery;
use super::{AdapterKind, Projection, SensorModel, SensorState};
use crate::directory::{DeviceRecord, TypeDescriptor};
use crate::telemetry::{AttributeRule, AttributeTable};

fn switch_projection(active: bool, on: &str, off: &str) -> Projection {
    if active {
        Projection {
            discrete: 1,
            semantic: on.to_owned(),
        }
    } else {
        Projection {
            discrete: 0,
            semantic: off.to_owned(),
        }
    }
}

fn matches_switch(record: &DeviceRecord, descriptor: TypeDescriptor) -> bool {
    record.descriptor.is_switch() && record.descriptor.switch_type == descriptor.switch_type
}

/// Occupancy sensor state (`lumi.sensor_motion.aq2`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Motion {
    /// Occupancy detected and not yet cleared.
    pub occupied: bool,
    /// Last illuminance report (raw). Tracked but not projected.
    pub illuminance: f64,
}

fn set_occupancy(state: &mut SensorState<Motion>, occupied: bool) {
    state.model.occupied = occupied;
    if occupied {
        state.raise_transient();
    }
}

static MOTION_PRIMARY: AttributeTable<SensorState<Motion>> = AttributeTable::new(&[
    (
        "Illuminance Measurement/Report Attributes/MeasuredValue",
        AttributeRule::identity(|s, v| s.model.illuminance = v),
    ),
    (
        "Occupancy Sensing/Report Attributes/Occupancy",
        AttributeRule::first_bit(set_occupancy),
    ),
]);

static MOTION_VENDOR: AttributeTable<SensorState<Motion>> =
    AttributeTable::new(&[("1", AttributeRule::scaled(0.001, set_vendor_battery))]);

impl SensorModel for Motion {
    const KIND: AdapterKind = AdapterKind::MotionSensor;
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::MOTION_SENSOR;
    const MODELS: &'static [&'static str] = &["lumi.sensor_motion.aq2", "lumi.sensor_motion"];

    fn matches_record(record: &DeviceRecord) -> bool {
        matches_switch(record, Self::DESCRIPTOR)
    }

    fn from_record(record: &DeviceRecord) -> Self {
        Self {
            occupied: record.discrete_state != 0,
            illuminance: 0.0,
        }
    }

    fn primary_table() -> &'static AttributeTable<SensorState<Self>> {
        &MOTION_PRIMARY
    }

    fn vendor_table() -> Option<&'static AttributeTable<SensorState<Self>>> {
        Some(&MOTION_VENDOR)
    }

    fn project(&self) -> Projection {
        switch_projection(self.occupied, "On", "Off")
    }

    fn clear_transient(&mut self) -> bool {
        std::mem::take(&mut self.occupied)
    }
}

/// Door/window contact state (`lumi.sensor_magnet.aq2`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contact {
    /// The contact is open.
    pub open: bool,
}

static CONTACT_PRIMARY: AttributeTable<SensorState<Contact>> = AttributeTable::new(&[(
    "OnOff/Report Attributes/OnOff",
    AttributeRule::flag(|s, open| s.model.open = open),
)]);

static CONTACT_VENDOR: AttributeTable<SensorState<Contact>> = AttributeTable::new(&[
    ("1", AttributeRule::scaled(0.001, set_vendor_battery)),
    ("100", AttributeRule::flag(|s, open| s.model.open = open)),
]);

impl SensorModel for Contact {
    const KIND: AdapterKind = AdapterKind::DoorSensor;
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::DOOR_CONTACT;
    const MODELS: &'static [&'static str] = &["lumi.sensor_magnet.aq2", "lumi.sensor_magnet"];

    fn matches_record(record: &DeviceRecord) -> bool {
        matches_switch(record, Self::DESCRIPTOR)
    }

    fn from_record(record: &DeviceRecord) -> Self {
        Self {
            open: record.discrete_state != 0,
        }
    }

    fn primary_table() -> &'static AttributeTable<SensorState<Self>> {
        &CONTACT_PRIMARY
    }

    fn vendor_table() -> Option<&'static AttributeTable<SensorState<Self>>> {
        Some(&CONTACT_VENDOR)
    }

    fn project(&self) -> Projection {
        switch_projection(self.open, "Open", "Closed")
    }
}

/// Vibration sensor state (`lumi.vibration.aq1`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vibration {
    /// Vibration detected and not yet cleared.
    pub active: bool,
}

// The sensor reports its event code on the door lock cluster; any non-zero
// code is a detection.
fn set_vibration_event(state: &mut SensorState<Vibration>, code: f64) {
    if code > 0.0 {
        state.model.active = true;
        state.raise_transient();
    }
}

static VIBRATION_PRIMARY: AttributeTable<SensorState<Vibration>> = AttributeTable::new(&[(
    "Door Lock/Report Attributes/0x0055",
    AttributeRule::identity(set_vibration_event),
)]);

static VIBRATION_VENDOR: AttributeTable<SensorState<Vibration>> =
    AttributeTable::new(&[("1", AttributeRule::scaled(0.001, set_vendor_battery))]);

impl SensorModel for Vibration {
    const KIND: AdapterKind = AdapterKind::VibrationSensor;
    const DESCRIPTOR: TypeDescriptor = TypeDescriptor::ON_OFF_SWITCH;
    const MODELS: &'static [&'static str] = &["lumi.vibration.aq1"];

    fn matches_record(record: &DeviceRecord) -> bool {
        matches_switch(record, Self::DESCRIPTOR)
    }

    fn from_record(record: &DeviceRecord) -> Self {
        Self {
            active: record.discrete_state != 0,
        }
    }

    fn primary_table() -> &'static AttributeTable<SensorState<Self>> {
        &VIBRATION_PRIMARY
    }

    fn vendor_table() -> Option<&'static AttributeTable<SensorState<Self>>> {
        Some(&VIBRATION_VENDOR)
    }

    fn project(&self) -> Projection {
        switch_projection(self.active, "On", "Off")
    }

    fn clear_transient(&mut self) -> bool {
        std::mem::take(&mut self.active)
    }
}
