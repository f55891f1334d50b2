// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Battery and signal calibration.

use super::SensorState;

/// Cell voltage treated as empty on Xiaomi CR2032 devices.
const CUTOFF_VOLTS: f64 = 2.2;

/// Converts a cell voltage to a battery percentage.
///
/// `round((volts - 2.2) * 100)`, clamped to `[0, 100]`. Samples outside that
/// range are device noise and are clamped rather than passed through.
///
/// # Examples
///
/// ```
/// use aqara_bridge::adapter::percent_from_volts;
///
/// assert_eq!(percent_from_volts(3.005), 80);
/// assert_eq!(percent_from_volts(3.4), 100);
/// assert_eq!(percent_from_volts(2.1), 0);
/// ```
#[must_use]
pub fn percent_from_volts(volts: f64) -> u8 {
    clamp_percent((volts - CUTOFF_VOLTS) * 100.0)
}

/// Converts a raw millivolt sample to a battery percentage.
#[must_use]
pub fn percent_from_millivolts(millivolts: f64) -> u8 {
    percent_from_volts(millivolts * 0.001)
}

/// Converts a Zigbee link-quality indicator (0-255) to a signal level.
///
/// `floor(lqi / 10)`, clamped to `[0, 100]`.
#[must_use]
// Clamped to [0, 100] before the cast
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn signal_from_link_quality(lqi: f64) -> u8 {
    if lqi.is_nan() {
        return 0;
    }
    (lqi / 10.0).floor().clamp(0.0, 100.0) as u8
}

// Clamped to [0, 100] before the cast
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Vendor block setter: the rule scales millivolts to volts.
pub(crate) fn set_vendor_battery<M>(state: &mut SensorState<M>, volts: f64) {
    state.battery = percent_from_volts(volts);
}

/// Setter for an already-scaled remaining-percentage attribute.
pub(crate) fn set_battery_percent<M>(state: &mut SensorState<M>, percent: f64) {
    state.battery = clamp_percent(percent);
}
