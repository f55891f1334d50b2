// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dispatcher configuration.

use std::time::Duration;

/// Root topic published by AqaraHub.
pub const DEFAULT_ROOT_TOPIC: &str = "AqaraHub";

/// Default quiet period before a transient state is cleared.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_secs(120);

/// Configuration for a [`Dispatcher`](super::Dispatcher).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use aqara_bridge::manager::BridgeConfig;
///
/// let config = BridgeConfig::default()
///     .with_root_topic("zigbee")
///     .with_quiet_period(Duration::from_secs(30));
///
/// assert_eq!(config.root_topic, "zigbee");
/// assert!(config.debounce_enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// First topic segment every routed message must carry.
    pub root_topic: String,
    /// Time without detections before motion and vibration states clear.
    pub quiet_period: Duration,
    /// Whether detections arm the auto-clear timers.
    pub debounce_enabled: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            root_topic: DEFAULT_ROOT_TOPIC.to_string(),
            quiet_period: DEFAULT_QUIET_PERIOD,
            debounce_enabled: true,
        }
    }
}

impl BridgeConfig {
    /// Sets the root topic.
    #[must_use]
    pub fn with_root_topic(mut self, root_topic: impl Into<String>) -> Self {
        self.root_topic = root_topic.into();
        self
    }

    /// Sets the quiet period.
    #[must_use]
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    /// Enables or disables arming of the auto-clear timers.
    #[must_use]
    pub fn with_debounce(mut self, enabled: bool) -> Self {
        self.debounce_enabled = enabled;
        self
    }
}
