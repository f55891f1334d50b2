// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The message entry point.

use std::sync::Arc;

use super::{BridgeConfig, DebounceTimers};
use crate::adapter::AdapterRegistry;
use crate::directory::{DeviceDirectory, DeviceFactory};
use crate::error::Error;
use crate::protocol::Topic;

/// Why a message was dropped without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Wrong root segment, or no device id.
    UnroutableTopic,
    /// No record exists and the message does not identify a known model.
    UnknownDevice,
    /// The device is known but the attribute maps to nothing.
    UnhandledAttribute,
}

/// Result of dispatching one message.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The message had no effect.
    Ignored(IgnoreReason),
    /// An existing device processed the message.
    Updated {
        /// Handle of the device record.
        handle: u32,
        /// Whether the record was written.
        written: bool,
    },
    /// A new device record was created.
    Registered {
        /// Handle of the new record.
        handle: u32,
    },
    /// Processing failed. The failure has already been logged.
    Failed(Error),
}

impl DispatchOutcome {
    /// Returns true for [`DispatchOutcome::Ignored`].
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }

    /// Returns the handle of the record the message touched, if any.
    #[must_use]
    pub fn handle(&self) -> Option<u32> {
        match self {
            Self::Updated { handle, .. } | Self::Registered { handle } => Some(*handle),
            Self::Ignored(_) | Self::Failed(_) => None,
        }
    }
}

/// Routes inbound messages to device adapters.
///
/// Adapters are rebuilt from the directory for every message; the only
/// long-lived state is the [`DebounceTimers`] table.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use aqara_bridge::directory::{DeviceDirectory, InMemoryDirectory};
/// use aqara_bridge::manager::{BridgeConfig, DispatchOutcome, Dispatcher};
///
/// let directory = Arc::new(InMemoryDirectory::new());
/// let dispatcher = Dispatcher::new(BridgeConfig::default(), directory.clone(), directory.clone());
///
/// let outcome = dispatcher.on_data(
///     "AqaraHub/00158D0002786756/1/in/Basic/Report Attributes/ModelIdentifier",
///     br#"{"type":"string","value":"lumi.weather"}"#,
/// );
/// assert!(matches!(outcome, DispatchOutcome::Registered { handle: 1 }));
/// assert!(directory.find_by_device_id("00158D0002786756").is_some());
/// ```
pub struct Dispatcher {
    config: BridgeConfig,
    directory: Arc<dyn DeviceDirectory>,
    factory: Arc<dyn DeviceFactory>,
    timers: DebounceTimers,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("timers", &self.timers)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher over `directory`, registering new devices through `factory`.
    #[must_use]
    pub fn new(
        config: BridgeConfig,
        directory: Arc<dyn DeviceDirectory>,
        factory: Arc<dyn DeviceFactory>,
    ) -> Self {
        let timers = DebounceTimers::new(Arc::clone(&directory), config.quiet_period);
        timers.set_enabled(config.debounce_enabled);
        Self {
            config,
            directory,
            factory,
            timers,
        }
    }

    /// Returns the configured root topic.
    #[must_use]
    pub fn root_topic(&self) -> &str {
        &self.config.root_topic
    }

    /// Returns the auto-clear timers.
    #[must_use]
    pub fn timers(&self) -> &DebounceTimers {
        &self.timers
    }

    /// Handles one inbound message.
    ///
    /// Never fails: errors are logged and returned as [`DispatchOutcome::Failed`].
    pub fn on_data(&self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        let parsed = Topic::parse(self.config.root_topic.as_str(), topic);
        if !parsed.matches_root() {
            tracing::trace!(topic = %topic, "Foreign root, ignoring");
            return DispatchOutcome::Ignored(IgnoreReason::UnroutableTopic);
        }
        let Some(device_id) = parsed.device_id() else {
            tracing::trace!(topic = %topic, "No device id, ignoring");
            return DispatchOutcome::Ignored(IgnoreReason::UnroutableTopic);
        };

        let mut timers = self.timers.lock();

        if let Some(mut adapter) = AdapterRegistry::resolve(self.directory.as_ref(), device_id) {
            let handle = adapter.handle();
            return match adapter.process_message(&parsed, payload) {
                Ok(outcome) => {
                    if outcome.transient_raised && adapter.kind().is_transient() {
                        timers.arm(device_id);
                    }
                    if outcome.handled {
                        tracing::debug!(
                            device = %device_id,
                            kind = %adapter.kind(),
                            written = outcome.written,
                            "Message applied"
                        );
                        DispatchOutcome::Updated {
                            handle,
                            written: outcome.written,
                        }
                    } else {
                        tracing::trace!(
                            device = %device_id,
                            topic = %topic,
                            "Unhandled attribute"
                        );
                        DispatchOutcome::Ignored(IgnoreReason::UnhandledAttribute)
                    }
                }
                Err(e) => {
                    log_failure(device_id, topic, &e);
                    DispatchOutcome::Failed(e)
                }
            };
        }

        match AdapterRegistry::register_if_unknown(
            self.directory.as_ref(),
            self.factory.as_ref(),
            device_id,
            &parsed,
            payload,
        ) {
            Ok(Some(handle)) => DispatchOutcome::Registered { handle },
            Ok(None) => {
                tracing::debug!(device = %device_id, topic = %topic, "Unidentified device");
                DispatchOutcome::Ignored(IgnoreReason::UnknownDevice)
            }
            Err(e) => {
                log_failure(device_id, topic, &e);
                DispatchOutcome::Failed(e)
            }
        }
    }
}

fn log_failure(device_id: &str, topic: &str, error: &Error) {
    match error {
        Error::Directory(_) => {
            tracing::error!(
                device = %device_id,
                topic = %topic,
                error = %error,
                "Directory write failed"
            );
        }
        _ => {
            tracing::warn!(
                device = %device_id,
                topic = %topic,
                error = %error,
                "Message dropped"
            );
        }
    }
}
