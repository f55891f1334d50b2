// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolution of device ids to adapter kinds, and registration of new devices.

use super::{AdapterKind, DeviceAdapter, discovered_model};
use crate::directory::{DeviceDirectory, DeviceFactory, NewDevice};
use crate::error::Result;
use crate::protocol::Topic;

/// Maps device ids onto adapters, walking [`AdapterKind::ALL`] in order.
///
/// The registry is stateless: adapters are rebuilt from the directory on
/// every call and hold nothing between messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterRegistry;

impl AdapterRegistry {
    /// Binds an adapter for the record owning `device_id`.
    ///
    /// Returns `None` if there is no such record, or if the record's
    /// descriptor matches no known kind.
    #[must_use]
    pub fn resolve<'a>(
        directory: &'a dyn DeviceDirectory,
        device_id: &str,
    ) -> Option<Box<dyn DeviceAdapter + 'a>> {
        let record = directory.find_by_device_id(device_id)?;
        let Some(kind) = AdapterKind::ALL
            .into_iter()
            .find(|kind| kind.matches_directory_record(&record))
        else {
            tracing::warn!(
                device = %device_id,
                handle = record.handle,
                descriptor = ?record.descriptor,
                "Record matches no adapter kind"
            );
            return None;
        };
        tracing::trace!(device = %device_id, kind = %kind, "Resolved adapter");
        Some(kind.bind(directory, &record))
    }

    /// Creates a record for `device_id` if the message identifies a known model.
    ///
    /// Does nothing if a record for `device_id` already exists, whether or not
    /// its kind is supported. Returns the new handle on registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the factory rejects the new record.
    pub fn register_if_unknown(
        directory: &dyn DeviceDirectory,
        factory: &dyn DeviceFactory,
        device_id: &str,
        topic: &Topic,
        payload: &[u8],
    ) -> Result<Option<u32>> {
        if directory.find_by_device_id(device_id).is_some() {
            return Ok(None);
        }
        let Some(model) = discovered_model(topic, payload) else {
            return Ok(None);
        };
        let Some((kind, descriptor)) = AdapterKind::ALL
            .into_iter()
            .find_map(|kind| kind.matches_model(&model).map(|d| (kind, d)))
        else {
            tracing::debug!(device = %device_id, model = %model, "Unsupported model");
            return Ok(None);
        };

        let handle = Self::next_handle(directory);
        factory.create_record(NewDevice {
            name: device_id.to_string(),
            handle,
            descriptor,
            device_id: device_id.to_string(),
        })?;
        tracing::info!(
            device = %device_id,
            model = %model,
            kind = %kind,
            handle,
            "Registered new device"
        );
        Ok(Some(handle))
    }

    /// Returns the next free handle: one past the highest in use, or 1.
    #[must_use]
    pub fn next_handle(directory: &dyn DeviceDirectory) -> u32 {
        directory
            .records()
            .iter()
            .map(|record| record.handle)
            .max()
            .map_or(1, |max| max.saturating_add(1))
    }
}
