// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory device directory.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;

use super::{DeviceDirectory, DeviceFactory, DeviceRecord, NewDevice, RecordUpdate};
use crate::error::DirectoryError;

/// A directory that keeps records in memory, keyed by handle.
///
/// Counts every successful write so callers can observe how many updates
/// actually reached the store.
///
/// # Examples
///
/// ```
/// use aqara_bridge::directory::{
///     DeviceDirectory, DeviceFactory, InMemoryDirectory, NewDevice, TypeDescriptor,
/// };
///
/// let directory = InMemoryDirectory::new();
/// directory
///     .create_record(NewDevice {
///         name: "hallway".to_string(),
///         handle: 1,
///         descriptor: TypeDescriptor::MOTION_SENSOR,
///         device_id: "00158D0001A2B3C4".to_string(),
///     })
///     .unwrap();
///
/// assert!(directory.find_by_device_id("00158D0001A2B3C4").is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: RwLock<BTreeMap<u32, DeviceRecord>>,
    writes: AtomicU64,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = DeviceRecord>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|record| (record.handle, record))
                    .collect(),
            ),
            writes: AtomicU64::new(0),
        }
    }

    /// Inserts or replaces a record directly, bypassing the write counter.
    pub fn insert(&self, record: DeviceRecord) {
        self.records.write().insert(record.handle, record);
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Returns the number of successful [`DeviceDirectory::update_record`] calls.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }
}

impl DeviceDirectory for InMemoryDirectory {
    fn records(&self) -> Vec<DeviceRecord> {
        self.records.read().values().cloned().collect()
    }

    fn update_record(&self, handle: u32, update: &RecordUpdate) -> Result<(), DirectoryError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(&handle)
            .ok_or(DirectoryError::UnknownHandle(handle))?;
        update.apply_to(record);
        record.last_update = Some(Utc::now());
        self.writes.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(handle, semantic = %record.semantic_state, "Record updated");
        Ok(())
    }

    fn get(&self, handle: u32) -> Option<DeviceRecord> {
        self.records.read().get(&handle).cloned()
    }
}

impl DeviceFactory for InMemoryDirectory {
    fn create_record(&self, device: NewDevice) -> Result<(), DirectoryError> {
        let mut records = self.records.write();
        if records.contains_key(&device.handle) {
            return Err(DirectoryError::DuplicateHandle(device.handle));
        }
        let record = DeviceRecord::from_new_device(device);
        records.insert(record.handle, record);
        Ok(())
    }
}
