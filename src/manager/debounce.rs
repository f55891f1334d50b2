// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Auto-clear timers for transient sensor states.
//!
//! Each device id has at most one armed timer. Arming replaces the previous
//! timer and restarts the countdown; when a timer fires, the device's current
//! record is loaded, its transient flag cleared, and the record written once.
//!
//! # Serialization
//!
//! The timer table lock is the single mutual-exclusion domain for both paths
//! that mutate a transient device:
//!
//! ```text
//! message:  lock() ─► resolve ─► process_message ─► update ─► arm ─► unlock
//! timer:    lock() ─► generation check ─► resolve ─► clear ─► update ─► unlock
//! ```
//!
//! A fire that lost a race with a re-arm finds a newer generation in the
//! table and does nothing, so at most one fire's effect lands per arm.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant};

use crate::adapter::AdapterRegistry;
use crate::directory::DeviceDirectory;

struct TimerEntry {
    generation: u64,
    fire_at: Instant,
    handle: AbortHandle,
}

#[derive(Default)]
struct TimerTable {
    entries: HashMap<String, TimerEntry>,
    next_generation: u64,
}

struct Shared {
    table: Mutex<TimerTable>,
    directory: Arc<dyn DeviceDirectory>,
    quiet_period: Duration,
    enabled: AtomicBool,
}

impl Shared {
    fn fire(&self, device_id: &str, generation: u64) -> bool {
        let mut table = self.table.lock();
        match table.entries.get(device_id) {
            Some(entry) if entry.generation == generation => {}
            _ => {
                tracing::trace!(device = %device_id, generation, "Stale timer fire ignored");
                return false;
            }
        }
        table.entries.remove(device_id);

        let Some(mut adapter) = AdapterRegistry::resolve(self.directory.as_ref(), device_id)
        else {
            tracing::warn!(device = %device_id, "Timer fired for a device with no usable record");
            return false;
        };
        match adapter.clear_transient() {
            Ok(written) => {
                tracing::debug!(device = %device_id, written, "Transient state cleared");
                written
            }
            Err(e) => {
                tracing::error!(device = %device_id, error = %e, "Failed to clear transient state");
                false
            }
        }
    }
}

/// Process-scoped table of per-device auto-clear timers.
///
/// Dropping the table aborts every outstanding timer.
pub struct DebounceTimers {
    shared: Arc<Shared>,
}

impl fmt::Debug for DebounceTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceTimers")
            .field("quiet_period", &self.shared.quiet_period)
            .field("enabled", &self.is_enabled())
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

impl DebounceTimers {
    /// Creates an empty, enabled timer table.
    #[must_use]
    pub fn new(directory: Arc<dyn DeviceDirectory>, quiet_period: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(TimerTable::default()),
                directory,
                quiet_period,
                enabled: AtomicBool::new(true),
            }),
        }
    }

    /// Locks the table.
    ///
    /// While the guard is held no timer can apply its effect.
    pub fn lock(&self) -> TimerGuard<'_> {
        TimerGuard {
            table: self.shared.table.lock(),
            shared: &self.shared,
        }
    }

    /// Arms (or re-arms) the timer for `device_id`.
    ///
    /// Returns false if arming is disabled or no tokio runtime is available.
    pub fn arm(&self, device_id: &str) -> bool {
        self.lock().arm(device_id)
    }

    /// Cancels the timer for `device_id`. Returns true if one was armed.
    pub fn cancel(&self, device_id: &str) -> bool {
        self.lock().cancel(device_id)
    }

    /// Enables or disables arming. Timers already armed are unaffected.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::SeqCst);
        tracing::debug!(enabled, "Debounce arming toggled");
    }

    /// Returns true if arming is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Returns the number of armed timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.table.lock().entries.len()
    }

    /// Returns when the timer for `device_id` will fire, if armed.
    #[must_use]
    pub fn fire_at(&self, device_id: &str) -> Option<Instant> {
        self.lock().fire_at(device_id)
    }

    /// Aborts every armed timer.
    pub fn shutdown(&self) {
        let mut table = self.shared.table.lock();
        let count = table.entries.len();
        for (_, entry) in table.entries.drain() {
            entry.handle.abort();
        }
        if count > 0 {
            tracing::debug!(count, "Aborted pending timers");
        }
    }
}

impl Drop for DebounceTimers {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Exclusive access to the timer table.
pub struct TimerGuard<'a> {
    table: MutexGuard<'a, TimerTable>,
    shared: &'a Arc<Shared>,
}

impl fmt::Debug for TimerGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerGuard")
            .field("pending", &self.table.entries.len())
            .finish_non_exhaustive()
    }
}

impl TimerGuard<'_> {
    /// Arms (or re-arms) the timer for `device_id`.
    ///
    /// The previous timer, if any, is aborted and its generation invalidated.
    /// Returns false if arming is disabled, no tokio runtime is available, or
    /// the quiet period cannot be added to the current instant.
    pub fn arm(&mut self, device_id: &str) -> bool {
        if !self.shared.enabled.load(Ordering::SeqCst) {
            tracing::trace!(device = %device_id, "Debounce disabled, not arming");
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(device = %device_id, "No tokio runtime, cannot arm timer");
            return false;
        };

        let Some(fire_at) = Instant::now().checked_add(self.shared.quiet_period) else {
            tracing::warn!(
                device = %device_id,
                quiet_period = ?self.shared.quiet_period,
                "Quiet period out of range, not arming"
            );
            return false;
        };
        let generation = self.table.next_generation;
        self.table.next_generation += 1;

        let shared: Weak<Shared> = Arc::downgrade(self.shared);
        let id = device_id.to_string();
        let task = runtime.spawn(async move {
            time::sleep_until(fire_at).await;
            if let Some(shared) = shared.upgrade() {
                shared.fire(&id, generation);
            }
        });

        let entry = TimerEntry {
            generation,
            fire_at,
            handle: task.abort_handle(),
        };
        if let Some(previous) = self.table.entries.insert(device_id.to_string(), entry) {
            previous.handle.abort();
            tracing::trace!(device = %device_id, generation, "Timer re-armed");
        } else {
            tracing::trace!(device = %device_id, generation, "Timer armed");
        }
        true
    }

    /// Cancels the timer for `device_id`. Returns true if one was armed.
    pub fn cancel(&mut self, device_id: &str) -> bool {
        match self.table.entries.remove(device_id) {
            Some(entry) => {
                entry.handle.abort();
                tracing::trace!(device = %device_id, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Returns true if a timer is armed for `device_id`.
    #[must_use]
    pub fn is_armed(&self, device_id: &str) -> bool {
        self.table.entries.contains_key(device_id)
    }

    /// Returns when the timer for `device_id` will fire, if armed.
    #[must_use]
    pub fn fire_at(&self, device_id: &str) -> Option<Instant> {
        self.table.entries.get(device_id).map(|entry| entry.fire_at)
    }
}
