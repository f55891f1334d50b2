// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Auto-clear behaviour of motion and vibration sensors, on paused time.

use std::sync::Arc;
use std::time::Duration;

use aqara_bridge::{
    BridgeConfig, DeviceDirectory, DeviceRecord, DispatchOutcome, Dispatcher, InMemoryDirectory,
    NewDevice, TypeDescriptor,
};
use tokio::time::sleep;

const QUIET: Duration = Duration::from_secs(120);
const OCCUPANCY: &str = "AqaraHub/hall/1/in/Occupancy Sensing/Report Attributes/Occupancy";
const DETECTED: &[u8] =
    br#"{"type":"bitmap8","value":[true,false,false,false,false,false,false,false]}"#;

fn switch_record(handle: u32, device_id: &str, descriptor: TypeDescriptor) -> DeviceRecord {
    let mut record = DeviceRecord::from_new_device(NewDevice {
        name: device_id.to_string(),
        handle,
        descriptor,
        device_id: device_id.to_string(),
    });
    record.semantic_state = "Off".to_string();
    record.battery_level = 70;
    record
}

fn setup(config: BridgeConfig) -> (Dispatcher, Arc<InMemoryDirectory>) {
    let directory = Arc::new(InMemoryDirectory::with_records([
        switch_record(1, "hall", TypeDescriptor::MOTION_SENSOR),
        switch_record(2, "shelf", TypeDescriptor::ON_OFF_SWITCH),
    ]));
    let dispatcher = Dispatcher::new(config, directory.clone(), directory.clone());
    (dispatcher, directory)
}

fn state(directory: &InMemoryDirectory, handle: u32) -> String {
    directory.get(handle).unwrap().semantic_state
}

#[tokio::test(start_paused = true)]
async fn detection_clears_after_quiet_period() {
    let (dispatcher, directory) = setup(BridgeConfig::default());

    dispatcher.on_data(OCCUPANCY, DETECTED);
    assert_eq!(state(&directory, 1), "On");
    assert_eq!(dispatcher.timers().pending(), 1);

    sleep(QUIET - Duration::from_secs(1)).await;
    assert_eq!(state(&directory, 1), "On");

    sleep(Duration::from_secs(2)).await;
    let record = directory.get(1).unwrap();
    assert_eq!(record.semantic_state, "Off");
    assert_eq!(record.discrete_state, 0);
    assert_eq!(record.battery_level, 70);
    assert_eq!(dispatcher.timers().pending(), 0);
    assert_eq!(directory.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn rearm_fires_once_measured_from_second_arm() {
    let (dispatcher, directory) = setup(BridgeConfig::default());

    dispatcher.on_data(OCCUPANCY, DETECTED);
    sleep(Duration::from_secs(60)).await;
    dispatcher.on_data(OCCUPANCY, DETECTED);
    assert_eq!(dispatcher.timers().pending(), 1);

    // Past the first deadline, before the second.
    sleep(QUIET - Duration::from_secs(1)).await;
    assert_eq!(state(&directory, 1), "On");
    assert_eq!(directory.write_count(), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(state(&directory, 1), "Off");
    assert_eq!(directory.write_count(), 2);

    sleep(QUIET * 3).await;
    assert_eq!(directory.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn clear_uses_current_record() {
    let (dispatcher, directory) = setup(BridgeConfig::default());

    dispatcher.on_data(OCCUPANCY, DETECTED);
    sleep(Duration::from_secs(30)).await;
    dispatcher.on_data("AqaraHub/hall/linkquality", b"150");
    assert_eq!(directory.get(1).unwrap().signal_level, 15);

    sleep(QUIET).await;
    let record = directory.get(1).unwrap();
    assert_eq!(record.semantic_state, "Off");
    assert_eq!(record.signal_level, 15);
    assert_eq!(record.battery_level, 70);
}

#[tokio::test(start_paused = true)]
async fn vibration_auto_clears() {
    let (dispatcher, directory) =
        setup(BridgeConfig::default().with_quiet_period(Duration::from_secs(10)));

    dispatcher.on_data(
        "AqaraHub/shelf/1/in/Door Lock/Report Attributes/0x0055",
        br#"{"type":"uint16","value":1}"#,
    );
    assert_eq!(state(&directory, 2), "On");

    sleep(Duration::from_secs(11)).await;
    assert_eq!(state(&directory, 2), "Off");
    assert_eq!(state(&directory, 1), "Off");
}

#[tokio::test(start_paused = true)]
async fn disabled_arming_leaves_state_set() {
    let (dispatcher, directory) = setup(BridgeConfig::default().with_debounce(false));

    dispatcher.on_data(OCCUPANCY, DETECTED);
    assert_eq!(dispatcher.timers().pending(), 0);

    sleep(QUIET * 2).await;
    assert_eq!(state(&directory, 1), "On");

    dispatcher.timers().set_enabled(true);
    dispatcher.on_data(OCCUPANCY, DETECTED);
    assert_eq!(dispatcher.timers().pending(), 1);
    sleep(QUIET + Duration::from_secs(1)).await;
    assert_eq!(state(&directory, 1), "Off");
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_pending_timers() {
    let (dispatcher, directory) = setup(BridgeConfig::default());

    dispatcher.on_data(OCCUPANCY, DETECTED);
    dispatcher.timers().shutdown();
    assert_eq!(dispatcher.timers().pending(), 0);

    sleep(QUIET * 2).await;
    assert_eq!(state(&directory, 1), "On");
}

#[tokio::test(start_paused = true)]
async fn unbounded_quiet_period_applies_without_arming() {
    let (dispatcher, directory) = setup(BridgeConfig::default().with_quiet_period(Duration::MAX));

    let outcome = dispatcher.on_data(OCCUPANCY, DETECTED);
    assert!(matches!(outcome, DispatchOutcome::Updated { written: true, .. }));
    assert_eq!(state(&directory, 1), "On");
    assert_eq!(dispatcher.timers().pending(), 0);
}
