// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT bridge using mockforge-mqtt.

#![cfg(feature = "mqtt")]

use std::sync::Arc;
use std::time::Duration;

use aqara_bridge::protocol::{MqttBridge, MqttBridgeBuilder};
use aqara_bridge::{BridgeConfig, Dispatcher, InMemoryDirectory, ProtocolError};
use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use tokio::time::sleep;

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    sleep(Duration::from_millis(500)).await;
}

fn dispatcher(config: BridgeConfig) -> Arc<Dispatcher> {
    let directory = Arc::new(InMemoryDirectory::new());
    Arc::new(Dispatcher::new(config, directory.clone(), directory))
}

mod connection {
    use super::*;

    #[tokio::test]
    async fn connect_subscribes_to_root() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let bridge = MqttBridge::connect(
            format!("mqtt://127.0.0.1:{port}"),
            dispatcher(BridgeConfig::default()),
        )
        .await;

        assert!(bridge.is_ok(), "Failed to connect: {:?}", bridge.err());
        let bridge = bridge.unwrap();
        assert_eq!(bridge.subscription(), "AqaraHub/#");
        assert!(bridge.is_running());
    }

    #[tokio::test]
    async fn custom_root_topic() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let bridge = MqttBridge::connect(
            format!("tcp://127.0.0.1:{port}"),
            dispatcher(BridgeConfig::default().with_root_topic("hub2")),
        )
        .await
        .unwrap();

        assert_eq!(bridge.subscription(), "hub2/#");
        assert_eq!(bridge.dispatcher().root_topic(), "hub2");
    }

    #[tokio::test]
    async fn connect_without_scheme() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let bridge = MqttBridge::connect(
            format!("127.0.0.1:{port}"),
            dispatcher(BridgeConfig::default()),
        )
        .await;
        assert!(bridge.is_ok());
    }

    #[tokio::test]
    async fn disconnect_is_accepted() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let bridge = MqttBridge::connect(
            format!("mqtt://127.0.0.1:{port}"),
            dispatcher(BridgeConfig::default()),
        )
        .await
        .unwrap();
        assert!(bridge.disconnect().await.is_ok());
    }
}

mod builder {
    use super::*;

    #[tokio::test]
    async fn build_with_options() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let bridge = MqttBridgeBuilder::new()
            .broker(format!("mqtt://127.0.0.1:{port}"))
            .client_id("aqara_bridge_test")
            .keep_alive(Duration::from_secs(15))
            .build(dispatcher(BridgeConfig::default()))
            .await;

        assert!(bridge.is_ok());
    }

    #[tokio::test]
    async fn build_missing_broker_fails() {
        let result = MqttBridgeBuilder::new()
            .build(dispatcher(BridgeConfig::default()))
            .await;

        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn build_invalid_port_fails() {
        let result = MqttBridgeBuilder::new()
            .broker("mqtt://127.0.0.1:notaport")
            .build(dispatcher(BridgeConfig::default()))
            .await;

        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }
}
