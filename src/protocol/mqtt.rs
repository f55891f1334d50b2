// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport feeding the dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use tokio::task::AbortHandle;

use crate::error::ProtocolError;
use crate::manager::{DispatchOutcome, Dispatcher};
use crate::protocol::Topic;

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

const DEFAULT_PORT: u16 = 1883;
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Subscribes to the hub's topic tree and forwards every publish to a
/// [`Dispatcher`].
///
/// The event loop runs on a background task until the connection fails or
/// the bridge is dropped. Reconnection is left to the caller.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use aqara_bridge::directory::InMemoryDirectory;
/// use aqara_bridge::manager::{BridgeConfig, Dispatcher};
/// use aqara_bridge::protocol::MqttBridge;
///
/// # async fn example() -> Result<(), aqara_bridge::error::ProtocolError> {
/// let directory = Arc::new(InMemoryDirectory::new());
/// let dispatcher = Arc::new(Dispatcher::new(
///     BridgeConfig::default(),
///     directory.clone(),
///     directory,
/// ));
///
/// let bridge = MqttBridge::connect("mqtt://192.168.1.50:1883", dispatcher).await?;
/// assert_eq!(bridge.subscription(), "AqaraHub/#");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MqttBridge {
    client: AsyncClient,
    dispatcher: Arc<Dispatcher>,
    subscription: String,
    event_loop: AbortHandle,
}

impl MqttBridge {
    /// Connects to `broker_url` with default options.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the subscription cannot be queued.
    pub async fn connect(
        broker_url: impl Into<String>,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self, ProtocolError> {
        MqttBridgeBuilder::new()
            .broker(broker_url)
            .build(dispatcher)
            .await
    }

    /// Returns the subscribed topic filter.
    #[must_use]
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Returns the dispatcher messages are forwarded to.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Returns true while the event loop task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.event_loop.is_finished()
    }

    /// Sends a disconnect to the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        self.client.disconnect().await.map_err(ProtocolError::Mqtt)
    }
}

impl Drop for MqttBridge {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

/// Parses an MQTT URL into host and port.
fn parse_mqtt_url(url: &str) -> Result<(String, u16), ProtocolError> {
    let url = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    if url.is_empty() {
        return Err(ProtocolError::InvalidAddress("empty broker address".to_string()));
    }

    let (host, port) = if let Some((h, p)) = url.rsplit_once(':') {
        let port = p
            .parse()
            .map_err(|_| ProtocolError::InvalidAddress(format!("Invalid port: {p}")))?;
        (h.to_string(), port)
    } else {
        (url.to_string(), DEFAULT_PORT)
    };

    Ok((host, port))
}

/// Forwards one publish to the dispatcher.
///
/// Publishes under a foreign root are logged and dropped here, since the
/// subscription should never deliver them.
fn route_publish(dispatcher: &Dispatcher, topic: &str, payload: &[u8]) -> Option<DispatchOutcome> {
    let parsed = Topic::parse(dispatcher.root_topic(), topic);
    if !parsed.matches_root() {
        tracing::error!(
            expected = %parsed.expected_root(),
            actual = %parsed.root_segment(),
            "Publish outside the subscribed root"
        );
        return None;
    }
    Some(dispatcher.on_data(topic, payload))
}

async fn handle_mqtt_events(mut event_loop: EventLoop, dispatcher: Arc<Dispatcher>) {
    use rumqttc::{Event, Packet};

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT connected");
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::trace!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "Received MQTT message"
                );
                route_publish(&dispatcher, &publish.topic, &publish.payload);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT event loop error");
                break;
            }
        }
    }
}

/// Builder for an [`MqttBridge`] with custom connection options.
#[derive(Debug, Default)]
pub struct MqttBridgeBuilder {
    broker: Option<String>,
    username: Option<String>,
    password: Option<String>,
    client_id: Option<String>,
    keep_alive: Option<Duration>,
}

impl MqttBridgeBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the MQTT broker URL (`mqtt://`, `tcp://` or bare `host[:port]`).
    #[must_use]
    pub fn broker(mut self, broker: impl Into<String>) -> Self {
        self.broker = Some(broker.into());
        self
    }

    /// Sets authentication credentials for the MQTT broker.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets a custom client ID.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the keep-alive interval.
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.keep_alive = Some(duration);
        self
    }

    /// Connects, subscribes to `<root>/#` and starts the event loop.
    ///
    /// # Errors
    ///
    /// Returns error if the broker is missing or invalid, or the subscription
    /// cannot be queued.
    pub async fn build(self, dispatcher: Arc<Dispatcher>) -> Result<MqttBridge, ProtocolError> {
        let broker = self
            .broker
            .ok_or_else(|| ProtocolError::InvalidAddress("broker is required".to_string()))?;
        let (host, port) = parse_mqtt_url(&broker)?;

        let client_id = self.client_id.unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("aqara_bridge_{}_{}", std::process::id(), counter)
        });

        let mut mqtt_options = MqttOptions::new(&client_id, host, port);
        mqtt_options.set_keep_alive(self.keep_alive.unwrap_or(DEFAULT_KEEP_ALIVE));
        mqtt_options.set_clean_session(true);
        if let (Some(username), Some(password)) = (self.username, self.password) {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let subscription = format!("{}/#", dispatcher.root_topic());
        client
            .subscribe(&subscription, QoS::AtLeastOnce)
            .await
            .map_err(ProtocolError::Mqtt)?;

        let task = tokio::spawn(handle_mqtt_events(event_loop, Arc::clone(&dispatcher)));

        // Let CONNECT and SUBSCRIBE reach the broker before returning.
        tokio::time::sleep(Duration::from_millis(500)).await;

        tracing::debug!(
            client_id = %client_id,
            subscription = %subscription,
            "MQTT bridge started"
        );

        Ok(MqttBridge {
            client,
            dispatcher,
            subscription,
            event_loop: task.abort_handle(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DeviceDirectory, InMemoryDirectory};
    use crate::manager::BridgeConfig;

    fn dispatcher() -> (Dispatcher, Arc<InMemoryDirectory>) {
        let directory = Arc::new(InMemoryDirectory::new());
        let dispatcher = Dispatcher::new(
            BridgeConfig::default().with_debounce(false),
            directory.clone(),
            directory.clone(),
        );
        (dispatcher, directory)
    }

    #[test]
    fn parse_mqtt_url_with_port() {
        let (host, port) = parse_mqtt_url("mqtt://192.168.1.50:1884").unwrap();
        assert_eq!(host, "192.168.1.50");
        assert_eq!(port, 1884);
    }

    #[test]
    fn parse_mqtt_url_default_port() {
        let (host, port) = parse_mqtt_url("hub.local").unwrap();
        assert_eq!(host, "hub.local");
        assert_eq!(port, DEFAULT_PORT);
    }

    #[test]
    fn parse_mqtt_url_rejects_bad_input() {
        assert!(matches!(
            parse_mqtt_url("tcp://hub.local:port"),
            Err(ProtocolError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_mqtt_url("mqtt://"),
            Err(ProtocolError::InvalidAddress(_))
        ));
    }

    #[test]
    fn builder_records_options() {
        let builder = MqttBridgeBuilder::new()
            .broker("mqtt://broker:1883")
            .credentials("user", "pass")
            .client_id("bridge")
            .keep_alive(Duration::from_secs(60));

        assert_eq!(builder.broker.as_deref(), Some("mqtt://broker:1883"));
        assert_eq!(builder.username.as_deref(), Some("user"));
        assert_eq!(builder.password.as_deref(), Some("pass"));
        assert_eq!(builder.client_id.as_deref(), Some("bridge"));
        assert_eq!(builder.keep_alive, Some(Duration::from_secs(60)));
    }

    #[test]
    fn foreign_root_publish_is_dropped() {
        let (dispatcher, directory) = dispatcher();
        let outcome = route_publish(
            &dispatcher,
            "OtherHub/dev/1/in/Basic/Report Attributes/ModelIdentifier",
            br#"{"type":"string","value":"lumi.weather"}"#,
        );
        assert!(outcome.is_none());
        assert!(directory.is_empty());
    }

    #[test]
    fn publish_reaches_dispatcher() {
        let (dispatcher, directory) = dispatcher();
        let outcome = route_publish(
            &dispatcher,
            "AqaraHub/dev/1/in/Basic/Report Attributes/ModelIdentifier",
            br#"{"type":"string","value":"lumi.weather"}"#,
        );
        assert_eq!(outcome.and_then(|o| o.handle()), Some(1));
        assert!(directory.find_by_device_id("dev").is_some());
    }
}
