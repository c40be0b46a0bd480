//! MQTT implementation of [`MessageBus`] on top of `rumqttc`.
//!
//! `rumqttc` splits a connection into a cheap request handle
//! ([`AsyncClient`]) and an [`EventLoop`] that must be polled for anything to
//! happen. [`MqttBus::connect`] polls it until the broker acknowledges the
//! session, then moves it into a background task which:
//! - stamps every inbound PUBLISH and enqueues it into the capture queue,
//!   awaiting free space when the queue is full (backpressure onto the link)
//! - forwards SUBACKs to [`MqttBus::subscribe_multiple`]
//! - stops on the first link error; nothing is retried
//!
//! When that task stops it drops its [`CaptureSender`], so a recorder waiting
//! on the queue sees the source close.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS, SubAck,
    SubscribeFilter, SubscribeReasonCode,
};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::broker_url::BrokerAddress;
use super::bus_trait::MessageBus;
use super::tls;
use crate::configuration::types::ConnectionSettings;
use crate::data_capture::{CaptureSender, CapturedMessage};
use crate::error_handling::types::{
    ConnectionError, PublishError, StartupError, SubscriptionError,
};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const SUBACK_TIMEOUT: Duration = Duration::from_secs(10);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_CAPACITY: usize = 64;
/// Largest packet the MQTT 3.1.1 wire format can express.
const MAX_PACKET_SIZE: usize = 268_435_455;

pub struct MqttBus {
    client: AsyncClient,
    address: BrokerAddress,
    subacks: Mutex<mpsc::UnboundedReceiver<SubAck>>,
    driver: StdMutex<Option<JoinHandle<()>>>,
}

impl MqttBus {
    /// Connects to the broker described by `settings`.
    ///
    /// Inbound messages are pushed into `delivery` when one is given; replay
    /// sessions pass `None` and never subscribe.
    pub async fn connect(
        settings: &ConnectionSettings,
        delivery: Option<CaptureSender>,
    ) -> Result<Self, StartupError> {
        let address: BrokerAddress = settings.broker_url.parse()?;

        // A WebSocket client dials the whole URL; the port is taken from it.
        let host = address
            .websocket_url()
            .unwrap_or_else(|| address.host.clone());
        let mut options = MqttOptions::new(&settings.client_id, host, address.port);
        options.set_keep_alive(Duration::from_secs(settings.keep_alive_secs));
        options.set_clean_session(true);
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
        if let Some(username) = &settings.username {
            options.set_credentials(username, settings.password.clone().unwrap_or_default());
        }
        options.set_transport(tls::transport_for(&address, &settings.tls)?);

        debug!("Connecting to {} as '{}'", address, settings.client_id);
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        timeout(HANDSHAKE_TIMEOUT, await_connack(&mut eventloop))
            .await
            .map_err(|_| ConnectionError::Timeout)??;
        info!("Connected to {}", address);

        let (suback_tx, suback_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(eventloop, delivery, suback_tx));

        Ok(Self {
            client,
            address,
            subacks: Mutex::new(suback_rx),
            driver: StdMutex::new(Some(driver)),
        })
    }

    pub fn address(&self) -> &BrokerAddress {
        &self.address
    }
}

async fn await_connack(eventloop: &mut EventLoop) -> Result<(), ConnectionError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return if ack.code == ConnectReturnCode::Success {
                    Ok(())
                } else {
                    Err(ConnectionError::Refused(format!("{:?}", ack.code)))
                };
            }
            Ok(event) => trace!("pre-connack event: {:?}", event),
            Err(rumqttc::ConnectionError::ConnectionRefused(code)) => {
                return Err(ConnectionError::Refused(format!("{:?}", code)));
            }
            Err(e) => return Err(ConnectionError::Unreachable(e.to_string())),
        }
    }
}

async fn drive(
    mut eventloop: EventLoop,
    mut delivery: Option<CaptureSender>,
    subacks: mpsc::UnboundedSender<SubAck>,
) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = CapturedMessage::now(publish.topic, publish.payload.to_vec());
                match &delivery {
                    Some(sender) => {
                        if sender.enqueue(message).await.is_err() {
                            debug!("Capture queue closed; further deliveries are ignored");
                            delivery = None;
                        }
                    }
                    None => trace!("Ignoring delivery on '{}'", message.topic),
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let _ = subacks.send(ack);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("Disconnect sent; stopping event loop");
                break;
            }
            Ok(event) => trace!("event: {:?}", event),
            Err(e) => {
                error!("Broker link lost: {}", e);
                break;
            }
        }
    }
}

/// Wildcards are only valid in subscriptions, never in a publish topic.
fn valid_publish_topic(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains(['+', '#', '\0'])
}

impl MessageBus for MqttBus {
    async fn subscribe_multiple(&self, topics: &[String]) -> Result<(), SubscriptionError> {
        let filters: Vec<SubscribeFilter> = topics
            .iter()
            .map(|t| SubscribeFilter::new(t.clone(), QoS::AtMostOnce))
            .collect();

        // Held across the request so concurrent subscribes cannot swap acks.
        let mut subacks = self.subacks.lock().await;
        self.client
            .subscribe_many(filters)
            .await
            .map_err(|e| SubscriptionError::RequestFailed(e.to_string()))?;

        let ack = timeout(SUBACK_TIMEOUT, subacks.recv())
            .await
            .map_err(|_| SubscriptionError::Timeout)?
            .ok_or_else(|| SubscriptionError::RequestFailed("broker link closed".to_string()))?;

        for (topic, code) in topics.iter().zip(ack.return_codes.iter()) {
            if matches!(code, SubscribeReasonCode::Failure) {
                return Err(SubscriptionError::Rejected(topic.clone()));
            }
        }
        debug!("Subscribed to {:?}", topics);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        if !valid_publish_topic(topic) {
            return Err(PublishError::Rejected(format!("invalid topic name '{}'", topic)));
        }
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| {
                debug!("Publish on '{}' failed: {}", topic, e);
                PublishError::LinkClosed
            })
    }

    async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            warn!("Disconnect request failed: {}", e);
        }
        let driver = match self.driver.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(mut handle) = driver {
            if timeout(SHUTDOWN_TIMEOUT, &mut handle).await.is_err() {
                warn!("Event loop did not stop in time; aborting it");
                handle.abort();
            }
        }
        info!("Disconnected from {}", self.address);
    }
}
