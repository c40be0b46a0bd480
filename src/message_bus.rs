//! Broker access.
//!
//! Components:
//! - `bus_trait`: the [`MessageBus`] capability used by recorder and player.
//! - `mqtt_client`: `rumqttc`-backed implementation and delivery glue.
//! - `broker_url`: `scheme://host:port` parsing.
//! - `tls`: transport selection and PEM loading.

pub mod broker_url;
pub mod bus_trait;
pub mod mqtt_client;
pub mod tls;

pub use broker_url::BrokerAddress;
pub use bus_trait::{MessageBus, WILDCARD_TOPIC};
pub use mqtt_client::MqttBus;

#[cfg(test)]
pub(crate) mod test_support;
