//! Message bus capability
//!
//! The recorder and player only ever talk to the broker through this trait,
//! so both can run against the MQTT client or an in-memory double.
//! Inbound messages do not flow through the trait: an implementation hands
//! them to the [`CaptureSender`](crate::data_capture::CaptureSender) it was
//! connected with.

use std::future::Future;

use crate::error_handling::types::{PublishError, SubscriptionError};

/// Wildcard filter matching every topic on the broker.
pub const WILDCARD_TOPIC: &str = "#";

pub trait MessageBus: Send + Sync {
    /// Subscribes to every filter in `topics` in one request.
    ///
    /// Fails if the broker rejects any of them.
    fn subscribe_multiple(
        &self,
        topics: &[String],
    ) -> impl Future<Output = Result<(), SubscriptionError>> + Send;

    /// Publishes `payload` on `topic`, best-effort and not retained.
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;

    /// Closes the broker session. Errors are logged, not returned.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;
}
