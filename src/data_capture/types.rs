//! Common data types used across the data_capture subsystem.

use tokio::time::Instant;

/// One inbound message, stamped when the bus handed it over.
///
/// Created by the delivery glue, consumed once by the recorder, never
/// mutated in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedMessage {
    /// Monotonic arrival time.
    pub received_at: Instant,
    pub topic: String,
    pub payload: Vec<u8>,
}

impl CapturedMessage {
    /// Stamps a message with the current monotonic time.
    pub fn now(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self::at(Instant::now(), topic, payload)
    }

    pub fn at(received_at: Instant, topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            received_at,
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}
