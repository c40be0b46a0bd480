use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use super::bus_trait::MessageBus;
use crate::error_handling::types::{PublishError, SubscriptionError};

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub at: Instant,
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    subscriptions: Vec<Vec<String>>,
    published: Vec<Published>,
    reject_subscriptions: bool,
    fail_publish_after: Option<usize>,
    publish_latency: Duration,
    disconnected: bool,
}

/// In-memory broker double that remembers every call.
#[derive(Clone, Default)]
pub struct FakeBus {
    inner: Arc<Mutex<Inner>>,
}

impl FakeBus {
    pub fn rejecting_subscriptions() -> Self {
        let bus = Self::default();
        bus.inner.lock().unwrap().reject_subscriptions = true;
        bus
    }

    /// Accepts `n` publishes, then fails every following one.
    pub fn failing_after(n: usize) -> Self {
        let bus = Self::default();
        bus.inner.lock().unwrap().fail_publish_after = Some(n);
        bus
    }

    pub fn with_latency(latency: Duration) -> Self {
        let bus = Self::default();
        bus.inner.lock().unwrap().publish_latency = latency;
        bus
    }

    pub fn subscriptions(&self) -> Vec<Vec<String>> {
        self.inner.lock().unwrap().subscriptions.clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.inner.lock().unwrap().published.clone()
    }

    pub fn is_disconnected(&self) -> bool {
        self.inner.lock().unwrap().disconnected
    }
}

impl MessageBus for FakeBus {
    async fn subscribe_multiple(&self, topics: &[String]) -> Result<(), SubscriptionError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.reject_subscriptions {
            return Err(SubscriptionError::Rejected(topics.join(",")));
        }
        inner.subscriptions.push(topics.to_vec());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let latency = self.inner.lock().unwrap().publish_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let mut inner = self.inner.lock().unwrap();
        if let Some(limit) = inner.fail_publish_after {
            if inner.published.len() >= limit {
                return Err(PublishError::Rejected("broker said no".to_string()));
            }
        }
        inner.published.push(Published {
            at: Instant::now(),
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    async fn disconnect(&self) {
        self.inner.lock().unwrap().disconnected = true;
    }
}
