//! Bounded FIFO between the bus delivery path and the recorder.
//!
//! The queue never drops: when it is full, [`CaptureSender::enqueue`] waits
//! until the recorder makes room. A recorder that falls permanently behind
//! therefore stalls message delivery on the bus client itself, which is the
//! price of losing nothing.

use log::trace;
use tokio::sync::mpsc;

use super::types::CapturedMessage;

/// Default number of messages buffered between delivery and recording.
pub const DEFAULT_CAPACITY: usize = 100;

pub struct CaptureQueue;

impl CaptureQueue {
    /// Creates a queue holding at most `capacity` messages.
    ///
    /// # Panics
    /// Panics if `capacity` is zero; configuration validation rejects that
    /// value before a queue is ever built.
    pub fn bounded(capacity: usize) -> (CaptureSender, CaptureReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (CaptureSender { tx }, CaptureReceiver { rx })
    }
}

/// Producer half; cloned into every delivery context.
#[derive(Debug, Clone)]
pub struct CaptureSender {
    tx: mpsc::Sender<CapturedMessage>,
}

/// The recorder is gone; the message was not queued.
#[derive(Debug)]
pub struct QueueClosed(pub CapturedMessage);

impl CaptureSender {
    /// Appends `message`, waiting while the queue is full.
    pub async fn enqueue(&self, message: CapturedMessage) -> Result<(), QueueClosed> {
        if self.tx.capacity() == 0 {
            trace!("capture queue full, delivery waits");
        }
        self.tx
            .send(message)
            .await
            .map_err(|mpsc::error::SendError(m)| QueueClosed(m))
    }

    /// Like [`enqueue`](Self::enqueue) for callers outside the async runtime.
    ///
    /// Must not be called from within an async task.
    pub fn blocking_enqueue(&self, message: CapturedMessage) -> Result<(), QueueClosed> {
        self.tx
            .blocking_send(message)
            .map_err(|mpsc::error::SendError(m)| QueueClosed(m))
    }
}

/// Consumer half, owned by the recorder.
#[derive(Debug)]
pub struct CaptureReceiver {
    rx: mpsc::Receiver<CapturedMessage>,
}

impl CaptureReceiver {
    /// Waits for the next message. `None` once every sender is gone and the
    /// queue is empty.
    pub async fn dequeue(&mut self) -> Option<CapturedMessage> {
        self.rx.recv().await
    }

    /// Stops accepting new messages; already queued ones can still be read.
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
