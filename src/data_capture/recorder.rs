//! Capture side of the boombox.
//!
//! The [`Recorder`] drains the [`CaptureReceiver`] one message at a time,
//! turns each into a trace line and writes it to the output sink:
//!
//! ```text
//! bus ──► delivery task ──► CaptureQueue ──► Recorder ──► stdout
//! ```
//!
//! Elapsed times are measured against a watermark that starts at session
//! start and then tracks the arrival time of the last written message.
//! Because the queue is FIFO and arrival stamps are monotonic, the elapsed
//! value of every line is non-negative.
//!
//! The recorder runs until its cancellation token fires or the message
//! source goes away. On cancellation, queued messages are either discarded
//! (the default) or written out first, per [`ShutdownPolicy`].

use log::{debug, info, trace};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::capture_queue::CaptureReceiver;
use super::types::CapturedMessage;
use crate::configuration::config::Session;
use crate::configuration::types::ShutdownPolicy;
use crate::error_handling::types::{BoomboxError, SessionError};
use crate::message_bus::{MessageBus, WILDCARD_TOPIC};
use crate::session_management::Progress;
use crate::trace_format::TraceCodec;

const COUNTER_LABEL: &str = "REC ";

pub struct Recorder<W> {
    codec: TraceCodec,
    topics: Vec<String>,
    shutdown: ShutdownPolicy,
    out: W,
    progress: Progress,
    last_timestamp: Instant,
}

impl<W: AsyncWrite + Unpin> Recorder<W> {
    pub fn new(session: &Session, out: W, progress: Progress) -> Self {
        Self {
            codec: session.codec(),
            topics: session.topics.clone(),
            shutdown: session.shutdown,
            out,
            progress,
            last_timestamp: Instant::now(),
        }
    }

    /// Topics actually subscribed: the configured list, or the wildcard.
    pub fn subscription_topics(&self) -> Vec<String> {
        if self.topics.is_empty() {
            vec![WILDCARD_TOPIC.to_string()]
        } else {
            self.topics.clone()
        }
    }

    /// Subscribes and drains `queue` until `cancel` fires.
    ///
    /// Returns the number of messages written. A subscription failure is a
    /// startup error and nothing is recorded.
    pub async fn run<B: MessageBus>(
        &mut self,
        bus: &B,
        mut queue: CaptureReceiver,
        cancel: CancellationToken,
    ) -> Result<u64, BoomboxError> {
        let topics = self.subscription_topics();
        self.last_timestamp = Instant::now();
        bus.subscribe_multiple(&topics).await?;
        info!("INPUT TOPICS {:?}", topics);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = queue.dequeue() => match next {
                    Some(message) => self.record(message).await?,
                    None => return Err(SessionError::SourceClosed.into()),
                },
            }
        }

        if self.shutdown == ShutdownPolicy::Drain {
            queue.close();
            debug!("Draining {} queued message(s)", queue.len());
            while let Some(message) = queue.dequeue().await {
                self.record(message).await?;
            }
        } else if !queue.is_empty() {
            debug!("Discarding {} queued message(s)", queue.len());
        }

        Ok(self.progress.count())
    }

    /// Writes one message as a trace line and advances the watermark.
    pub async fn record(&mut self, message: CapturedMessage) -> Result<(), SessionError> {
        let elapsed = message
            .received_at
            .saturating_duration_since(self.last_timestamp);
        self.last_timestamp = message.received_at;

        let mut line = self
            .codec
            .encode(elapsed, &message.topic, &message.payload)?;
        line.push('\n');
        self.out.write_all(line.as_bytes()).await?;
        self.out.flush().await?;

        trace!(
            "recorded {} bytes on '{}' after {:?}",
            message.payload.len(),
            message.topic,
            elapsed
        );
        self.progress.tick(COUNTER_LABEL);
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
