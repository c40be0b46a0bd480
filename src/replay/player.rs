//! Playback side of the boombox.
//!
//! The [`Player`] reads a trace line by line and republishes each record,
//! sleeping for the record's elapsed time first unless fast-forward is on.
//! Records go out strictly in file order with at most one publish in
//! flight. The first malformed line or failed publish ends the session.

use log::{debug, info, trace};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use crate::configuration::config::Session;
use crate::error_handling::types::SessionError;
use crate::message_bus::MessageBus;
use crate::session_management::Progress;
use crate::trace_format::TraceCodec;

const COUNTER_LABEL: &str = "PLAY";
const END_LABEL: &str = "END ";

pub struct Player {
    codec: TraceCodec,
    fast_forward: bool,
    progress: Progress,
}

impl Player {
    pub fn new(session: &Session, progress: Progress) -> Self {
        Self {
            codec: session.codec(),
            fast_forward: session.fast_forward,
            progress,
        }
    }

    /// Replays `input` onto `bus` until end of input or `cancel` fires.
    ///
    /// Returns the number of records published.
    pub async fn play<R, B>(
        &mut self,
        input: R,
        bus: &B,
        cancel: CancellationToken,
    ) -> Result<u64, SessionError>
    where
        R: AsyncBufRead + Unpin,
        B: MessageBus,
    {
        let mut lines = input.lines();
        let mut line_no = 0usize;

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Playback interrupted after {} record(s)", self.progress.count());
                    return Ok(self.progress.count());
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = line else { break };
            line_no += 1;

            let Some(record) = self
                .codec
                .decode(&line)
                .map_err(|e| e.at_line(line_no))?
            else {
                continue;
            };

            if !self.fast_forward && !record.elapsed.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("Playback interrupted after {} record(s)", self.progress.count());
                        return Ok(self.progress.count());
                    }
                    _ = tokio::time::sleep(record.elapsed) => {}
                }
            }

            trace!(
                "line {}: {} bytes on '{}' after {:?}",
                line_no,
                record.payload.len(),
                record.topic,
                record.elapsed
            );
            bus.publish(&record.topic, record.payload).await?;
            self.progress.tick(COUNTER_LABEL);
        }

        debug!("End of trace after {} line(s)", line_no);
        self.progress.finish(END_LABEL);
        Ok(self.progress.count())
    }
}
