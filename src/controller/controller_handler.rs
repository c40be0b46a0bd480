use log::{debug, info, warn};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use super::mode::{resolve_mode, stdin_kind, RunMode};
use crate::configuration::config::Config;
use crate::data_capture::{CaptureQueue, Recorder};
use crate::error_handling::types::{BoomboxError, ConfigError};
use crate::message_bus::{MessageBus, MqttBus};
use crate::replay::Player;
use crate::session_management::Progress;

/// Wires configuration, broker connection and the recorder or player
/// together for one run of the process.
pub struct Controller {
    pub config: Config,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs until the trace is exhausted (play), a termination signal
    /// arrives, or a fatal error occurs. Returns the message count.
    pub async fn run(&self) -> Result<u64, BoomboxError> {
        let kind = stdin_kind().map_err(ConfigError::IoError)?;
        let mode = resolve_mode(self.config.mode, kind);
        debug!("stdin is {:?}; running in {:?} mode", kind, mode);

        let cancel = CancellationToken::new();
        tokio::spawn(cancel_on_signal(cancel.clone()));

        match mode {
            RunMode::Record => self.record(cancel).await,
            RunMode::Play => self.play(cancel).await,
        }
    }

    async fn record(&self, cancel: CancellationToken) -> Result<u64, BoomboxError> {
        let session = &self.config.session;
        info!("RECORDING from {}", session.broker_url);

        let (delivery, queue) = CaptureQueue::bounded(session.queue_capacity);
        let bus = MqttBus::connect(&self.config.connection, Some(delivery)).await?;

        let progress = Progress::stderr(session.counter);
        let mut recorder = Recorder::new(session, tokio::io::stdout(), progress);
        let result = recorder.run(&bus, queue, cancel.clone()).await;
        drop(recorder);

        finish(&bus, &cancel).await;
        result
    }

    async fn play(&self, cancel: CancellationToken) -> Result<u64, BoomboxError> {
        let session = &self.config.session;
        info!("PLAYBACK to {}", session.broker_url);
        if !session.topics.is_empty() {
            warn!("Topics {:?} are ignored in playback", session.topics);
        }

        let bus = MqttBus::connect(&self.config.connection, None).await?;

        let mut player = Player::new(session, Progress::stderr(session.counter));
        let result = player
            .play(BufReader::new(tokio::io::stdin()), &bus, cancel.clone())
            .await;

        finish(&bus, &cancel).await;
        Ok(result?)
    }
}

async fn finish<B: MessageBus>(bus: &B, cancel: &CancellationToken) {
    bus.disconnect().await;
    if cancel.is_cancelled() {
        info!("DISCONNECTED");
    }
}

/// Cancels `cancel` on SIGINT or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Termination requested");
    cancel.cancel();
}
