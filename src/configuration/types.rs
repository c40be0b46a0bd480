use std::path::PathBuf;

use clap::ValueEnum;
use serde::Deserialize;

/// How payload bytes are written into the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadEncoding {
    /// Payload stored as UTF-8 text.
    #[default]
    Text,
    /// Payload stored as standard base64.
    Base64,
}

impl PayloadEncoding {
    pub fn from_binary_flag(binary: bool) -> Self {
        if binary {
            PayloadEncoding::Base64
        } else {
            PayloadEncoding::Text
        }
    }
}

/// Line layout of the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// One JSON object per line; any topic or payload content survives.
    #[default]
    Json,
    /// `<elapsed>|<topic>|<payload>`; breaks if a field contains `|`.
    Pipe,
}

/// Which side of the boombox runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSelection {
    /// Play when stdin is a pipe or regular file, record otherwise.
    #[default]
    Auto,
    Record,
    Play,
}

/// What to do with captured-but-unwritten messages on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPolicy {
    /// Drop whatever is still queued.
    #[default]
    Discard,
    /// Write out everything already queued before returning.
    Drain,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TlsOptions {
    pub ca_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub alpn: Option<String>,
}

impl TlsOptions {
    pub fn is_empty(&self) -> bool {
        self.ca_file.is_none()
            && self.cert_file.is_none()
            && self.key_file.is_none()
            && self.alpn.is_none()
    }
}

/// Identity and transport settings handed to the broker client.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub broker_url: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
    pub tls: TlsOptions,
}
