use std::io;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::warn;
use serde::{Deserialize, Serialize};

use super::duration::{format_duration, parse_duration};
use crate::configuration::types::{PayloadEncoding, TraceFormat};
use crate::error_handling::types::{MalformedReason, MalformedRecordError};

/// Field separator of the pipe format.
pub const PIPE_SEPARATOR: char = '|';

/// A decoded trace line, ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    /// Time since the previous record was captured.
    pub elapsed: Duration,
    pub topic: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRecord {
    elapsed: String,
    topic: String,
    payload: String,
}

/// Encodes and decodes single trace lines for one format/encoding pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceCodec {
    pub format: TraceFormat,
    pub encoding: PayloadEncoding,
}

impl TraceCodec {
    pub fn new(format: TraceFormat, encoding: PayloadEncoding) -> Self {
        Self { format, encoding }
    }

    /// Renders one record as a line, without the trailing newline.
    pub fn encode(&self, elapsed: Duration, topic: &str, payload: &[u8]) -> io::Result<String> {
        let elapsed = format_duration(elapsed);
        let payload = self.encode_payload(topic, payload);
        match self.format {
            TraceFormat::Pipe => Ok(format!(
                "{}{}{}{}{}",
                elapsed, PIPE_SEPARATOR, topic, PIPE_SEPARATOR, payload
            )),
            TraceFormat::Json => {
                let record = JsonRecord {
                    elapsed,
                    topic: topic.to_string(),
                    payload,
                };
                serde_json::to_string(&record).map_err(io::Error::from)
            }
        }
    }

    /// Parses one line. Blank lines yield `Ok(None)`.
    pub fn decode(&self, line: &str) -> Result<Option<TraceRecord>, MalformedRecordError> {
        // One LF or CRLF terminator; any other `\r` is payload.
        let line = match line.strip_suffix('\n') {
            Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
            None => line,
        };
        if line.trim().is_empty() {
            return Ok(None);
        }

        let (elapsed, topic, payload) = match self.format {
            TraceFormat::Pipe => {
                let fields: Vec<&str> = line.split(PIPE_SEPARATOR).collect();
                if fields.len() < 3 {
                    return Err(MalformedRecordError::new(MalformedReason::MissingFields(
                        fields.len(),
                    )));
                }
                if fields.len() > 3 {
                    warn!(
                        "Record on '{}' has {} fields; payload text after the third separator is dropped",
                        fields[1],
                        fields.len()
                    );
                }
                (
                    fields[0].to_string(),
                    fields[1].to_string(),
                    fields[2].to_string(),
                )
            }
            TraceFormat::Json => {
                let record: JsonRecord = serde_json::from_str(line).map_err(|e| {
                    MalformedRecordError::new(MalformedReason::BadJson(e.to_string()))
                })?;
                (record.elapsed, record.topic, record.payload)
            }
        };

        let elapsed = parse_duration(&elapsed)
            .map_err(|e| MalformedRecordError::new(MalformedReason::BadDuration(e)))?;
        let payload = self.decode_payload(payload)?;
        Ok(Some(TraceRecord {
            elapsed,
            topic,
            payload,
        }))
    }

    fn encode_payload(&self, topic: &str, payload: &[u8]) -> String {
        match self.encoding {
            PayloadEncoding::Base64 => STANDARD.encode(payload),
            PayloadEncoding::Text => match String::from_utf8(payload.to_vec()) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        "Payload on '{}' is not valid UTF-8; storing a lossy copy (use binary mode)",
                        topic
                    );
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            },
        }
    }

    fn decode_payload(&self, payload: String) -> Result<Vec<u8>, MalformedRecordError> {
        match self.encoding {
            PayloadEncoding::Base64 => STANDARD
                .decode(payload.as_bytes())
                .map_err(|e| MalformedRecordError::new(MalformedReason::BadBase64(e.to_string()))),
            PayloadEncoding::Text => Ok(payload.into_bytes()),
        }
    }
}
