//! Trace line formats.
//!
//! A trace is UTF-8 text, one record per line. Each record carries the
//! time elapsed since the previous capture, the topic and the payload
//! (plain text or base64).

pub mod codec;
pub mod duration;

pub use codec::{TraceCodec, TraceRecord};
pub use duration::{format_duration, parse_duration};
