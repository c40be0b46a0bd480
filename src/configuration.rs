pub mod config;
pub mod types;

pub use config::{Args, Config, Session};
pub use types::{ModeSelection, PayloadEncoding, ShutdownPolicy, TraceFormat};
