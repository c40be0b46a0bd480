pub mod capture_queue;
pub mod recorder;
pub mod types;

pub use capture_queue::{CaptureQueue, CaptureReceiver, CaptureSender, DEFAULT_CAPACITY};
pub use recorder::Recorder;
pub use types::CapturedMessage;
