//! Per-session runtime helpers shared by the recorder and the player.

pub mod progress;

pub use progress::Progress;
