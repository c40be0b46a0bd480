//! Process-level orchestration: mode selection, broker connection,
//! signal-driven cancellation and dispatch to the recorder or player.

pub mod controller_handler;
pub mod mode;

#[cfg(test)]
mod integration_tests;

pub use controller_handler::Controller;
pub use mode::{resolve_mode, RunMode, StdinKind};
