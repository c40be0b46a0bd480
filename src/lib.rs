pub mod configuration;
pub use configuration::*;

pub mod controller;
pub use controller::Controller;

pub mod data_capture;
pub mod error_handling;
pub mod message_bus;
pub mod replay;
pub mod session_management;
pub mod trace_format;
