//! Error taxonomy.
//!
//! Startup failures (configuration, connection, subscription) and session
//! failures (malformed trace record, publish, IO) are kept apart so callers
//! can tell a run that never began from one that was cut short.

pub mod types;
