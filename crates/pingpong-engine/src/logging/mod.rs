//! Logging utilities.
//!
//! Everything in the crate logs through the `log` facade; this module only
//! owns backend initialization.

mod init;

pub use init::{init_logging, LoggingConfig};
