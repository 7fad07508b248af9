//! Formatting of the traces and events produced while building and executing
//! operation chains.

use std::io;

use tracing_subscriber::fmt;

pub use tracing_core::Level;

/// possible log levels
pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Installs a global subscriber writing compact, untimestamped lines to
/// stderr. With no level, nothing is installed and nothing is printed.
///
/// Calling this twice in one process panics, as a global subscriber can only
/// be set once.
pub fn init(level: Option<Level>) {
    if let Some(level) = level {
        let format = fmt::format().without_time().with_target(false).compact();
        fmt()
            .with_max_level(level)
            .event_format(format)
            .with_writer(io::stderr)
            .init();
    }
}
