//! Error types for the runner binary.
//!
//! [`RunnerError`] wraps every failure that can stop a simulated port day.
//! Domain rejections from the engine (a full berth, a storm) are part of the
//! simulation and are logged, not returned.

use portcall_core::{ConfigError, PortError};

/// Top-level error for the runner binary.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The engine reported an internal fault.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: PortError,
    },

    /// The event logger task panicked or was cancelled.
    #[error("event logger failed: {message}")]
    EventLogger {
        /// Description of the failure.
        message: String,
    },
}
