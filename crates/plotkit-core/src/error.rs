//! Error handling for PlotKit
//!
//! Provides the shared error type used across the streaming layer:
//! - Connection errors (transport open/read/write failures)
//! - Session errors (invalid state machine requests)
//! - I/O errors (job file reads and writes)
//!
//! Device-reported command faults are not an `Error`: the streamer
//! counts them and keeps going.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Top-level error type shared across PlotKit crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport connection failure. Fatal to an active transmission
    /// session.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An operation was requested in a state that does not allow it.
    #[error("Session error: {0}")]
    Session(String),

    /// I/O error reading or writing a job file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a connection error from any displayable value.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a session error from any displayable value.
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }
}

/// Result type alias using the PlotKit error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("port closed");
        assert_eq!(err.to_string(), "Connection error: port closed");

        let err = Error::session("session already active");
        assert_eq!(err.to_string(), "Session error: session already active");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
