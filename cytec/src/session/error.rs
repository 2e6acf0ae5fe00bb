//! Error types for session operations.

use std::io;
use thiserror::Error;

use crate::DeviceEndpoint;

/// Errors that can occur during session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Opening the stream failed. The endpoint is unreachable or misconfigured.
    #[error(transparent)]
    Connect(io::Error),

    /// A socket-level error on an open stream.
    ///
    /// Recovered by reconnecting inside the retry loops; it only reaches the
    /// caller when writing the command line itself fails.
    #[error("socket error on {endpoint}: {source}")]
    Socket {
        /// Endpoint of the failing session.
        endpoint: DeviceEndpoint,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// No attempt ended with an idle, healthy connection.
    #[error("session to {endpoint}: socket validation failed after {attempts} attempts")]
    ValidationFailed {
        /// Endpoint of the failing session.
        endpoint: DeviceEndpoint,
        /// Attempts made.
        attempts: u32,
    },
}

impl SessionError {
    /// Whether a reconnect may clear the error.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::Socket { .. })
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
