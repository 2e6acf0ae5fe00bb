//! Error types for loop operations.

use thiserror::Error;

use crate::SessionError;

/// Errors raised while clearing or latching loops.
#[derive(Error, Debug)]
pub enum LoopError {
    /// The session could not carry the command.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// The device did not acknowledge `C` with `0`.
    #[error("cannot clear loops, incorrect output: {response:?}")]
    ClearRejected {
        /// Raw response from the device.
        response: String,
    },

    /// The device did not acknowledge `L 0 <port>` with `1`.
    #[error("cannot latch port {port}, incorrect output: {response:?}")]
    LatchRejected {
        /// Port whose latch command was rejected.
        port: u8,
        /// Raw response from the device.
        response: String,
    },
}

impl LoopError {
    /// Whether the device answered with something other than the expected code.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            LoopError::ClearRejected { .. } | LoopError::LatchRejected { .. }
        )
    }
}

/// Result type for loop operations.
pub type LoopResult<T> = Result<T, LoopError>;
