//! Configuration for session timeouts and retries.

use std::time::Duration;

/// Configuration for a device session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Read/write timeout on the socket.
    ///
    /// A read that times out is how the device signals "no more data"; the
    /// protocol has no other framing.
    pub io_timeout: Duration,

    /// Attempts allowed for validation and for reading a response.
    /// Each reconnect consumes one attempt.
    pub max_attempts: u32,

    /// Size of a single read from the socket. Never zero: a zero-length
    /// read is indistinguishable from the device closing the connection.
    pub read_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(2),
            max_attempts: 3,
            read_buffer_size: 4096,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with specified parameters.
    ///
    /// A `read_buffer_size` of zero is raised to one byte.
    pub fn new(io_timeout: Duration, max_attempts: u32, read_buffer_size: usize) -> Self {
        Self {
            io_timeout,
            max_attempts,
            read_buffer_size: read_buffer_size.max(1),
        }
    }

    /// Override the socket timeout.
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    /// Override the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the size of a single read. Zero is raised to one byte.
    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size.max(1);
        self
    }

    /// Configuration for fast tests against a local emulator.
    pub fn local_emulator() -> Self {
        Self {
            io_timeout: Duration::from_millis(100),
            ..Self::default()
        }
    }
}
