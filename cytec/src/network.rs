//! Connection provider abstraction for real and scripted devices.
//!
//! The session layer never touches `std::net` directly. It asks a
//! [`NetworkProvider`] for a [`DeviceStream`], which lets the same session
//! code run against a real device over TCP or against the deterministic
//! [`ScriptedNetwork`](crate::ScriptedNetwork) in tests.
//!
//! Everything here is blocking: the device protocol allows exactly one
//! command in flight, so there is nothing to gain from async I/O.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::DeviceEndpoint;

/// A connected byte stream to a device.
pub trait DeviceStream: Read + Write {
    /// Apply the same timeout to every subsequent read and write.
    ///
    /// A read that hits the timeout must fail with
    /// [`io::ErrorKind::WouldBlock`] or [`io::ErrorKind::TimedOut`].
    fn set_io_timeout(&self, timeout: Duration) -> io::Result<()>;

    /// Shut down both directions of the stream.
    fn shutdown(&self) -> io::Result<()>;
}

/// Provider trait for opening device streams.
///
/// Clone allows every session to keep its own handle for reconnects.
pub trait NetworkProvider: Clone {
    /// The stream type produced by this provider.
    type Stream: DeviceStream;

    /// Open a stream to the endpoint. No connect timeout is applied.
    fn connect(&self, endpoint: &DeviceEndpoint) -> io::Result<Self::Stream>;
}

/// Real TCP networking.
#[derive(Debug, Clone, Copy)]
pub struct TcpNetworkProvider;

impl TcpNetworkProvider {
    /// Create a new TCP network provider.
    pub fn new() -> Self {
        Self
    }
}

impl Default for TcpNetworkProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkProvider for TcpNetworkProvider {
    type Stream = TcpStream;

    fn connect(&self, endpoint: &DeviceEndpoint) -> io::Result<Self::Stream> {
        TcpStream::connect((endpoint.host.as_str(), endpoint.port))
    }
}

impl DeviceStream for TcpStream {
    fn set_io_timeout(&self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))?;
        self.set_write_timeout(Some(timeout))
    }

    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Whether an I/O error is a read/write timeout rather than a socket failure.
///
/// Unix reports an expired socket timeout as `WouldBlock`, Windows as
/// `TimedOut`.
pub fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
