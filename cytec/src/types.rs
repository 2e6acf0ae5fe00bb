//! Device addressing.

use serde::{Deserialize, Serialize};

/// Host and TCP port of one latency-loop device.
///
/// A session is bound to exactly one endpoint for its whole life; reaching a
/// different endpoint means closing the session and opening a new one.
///
/// # Examples
///
/// ```
/// use cytec::DeviceEndpoint;
///
/// let endpoint = DeviceEndpoint::new("10.0.0.12", 5000);
/// assert_eq!(endpoint.to_string(), "10.0.0.12:5000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port of the command interface.
    pub port: u16,
}

impl DeviceEndpoint {
    /// Create a new endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Bare IPv6 literals need brackets to stay parseable as host:port.
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
