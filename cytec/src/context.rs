//! Resource context handed to every driver invocation.
//!
//! The orchestration layer describes the target device on each call: its
//! resource name, management address and attributes. The TCP port of the
//! command interface lives in the `CLI TCP Port` attribute.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::driver::{DriverError, DriverResult};
use crate::DeviceEndpoint;

/// Attribute holding the TCP port of the device's command interface.
pub const TCP_PORT_ATTRIBUTE: &str = "CLI TCP Port";

/// Description of the device a driver operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContext {
    /// Resource name, used in log context.
    pub resource_name: String,

    /// Management address (host name or IP).
    pub address: String,

    /// Reservation the call belongs to, used in log context.
    #[serde(default)]
    pub reservation_id: Option<String>,

    /// Resource attributes by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ResourceContext {
    /// Create a context with no attributes.
    pub fn new(resource_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            address: address.into(),
            reservation_id: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Parse a context from its JSON form.
    pub fn from_json(json: &str) -> DriverResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the reservation id.
    pub fn with_reservation(mut self, reservation_id: impl Into<String>) -> Self {
        self.reservation_id = Some(reservation_id.into());
        self
    }

    /// Attribute value by name.
    ///
    /// Falls back to a model-namespaced attribute (`<Model>.<name>`) when the
    /// bare name is absent.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.attributes.get(name) {
            return Some(value.as_str());
        }
        self.attributes
            .iter()
            .find(|(key, _)| {
                key.strip_suffix(name)
                    .is_some_and(|prefix| prefix.ends_with('.'))
            })
            .map(|(_, value)| value.as_str())
    }

    /// Endpoint of the device's command interface.
    pub fn endpoint(&self) -> DriverResult<DeviceEndpoint> {
        let host = self.address.trim();
        if host.is_empty() {
            return Err(DriverError::InvalidContext(format!(
                "resource {} has no address",
                self.resource_name
            )));
        }

        let raw = self
            .attribute(TCP_PORT_ATTRIBUTE)
            .ok_or_else(|| DriverError::MissingAttribute {
                resource: self.resource_name.clone(),
                attribute: TCP_PORT_ATTRIBUTE,
            })?;
        let port = raw
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| DriverError::InvalidPort {
                resource: self.resource_name.clone(),
                value: raw.to_string(),
            })?;

        Ok(DeviceEndpoint::new(host, port))
    }
}
