//! Session cache keyed by device endpoint.
//!
//! The driver talks to one device at a time. The cache keeps the session for
//! the endpoint it was last asked for and reuses it while the endpoint stays
//! the same. Asking for a different endpoint closes the cached session before
//! a new one is opened, so at most one session is alive per cache.

use crate::network::NetworkProvider;
use crate::session::{Session, SessionConfig, SessionResult};
use crate::DeviceEndpoint;

/// Owns the session for the most recently requested endpoint.
pub struct SessionCache<N: NetworkProvider> {
    network: N,
    config: SessionConfig,
    active: Option<Session<N>>,
}

impl<N: NetworkProvider> SessionCache<N> {
    /// Create an empty cache opening sessions with `network` and `config`.
    pub fn new(network: N, config: SessionConfig) -> Self {
        Self {
            network,
            config,
            active: None,
        }
    }

    /// Session for `endpoint`, created on first use.
    ///
    /// A cached session for another endpoint is closed first. If the new
    /// connect fails the cache is left empty.
    pub fn obtain(&mut self, endpoint: &DeviceEndpoint) -> SessionResult<&mut Session<N>> {
        let session = match self.active.take() {
            Some(session) if session.endpoint() == endpoint => session,
            previous => {
                if let Some(previous) = previous {
                    tracing::debug!(
                        from = %previous.endpoint(),
                        to = %endpoint,
                        "endpoint changed, replacing session"
                    );
                    previous.close();
                }
                Session::connect(self.network.clone(), endpoint.clone(), self.config.clone())?
            }
        };
        Ok(self.active.insert(session))
    }

    /// Cached session for `endpoint`, without connecting.
    pub fn get_mut(&mut self, endpoint: &DeviceEndpoint) -> Option<&mut Session<N>> {
        self.active
            .as_mut()
            .filter(|session| session.endpoint() == endpoint)
    }

    /// Endpoint of the cached session, if any.
    pub fn endpoint(&self) -> Option<&DeviceEndpoint> {
        self.active.as_ref().map(Session::endpoint)
    }

    /// Number of cached sessions (zero or one).
    pub fn len(&self) -> usize {
        usize::from(self.active.is_some())
    }

    /// Whether no session is cached.
    pub fn is_empty(&self) -> bool {
        self.active.is_none()
    }

    /// Close the session for `endpoint`. Returns whether one was cached.
    pub fn close(&mut self, endpoint: &DeviceEndpoint) -> bool {
        match self.active.take() {
            Some(session) if session.endpoint() == endpoint => {
                session.close();
                true
            }
            other => {
                self.active = other;
                false
            }
        }
    }

    /// Close every cached session.
    pub fn close_all(&mut self) {
        if let Some(session) = self.active.take() {
            session.close();
        }
    }
}
