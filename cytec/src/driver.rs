//! Operations exposed to the orchestration layer.
//!
//! [`LoopDriver`] resolves the device endpoint from the [`ResourceContext`]
//! of each call, obtains the cached session for it and runs the loop
//! operation. Every operation runs inside a `debug` span carrying the
//! resource name and reservation id.

use thiserror::Error;

use crate::cache::SessionCache;
use crate::context::ResourceContext;
use crate::latency::{LatencyController, LoopError};
use crate::network::NetworkProvider;
use crate::session::{SessionConfig, SessionError};

/// Errors surfaced by driver operations.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The resource lacks a required attribute.
    #[error("resource {resource} has no {attribute:?} attribute")]
    MissingAttribute {
        /// Resource name.
        resource: String,
        /// Missing attribute name.
        attribute: &'static str,
    },

    /// The TCP port attribute is not a valid port number.
    #[error("invalid TCP port {value:?} on resource {resource}")]
    InvalidPort {
        /// Resource name.
        resource: String,
        /// Raw attribute value.
        value: String,
    },

    /// The resource context is malformed.
    #[error("invalid resource context: {0}")]
    InvalidContext(String),

    /// Opening or validating the session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A loop command failed or was rejected by the device.
    #[error(transparent)]
    Loop(#[from] LoopError),
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::InvalidContext(err.to_string())
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Latency-loop driver for one owning context.
///
/// Holds the session cache and the advisory loop latency. Not thread-safe:
/// wrap it in a lock if several callers share it.
pub struct LoopDriver<N: NetworkProvider> {
    sessions: SessionCache<N>,
    controller: LatencyController,
}

impl<N: NetworkProvider> LoopDriver<N> {
    /// Create a driver opening sessions through `network`.
    pub fn new(network: N, config: SessionConfig) -> Self {
        Self {
            sessions: SessionCache::new(network, config),
            controller: LatencyController::new(),
        }
    }

    /// Prepare a fresh driver instance. No device I/O happens here.
    pub fn initialize(&mut self) {
        tracing::debug!("initializing driver");
        self.controller.reset();
    }

    /// Clear all loops then build one with `latency`.
    pub fn create_loop(&mut self, ctx: &ResourceContext, latency: u32) -> DriverResult<()> {
        let _span = operation_span(ctx, "create_loop").entered();
        tracing::debug!(latency, "creating loop");

        let session = self.sessions.obtain(&ctx.endpoint()?)?;
        self.controller.apply_latency(session, latency)?;
        Ok(())
    }

    /// Rebuild the loop one step (100) longer than the advisory latency.
    ///
    /// Returns the latency now applied.
    pub fn extend_loop(&mut self, ctx: &ResourceContext) -> DriverResult<u32> {
        let _span = operation_span(ctx, "extend_loop").entered();

        let session = self.sessions.obtain(&ctx.endpoint()?)?;
        Ok(self.controller.extend(session)?)
    }

    /// Clear all loops and reset the advisory latency to zero.
    pub fn clear_loops(&mut self, ctx: &ResourceContext) -> DriverResult<()> {
        let _span = operation_span(ctx, "clear_loops").entered();

        let session = self.sessions.obtain(&ctx.endpoint()?)?;
        self.controller.clear(session)?;
        Ok(())
    }

    /// Check that the device is reachable and its connection healthy.
    pub fn health_check(&mut self, ctx: &ResourceContext) -> DriverResult<()> {
        let _span = operation_span(ctx, "health_check").entered();

        let session = self.sessions.obtain(&ctx.endpoint()?)?;
        session.validate()?;
        tracing::debug!("device healthy");
        Ok(())
    }

    /// Close every open session.
    pub fn cleanup(&mut self) {
        tracing::debug!("cleaning up driver sessions");
        self.sessions.close_all();
    }

    /// Advisory latency: the last one applied in full.
    pub fn latency(&self) -> u32 {
        self.controller.latency()
    }

    /// Session cache backing this driver.
    pub fn sessions(&self) -> &SessionCache<N> {
        &self.sessions
    }
}

fn operation_span(ctx: &ResourceContext, operation: &'static str) -> tracing::Span {
    tracing::debug_span!(
        "cytec",
        operation,
        resource = %ctx.resource_name,
        reservation = ctx.reservation_id.as_deref().unwrap_or("-"),
    )
}
