//! Persistent device session.
//!
//! A [`Session`] owns one live stream to a [`DeviceEndpoint`](crate::DeviceEndpoint)
//! and runs the strict request/response protocol over it.
//!
//! # Lifecycle
//!
//! ```text
//! ┌──────────────┐  connect   ┌───────────┐  validate  ┌───────────┐
//! │ Disconnected ├───────────►│ Connected ├───────────►│ Validated │
//! └──────────────┘            └─────▲─────┘            └─────┬─────┘
//!                                   │   send / receive       │
//!                                   └────────────────────────┘
//! ```
//!
//! Validation is re-entered before every command. Socket-level errors are
//! recovered by reconnecting, bounded by [`SessionConfig::max_attempts`].
//! Dropping or closing the session releases the stream.

/// Core session implementation
pub mod core;

/// Configuration for timeouts and retry budget
pub mod config;

/// Error types specific to session operations
pub mod error;

pub use self::core::{Session, LINE_TERMINATOR};
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
