//! # cytec
//!
//! Driver for Cytec latency-loop emulators.
//!
//! An operator asks for a target latency; the driver clears the device's
//! loops, decomposes the latency into binary-weighted increments and latches
//! one device port per increment, checking every acknowledgement.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  LoopDriver      create_loop / extend_loop / clear_loops    │
//! │                  health_check / cleanup                     │
//! ├──────────────────────────┬──────────────────────────────────┤
//! │  LatencyController       │  SessionCache                    │
//! │  • latency table         │  • one session per endpoint      │
//! │  • clear / latch verify  │  • replace on endpoint change    │
//! ├──────────────────────────┴──────────────────────────────────┤
//! │  Session    connect / reconnect / validate / send_command   │
//! │             bounded retry over transient socket errors      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  NetworkProvider   TcpNetworkProvider | ScriptedNetwork     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire protocol
//!
//! Commands are ASCII lines terminated by `\r\n`. Responses carry no framing:
//! bytes are accumulated until a read times out, then parsed as a decimal
//! integer. `C` clears every loop and acknowledges with `0`; `L 0 <port>`
//! latches a port and acknowledges with `1`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cytec::{LoopDriver, ResourceContext, SessionConfig, TcpNetworkProvider};
//!
//! let mut driver = LoopDriver::new(TcpNetworkProvider::new(), SessionConfig::default());
//! let ctx = ResourceContext::new("cytec-01", "10.0.0.12").with_attribute("CLI TCP Port", "5000");
//!
//! driver.create_loop(&ctx, 2700)?;
//! driver.extend_loop(&ctx)?;
//! assert_eq!(driver.latency(), 2800);
//! driver.cleanup();
//! # Ok::<(), cytec::DriverError>(())
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

/// Session cache keyed by device endpoint.
pub mod cache;

/// Resource context resolved per driver invocation.
pub mod context;

/// Operations exposed to the orchestration layer.
pub mod driver;

/// Latency table and loop controller.
pub mod latency;

/// Connection provider abstraction.
pub mod network;

/// Bounded retry helper.
pub mod retry;

/// Persistent device session with validation and retry.
pub mod session;

/// Scripted in-memory network for deterministic tests.
pub mod sim;

mod types;

pub use cache::SessionCache;
pub use context::{ResourceContext, TCP_PORT_ATTRIBUTE};
pub use driver::{DriverError, DriverResult, LoopDriver};
pub use latency::{
    decompose, CommandChannel, LatencyController, LoopError, LoopResult, LATENCY_TABLE,
};
pub use network::{DeviceStream, NetworkProvider, TcpNetworkProvider};
pub use retry::{RetryOutcome, RetryPolicy, Step};
pub use session::{Session, SessionConfig, SessionError, SessionResult, LINE_TERMINATOR};
pub use sim::{ReadEvent, ScriptedNetwork};
pub use types::DeviceEndpoint;
