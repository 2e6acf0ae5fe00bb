//! Latency table and loop controller.
//!
//! The device builds a loop's latency from eight binary-weighted delay
//! stages, one per port. [`decompose`] maps a requested latency onto those
//! ports and [`LatencyController`] drives the clear/latch command sequence,
//! verifying every acknowledgement.

mod controller;
mod error;
mod table;

pub use controller::{
    clear_loops, latch_command, latch_port, CommandChannel, LatencyController, CLEAR_COMMAND,
};
pub use error::{LoopError, LoopResult};
pub use table::{decompose, LATENCY_STEP, LATENCY_TABLE};
