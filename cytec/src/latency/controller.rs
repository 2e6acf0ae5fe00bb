//! Clear/latch command sequences and the advisory loop state.

use super::error::{LoopError, LoopResult};
use super::table::{decompose, LATENCY_STEP};
use crate::network::NetworkProvider;
use crate::session::{Session, SessionResult};

/// Command clearing every latched port.
pub const CLEAR_COMMAND: &str = "C";

/// Acknowledgement of [`CLEAR_COMMAND`].
const CLEAR_ACK: i64 = 0;

/// Acknowledgement of a latch command.
const LATCH_ACK: i64 = 1;

/// Anything that can carry one command and return the raw response.
///
/// Implemented by [`Session`]; tests can substitute a scripted channel.
pub trait CommandChannel {
    /// Send `command` (without terminator) and return the raw response.
    fn send_command(&mut self, command: &str) -> SessionResult<String>;
}

impl<N: NetworkProvider> CommandChannel for Session<N> {
    fn send_command(&mut self, command: &str) -> SessionResult<String> {
        Session::send_command(self, command)
    }
}

/// Command latching `port` on loop 0.
pub fn latch_command(port: u8) -> String {
    format!("L 0 {port}")
}

/// Send `C` and require the device to answer `0`.
pub fn clear_loops<C: CommandChannel + ?Sized>(channel: &mut C) -> LoopResult<()> {
    let response = channel.send_command(CLEAR_COMMAND)?;
    if parse_code(&response) != Some(CLEAR_ACK) {
        return Err(LoopError::ClearRejected { response });
    }
    Ok(())
}

/// Send `L 0 <port>` and require the device to answer `1`.
pub fn latch_port<C: CommandChannel + ?Sized>(channel: &mut C, port: u8) -> LoopResult<()> {
    let response = channel.send_command(&latch_command(port))?;
    if parse_code(&response) != Some(LATCH_ACK) {
        return Err(LoopError::LatchRejected { port, response });
    }
    Ok(())
}

fn parse_code(response: &str) -> Option<i64> {
    response.trim().parse().ok()
}

/// Applies latencies and remembers the last one that fully succeeded.
///
/// The remembered value is advisory. If a latch is rejected halfway through
/// a sequence the device keeps whatever was latched so far while the
/// controller keeps the previous value, so the two can diverge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencyController {
    latency: u32,
}

impl LatencyController {
    /// Create a controller with no latency applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last latency applied in full.
    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Forget the advisory latency without talking to the device.
    pub fn reset(&mut self) {
        self.latency = 0;
    }

    /// Clear every loop and reset the advisory latency to zero.
    pub fn clear<C: CommandChannel + ?Sized>(&mut self, channel: &mut C) -> LoopResult<()> {
        tracing::debug!("clearing loops");
        clear_loops(channel)?;
        self.latency = 0;
        Ok(())
    }

    /// Clear the device then latch the ports making up `latency`.
    ///
    /// Latencies are never cumulative at the device: every call starts from
    /// zero loops. The advisory latency changes only when every latch was
    /// acknowledged.
    pub fn apply_latency<C: CommandChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        latency: u32,
    ) -> LoopResult<()> {
        let ports = decompose(latency);
        tracing::debug!(latency, ?ports, "applying latency");

        clear_loops(channel)?;
        for port in ports {
            latch_port(channel, port)?;
        }

        self.latency = latency;
        Ok(())
    }

    /// Apply the advisory latency plus one step. Returns the new latency.
    pub fn extend<C: CommandChannel + ?Sized>(&mut self, channel: &mut C) -> LoopResult<u32> {
        let latency = self.latency.saturating_add(LATENCY_STEP);
        tracing::debug!(from = self.latency, to = latency, "extending loop");
        self.apply_latency(channel, latency)?;
        Ok(latency)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use super::*;
    use crate::{DeviceEndpoint, SessionError};

    /// Channel that records commands and replays canned responses.
    #[derive(Default)]
    struct CannedChannel {
        responses: VecDeque<String>,
        sent: Vec<String>,
    }

    impl CannedChannel {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: responses.iter().map(|r| r.to_string()).collect(),
                sent: Vec::new(),
            }
        }
    }

    impl CommandChannel for CannedChannel {
        fn send_command(&mut self, command: &str) -> SessionResult<String> {
            self.sent.push(command.to_string());
            Ok(self.responses.pop_front().unwrap_or_default())
        }
    }

    struct BrokenChannel;

    impl CommandChannel for BrokenChannel {
        fn send_command(&mut self, _command: &str) -> SessionResult<String> {
            Err(SessionError::ValidationFailed {
                endpoint: DeviceEndpoint::new("device", 5000),
                attempts: 3,
            })
        }
    }

    #[test]
    fn test_clear_accepts_zero() {
        let mut channel = CannedChannel::new(&["0\r\n"]);
        clear_loops(&mut channel).expect("clear");
        assert_eq!(channel.sent, vec!["C"]);
    }

    #[test]
    fn test_clear_rejects_unexpected_code() {
        let mut channel = CannedChannel::new(&["1"]);
        let err = clear_loops(&mut channel).expect_err("1 is not a clear ack");
        assert!(matches!(err, LoopError::ClearRejected { ref response } if response == "1"));
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_clear_rejects_non_numeric() {
        let mut channel = CannedChannel::new(&["abc"]);
        let err = clear_loops(&mut channel).expect_err("not a number");
        assert!(matches!(err, LoopError::ClearRejected { .. }));
    }

    #[test]
    fn test_clear_rejects_empty_response() {
        let mut channel = CannedChannel::new(&[""]);
        assert!(clear_loops(&mut channel).is_err());
    }

    #[test]
    fn test_apply_sends_clear_then_latches() {
        let mut channel = CannedChannel::new(&["0", "1", "1", "1", "1"]);
        let mut controller = LatencyController::new();

        controller.apply_latency(&mut channel, 2700).expect("apply");
        assert_eq!(channel.sent, vec!["C", "L 0 4", "L 0 3", "L 0 1", "L 0 0"]);
        assert_eq!(controller.latency(), 2700);
    }

    #[test]
    fn test_apply_zero_only_clears() {
        let mut channel = CannedChannel::new(&["0"]);
        let mut controller = LatencyController::new();

        controller.apply_latency(&mut channel, 0).expect("apply");
        assert_eq!(channel.sent, vec!["C"]);
        assert_eq!(controller.latency(), 0);
    }

    #[test]
    fn test_rejected_latch_keeps_previous_latency() {
        let mut controller = LatencyController::new();
        controller
            .apply_latency(&mut CannedChannel::new(&["0", "1"]), 100)
            .expect("first apply");

        // second latch of 300 (ports 1 then 0) is rejected
        let mut channel = CannedChannel::new(&["0", "1", "7"]);
        let err = controller
            .apply_latency(&mut channel, 300)
            .expect_err("latch rejected");

        match err {
            LoopError::LatchRejected { port, response } => {
                assert_eq!(port, 0);
                assert_eq!(response, "7");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(channel.sent, vec!["C", "L 0 1", "L 0 0"]);
        assert_eq!(controller.latency(), 100);
    }

    #[test]
    fn test_extend_applies_one_more_step() {
        let mut controller = LatencyController::new();
        controller
            .apply_latency(&mut CannedChannel::new(&["0", "1", "1"]), 300)
            .expect("apply 300");

        let mut channel = CannedChannel::new(&["0", "1"]);
        let latency = controller.extend(&mut channel).expect("extend");
        assert_eq!(latency, 400);
        assert_eq!(channel.sent, vec!["C", "L 0 2"]);
        assert_eq!(controller.latency(), 400);
    }

    #[test]
    fn test_extend_saturates_at_max_latency() {
        let acks = ["0", "1", "1", "1", "1", "1", "1", "1", "1"];
        let mut controller = LatencyController::new();
        controller
            .apply_latency(&mut CannedChannel::new(&acks), u32::MAX - 50)
            .expect("apply near max");

        let mut channel = CannedChannel::new(&acks);
        let latency = controller.extend(&mut channel).expect("extend");

        assert_eq!(latency, u32::MAX);
        let latches: Vec<String> = (0..8u8).rev().map(latch_command).collect();
        assert_eq!(channel.sent[0], CLEAR_COMMAND);
        assert_eq!(channel.sent[1..], latches[..]);
        assert_eq!(controller.latency(), u32::MAX);
    }

    #[test]
    fn test_clear_resets_advisory_latency() {
        let mut controller = LatencyController::new();
        controller
            .apply_latency(&mut CannedChannel::new(&["0", "1"]), 100)
            .expect("apply");

        controller
            .clear(&mut CannedChannel::new(&["0"]))
            .expect("clear");
        assert_eq!(controller.latency(), 0);
    }

    #[test]
    fn test_session_error_passes_through() {
        let mut controller = LatencyController::new();
        let err = controller
            .apply_latency(&mut BrokenChannel, 100)
            .expect_err("session failed");
        assert!(matches!(
            err,
            LoopError::Session(SessionError::ValidationFailed { .. })
        ));
        assert!(!err.is_protocol_violation());
    }

    #[test]
    fn test_latch_rejects_clear_ack() {
        let mut channel = CannedChannel::new(&["0"]);
        let err = latch_port(&mut channel, 5).expect_err("0 is not a latch ack");
        assert!(matches!(err, LoopError::LatchRejected { port: 5, .. }));
        assert!(err.to_string().contains("port 5"));
    }

    #[test]
    fn test_socket_error_is_not_a_protocol_violation() {
        let err = LoopError::from(SessionError::Socket {
            endpoint: DeviceEndpoint::new("device", 5000),
            source: io::Error::from(io::ErrorKind::BrokenPipe),
        });
        assert!(!err.is_protocol_violation());
    }
}
