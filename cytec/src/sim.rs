//! Deterministic in-memory network for exercising sessions without a device.
//!
//! [`ScriptedNetwork`] implements [`NetworkProvider`] over a shared script of
//! read outcomes. Reads pop the next [`ReadEvent`]; an empty script behaves
//! like an idle device and times out. An optional responder turns every
//! complete line written to the stream into a queued reply, which emulates
//! the device's request/response behaviour.
//!
//! The provider records everything a test needs to assert on: the lines
//! written, how many connections were opened per endpoint, and how many
//! times each connection was closed.
//!
//! Single-threaded: state is shared through `Rc<RefCell<_>>`.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::time::Duration;

use crate::network::{DeviceStream, NetworkProvider};
use crate::session::LINE_TERMINATOR;
use crate::DeviceEndpoint;

/// Outcome of one scripted read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    /// Bytes delivered by the device.
    Data(Vec<u8>),
    /// The read timed out with no data.
    Timeout,
    /// The read failed with a socket-level error.
    Error(io::ErrorKind),
    /// The peer closed the connection (zero-byte read).
    Closed,
}

impl ReadEvent {
    /// Bytes delivered by the device.
    pub fn data(bytes: impl AsRef<[u8]>) -> Self {
        ReadEvent::Data(bytes.as_ref().to_vec())
    }

    /// Connection reset by peer.
    pub fn reset() -> Self {
        ReadEvent::Error(io::ErrorKind::ConnectionReset)
    }
}

type Responder = Box<dyn FnMut(&str) -> Option<String>>;

#[derive(Debug)]
struct ConnectionRecord {
    endpoint: DeviceEndpoint,
    closes: u32,
    io_timeout: Option<Duration>,
}

#[derive(Default)]
struct SimState {
    reads: VecDeque<ReadEvent>,
    responder: Option<Responder>,
    refused: HashSet<DeviceEndpoint>,
    write_failures: VecDeque<io::ErrorKind>,
    connections: Vec<ConnectionRecord>,
    written: Vec<u8>,
    pending_line: Vec<u8>,
}

impl SimState {
    fn complete_lines(&mut self) {
        let terminator = LINE_TERMINATOR.as_bytes();
        while let Some(pos) = self
            .pending_line
            .windows(terminator.len())
            .position(|w| w == terminator)
        {
            let line: Vec<u8> = self.pending_line.drain(..pos + terminator.len()).collect();
            let text = String::from_utf8_lossy(&line[..pos]).into_owned();
            if let Some(responder) = self.responder.as_mut() {
                if let Some(reply) = responder(&text) {
                    self.reads.push_back(ReadEvent::Data(reply.into_bytes()));
                }
            }
        }
    }
}

/// Scripted [`NetworkProvider`] for deterministic tests.
///
/// Clones share the same script and records.
#[derive(Clone, Default)]
pub struct ScriptedNetwork {
    state: Rc<RefCell<SimState>>,
}

impl ScriptedNetwork {
    /// Create a network with an empty script and no responder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a network whose device acknowledges every command.
    ///
    /// `C` is answered with `0`, `L 0 <port>` with `1`, and anything else
    /// with `-1`.
    pub fn acknowledging() -> Self {
        let network = Self::new();
        network.set_responder(|line| {
            let reply = if line == "C" {
                "0"
            } else if line.starts_with("L 0 ") {
                "1"
            } else if line.is_empty() {
                return None;
            } else {
                "-1"
            };
            Some(format!("{reply}{LINE_TERMINATOR}"))
        });
        network
    }

    /// Append one read outcome to the script.
    pub fn push_read(&self, event: ReadEvent) {
        self.state.borrow_mut().reads.push_back(event);
    }

    /// Append several read outcomes to the script.
    pub fn push_reads(&self, events: impl IntoIterator<Item = ReadEvent>) {
        self.state.borrow_mut().reads.extend(events);
    }

    /// Reply to each complete written line (terminator stripped).
    ///
    /// Replies are queued after any read events already scripted.
    pub fn set_responder(&self, responder: impl FnMut(&str) -> Option<String> + 'static) {
        self.state.borrow_mut().responder = Some(Box::new(responder));
    }

    /// Refuse every future connection to `endpoint`.
    pub fn refuse(&self, endpoint: &DeviceEndpoint) {
        self.state.borrow_mut().refused.insert(endpoint.clone());
    }

    /// Accept connections to `endpoint` again.
    pub fn allow(&self, endpoint: &DeviceEndpoint) {
        self.state.borrow_mut().refused.remove(endpoint);
    }

    /// Make the next write on any stream fail with `kind`.
    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.state.borrow_mut().write_failures.push_back(kind);
    }

    /// Every line written so far, terminators stripped.
    pub fn written_lines(&self) -> Vec<String> {
        let state = self.state.borrow();
        let text = String::from_utf8_lossy(&state.written);
        let mut lines: Vec<String> = text.split(LINE_TERMINATOR).map(str::to_owned).collect();
        // split leaves a trailing fragment after the last terminator
        lines.pop();
        lines
    }

    /// Lines written so far, ignoring the bare terminators sent while draining.
    pub fn commands(&self) -> Vec<String> {
        self.written_lines()
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Scripted read outcomes not consumed yet.
    pub fn pending_reads(&self) -> usize {
        self.state.borrow().reads.len()
    }

    /// Total number of connections opened.
    pub fn connection_count(&self) -> usize {
        self.state.borrow().connections.len()
    }

    /// Number of connections opened to `endpoint`.
    pub fn connect_count(&self, endpoint: &DeviceEndpoint) -> usize {
        self.state
            .borrow()
            .connections
            .iter()
            .filter(|c| &c.endpoint == endpoint)
            .count()
    }

    /// Endpoint of the connection with index `id`, in connect order.
    pub fn connection_endpoint(&self, id: usize) -> Option<DeviceEndpoint> {
        self.state
            .borrow()
            .connections
            .get(id)
            .map(|c| c.endpoint.clone())
    }

    /// How many times the connection with index `id` was closed.
    pub fn close_count(&self, id: usize) -> u32 {
        self.state
            .borrow()
            .connections
            .get(id)
            .map_or(0, |c| c.closes)
    }

    /// Number of connections currently open.
    pub fn open_connections(&self) -> usize {
        self.state
            .borrow()
            .connections
            .iter()
            .filter(|c| c.closes == 0)
            .count()
    }

    /// Timeout applied to the connection with index `id`.
    pub fn io_timeout(&self, id: usize) -> Option<Duration> {
        self.state
            .borrow()
            .connections
            .get(id)
            .and_then(|c| c.io_timeout)
    }
}

impl NetworkProvider for ScriptedNetwork {
    type Stream = ScriptedStream;

    fn connect(&self, endpoint: &DeviceEndpoint) -> io::Result<Self::Stream> {
        let mut state = self.state.borrow_mut();
        if state.refused.contains(endpoint) {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("scripted refusal for {endpoint}"),
            ));
        }
        state.connections.push(ConnectionRecord {
            endpoint: endpoint.clone(),
            closes: 0,
            io_timeout: None,
        });
        Ok(ScriptedStream {
            id: state.connections.len() - 1,
            state: self.state.clone(),
        })
    }
}

/// Stream handed out by [`ScriptedNetwork`].
///
/// Dropping the stream counts as closing the connection.
pub struct ScriptedStream {
    id: usize,
    state: Rc<RefCell<SimState>>,
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        match state.reads.pop_front() {
            Some(ReadEvent::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    let rest = bytes.split_off(n);
                    state.reads.push_front(ReadEvent::Data(rest));
                }
                Ok(n)
            }
            Some(ReadEvent::Closed) => Ok(0),
            Some(ReadEvent::Error(kind)) => Err(io::Error::new(kind, "scripted socket error")),
            Some(ReadEvent::Timeout) | None => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "scripted read timeout",
            )),
        }
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if let Some(kind) = state.write_failures.pop_front() {
            return Err(io::Error::new(kind, "scripted write failure"));
        }
        state.written.extend_from_slice(buf);
        state.pending_line.extend_from_slice(buf);
        state.complete_lines();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl DeviceStream for ScriptedStream {
    fn set_io_timeout(&self, timeout: Duration) -> io::Result<()> {
        if let Some(record) = self.state.borrow_mut().connections.get_mut(self.id) {
            record.io_timeout = Some(timeout);
        }
        Ok(())
    }

    fn shutdown(&self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            if let Some(record) = state.connections.get_mut(self.id) {
                record.closes += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> DeviceEndpoint {
        DeviceEndpoint::new("sim", 5000)
    }

    #[test]
    fn test_empty_script_times_out() {
        let network = ScriptedNetwork::new();
        let mut stream = network.connect(&endpoint()).expect("connect");
        let mut buf = [0u8; 8];
        let err = stream.read(&mut buf).expect_err("must time out");
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_data_larger_than_buffer_is_split() {
        let network = ScriptedNetwork::new();
        network.push_read(ReadEvent::data("123456"));
        let mut stream = network.connect(&endpoint()).expect("connect");

        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).expect("read"), 4);
        assert_eq!(&buf, b"1234");
        assert_eq!(stream.read(&mut buf).expect("read"), 2);
        assert_eq!(&buf[..2], b"56");
    }

    #[test]
    fn test_responder_replies_per_line() {
        let network = ScriptedNetwork::acknowledging();
        let mut stream = network.connect(&endpoint()).expect("connect");

        stream.write_all(b"C\r\nL 0 ").expect("write");
        assert_eq!(network.pending_reads(), 1);
        stream.write_all(b"3\r\n").expect("write");
        assert_eq!(network.pending_reads(), 2);
        assert_eq!(network.written_lines(), vec!["C", "L 0 3"]);
    }

    #[test]
    fn test_drop_counts_close() {
        let network = ScriptedNetwork::new();
        let stream = network.connect(&endpoint()).expect("connect");
        assert_eq!(network.open_connections(), 1);
        drop(stream);
        assert_eq!(network.close_count(0), 1);
        assert_eq!(network.open_connections(), 0);
    }

    #[test]
    fn test_refused_endpoint() {
        let network = ScriptedNetwork::new();
        network.refuse(&endpoint());
        let err = network.connect(&endpoint()).err().expect("refused");
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);

        network.allow(&endpoint());
        assert!(network.connect(&endpoint()).is_ok());
    }
}
