//! Core session implementation: connect, validate, send and receive.

use std::io::{self, Read, Write};

use super::config::SessionConfig;
use super::error::{SessionError, SessionResult};
use crate::network::{is_timeout, DeviceStream, NetworkProvider};
use crate::retry::{RetryOutcome, RetryPolicy, Step};
use crate::DeviceEndpoint;

/// Terminator appended to every command line.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Result of one read that did not hit a socket error.
enum ReadOutcome {
    /// Bytes arrived.
    Data(Vec<u8>),
    /// The read timed out with nothing to deliver.
    TimedOut,
}

/// A live connection to one device endpoint.
///
/// The session exclusively owns its stream. Reconnects replace the stream in
/// place; [`Session::close`] or dropping the session releases it.
///
/// Only one command may be in flight: callers sharing a session across
/// threads must serialize access themselves.
pub struct Session<N: NetworkProvider> {
    /// Provider used for the initial connect and every reconnect
    network: N,

    /// Endpoint this session is bound to, fixed for its lifetime
    endpoint: DeviceEndpoint,

    /// Timeouts and retry budget
    config: SessionConfig,

    /// Live stream. `None` only after a reconnect failed to open a new one.
    stream: Option<N::Stream>,
}

impl<N: NetworkProvider> Session<N> {
    /// Open a session to `endpoint`.
    ///
    /// Connect failures are returned as [`SessionError::Connect`].
    pub fn connect(
        network: N,
        endpoint: DeviceEndpoint,
        config: SessionConfig,
    ) -> SessionResult<Self> {
        let mut session = Self {
            network,
            endpoint,
            config,
            stream: None,
        };
        session.stream = Some(session.open_stream()?);
        Ok(session)
    }

    /// Endpoint this session is bound to.
    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    /// Whether the session currently holds a stream.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Drop the current stream and open a fresh one to the same endpoint.
    ///
    /// Errors while closing the old stream are ignored.
    pub fn reconnect(&mut self) -> SessionResult<()> {
        tracing::debug!(endpoint = %self.endpoint, "reconnecting socket");
        self.release();
        self.stream = Some(self.open_stream()?);
        Ok(())
    }

    /// Make sure the connection is alive and holds no unread data.
    ///
    /// An idle, healthy connection is recognised by a read timing out. Stale
    /// bytes are drained by sending an empty line; if more data follows the
    /// session reconnects. Socket errors also reconnect. Each reconnect costs
    /// one attempt and running out of attempts is fatal.
    pub fn validate(&mut self) -> SessionResult<()> {
        tracing::debug!(endpoint = %self.endpoint, "validating socket");
        let outcome = RetryPolicy::new(self.config.max_attempts).run(
            self,
            |session: &mut Self, attempt| session.probe_idle(attempt),
            SessionError::is_transient,
            |session: &mut Self, error| session.recover(error),
        )?;

        match outcome {
            RetryOutcome::Success(()) => {
                tracing::debug!(endpoint = %self.endpoint, "validation done");
                Ok(())
            }
            RetryOutcome::Exhausted { attempts } => {
                tracing::warn!(endpoint = %self.endpoint, attempts, "socket validation failed");
                Err(SessionError::ValidationFailed {
                    endpoint: self.endpoint.clone(),
                    attempts,
                })
            }
        }
    }

    /// Send one command and collect the device's raw response.
    ///
    /// The response is everything read until the first read timeout. If the
    /// attempt budget runs out before a timeout is seen, the response is
    /// empty: the outcome of the command is unknown and callers must not
    /// assume a well-formed reply.
    pub fn send_command(&mut self, command: &str) -> SessionResult<String> {
        self.validate()?;

        tracing::debug!(endpoint = %self.endpoint, command, "sending command");
        self.write_line(command)?;

        let mut response = Vec::new();
        let outcome = RetryPolicy::new(self.config.max_attempts).run(
            self,
            |session: &mut Self, _attempt| match session.read_chunk()? {
                ReadOutcome::Data(chunk) => {
                    response.extend_from_slice(&chunk);
                    Ok(Step::Continue)
                }
                ReadOutcome::TimedOut => Ok(Step::Done(())),
            },
            SessionError::is_transient,
            |session: &mut Self, error| session.recover(error),
        )?;

        match outcome {
            RetryOutcome::Success(()) => {
                let text = String::from_utf8_lossy(&response).into_owned();
                tracing::debug!(
                    endpoint = %self.endpoint,
                    command,
                    response = %text.trim_end(),
                    "received response"
                );
                Ok(text)
            }
            RetryOutcome::Exhausted { attempts } => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    command,
                    attempts,
                    "no read timeout within attempt budget, response unknown"
                );
                Ok(String::new())
            }
        }
    }

    /// Close the session and release its stream.
    pub fn close(mut self) {
        tracing::debug!(endpoint = %self.endpoint, "closing session");
        self.release();
    }

    fn open_stream(&self) -> SessionResult<N::Stream> {
        tracing::debug!(endpoint = %self.endpoint, "initializing connection");
        let stream = self
            .network
            .connect(&self.endpoint)
            .map_err(SessionError::Connect)?;
        stream
            .set_io_timeout(self.config.io_timeout)
            .map_err(SessionError::Connect)?;
        Ok(stream)
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown();
        }
    }

    fn recover(&mut self, error: SessionError) -> SessionResult<()> {
        tracing::warn!(endpoint = %self.endpoint, %error, "socket error, reconnecting");
        self.reconnect()
    }

    /// One validation attempt.
    fn probe_idle(&mut self, attempt: u32) -> SessionResult<Step<()>> {
        match self.read_chunk()? {
            ReadOutcome::TimedOut => return Ok(Step::Done(())),
            ReadOutcome::Data(stale) => {
                tracing::debug!(
                    endpoint = %self.endpoint,
                    attempt,
                    bytes = stale.len(),
                    "stale data on socket, draining"
                );
            }
        }

        self.write_line("")?;
        match self.read_chunk()? {
            ReadOutcome::TimedOut => Ok(Step::Done(())),
            ReadOutcome::Data(_) => {
                self.reconnect()?;
                Ok(Step::Continue)
            }
        }
    }

    fn read_chunk(&mut self) -> SessionResult<ReadOutcome> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(socket_error(&self.endpoint, io::ErrorKind::NotConnected.into()));
        };

        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        match stream.read(&mut buf) {
            Ok(0) => Err(socket_error(
                &self.endpoint,
                io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by device"),
            )),
            Ok(n) => {
                buf.truncate(n);
                Ok(ReadOutcome::Data(buf))
            }
            Err(e) if is_timeout(&e) => Ok(ReadOutcome::TimedOut),
            Err(e) => Err(socket_error(&self.endpoint, e)),
        }
    }

    fn write_line(&mut self, line: &str) -> SessionResult<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(socket_error(&self.endpoint, io::ErrorKind::NotConnected.into()));
        };

        let framed = format!("{line}{LINE_TERMINATOR}");
        stream
            .write_all(framed.as_bytes())
            .and_then(|()| stream.flush())
            .map_err(|e| socket_error(&self.endpoint, e))
    }
}

impl<N: NetworkProvider> Drop for Session<N> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<N: NetworkProvider> std::fmt::Debug for Session<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("config", &self.config)
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

fn socket_error(endpoint: &DeviceEndpoint, source: io::Error) -> SessionError {
    SessionError::Socket {
        endpoint: endpoint.clone(),
        source,
    }
}
