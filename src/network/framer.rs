//! Transport Framer
//!
//! Turns one request into exactly one reply over a prompt-delimited stream.
//!
//! ## State Machine
//! ```text
//! Connecting ──banner read──▶ Open ──close()──▶ Closed
//!      │                        │                 ▲
//!      └────handshake error─────┴──peer hung up───┘
//! ```
//! Only `Open` permits `send`/`receive`. `Closed` is terminal.
//!
//! The instrument echoes each request line ahead of its reply. A reply whose
//! echo is not the line just sent (e.g. a late answer to a request that timed
//! out) is a [`DlcError::Desynchronized`] error and closes the framer.

use crate::error::{DlcError, Result};
use crate::protocol::{request_line, Directive, ParameterName, Value};

use super::connection::Connection;

/// Lifecycle of a framed connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    Connecting,
    Open,
    Closed,
}

/// Request/reply framing over a [`Connection`]
///
/// Not reentrant: one request may be in flight at a time, which `&mut self`
/// enforces.
pub struct Framer<C: Connection> {
    conn: C,
    prompt: Vec<u8>,
    state: FramerState,
    peer: String,

    /// Last request line, without its newline, awaiting its echo
    in_flight: Option<Vec<u8>>,
}

impl<C: Connection> Framer<C> {
    /// Read the login banner up to the first prompt and open the framer
    pub fn open(conn: C, prompt: impl Into<Vec<u8>>, peer: impl Into<String>) -> Result<Self> {
        let mut framer = Self {
            conn,
            prompt: prompt.into(),
            state: FramerState::Connecting,
            peer: peer.into(),
            in_flight: None,
        };

        match framer.conn.read_until(&framer.prompt) {
            Ok(banner) => {
                let banner = banner.strip_suffix(framer.prompt.as_slice()).unwrap_or(&banner);
                tracing::debug!(
                    "Received login message from {}: {}",
                    framer.peer,
                    String::from_utf8_lossy(banner).trim_end()
                );
                framer.state = FramerState::Open;
                Ok(framer)
            }
            Err(e) => {
                tracing::error!("Failed to read login banner from {}: {}", framer.peer, e);
                // Nothing to say goodbye to
                framer.state = FramerState::Closed;
                Err(DlcError::Handshake(format!("{}: {}", framer.peer, e)))
            }
        }
    }

    /// Write one request line
    pub fn send(
        &mut self,
        directive: Directive,
        name: Option<&ParameterName>,
        args: &[Value],
    ) -> Result<()> {
        let mut line = request_line(directive, name, args)?;
        let shown = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();

        if self.state != FramerState::Open {
            tracing::error!("Connection to {} closed, can't send message: {}", self.peer, shown);
            return Err(DlcError::ConnectionClosed);
        }

        tracing::debug!("Sending message to {}: {}", self.peer, shown);
        let result = self.conn.write_all(&line);
        self.track(result)?;

        line.pop();
        self.in_flight = Some(line);
        Ok(())
    }

    /// Read one reply and return its payload
    ///
    /// Reads up to the prompt, drops the prompt, trailing line breaks and the
    /// echoed request line, and joins what remains with `\n`. The echo must
    /// match the last line sent.
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        if self.state != FramerState::Open {
            tracing::error!("Connection to {} closed, can't receive message", self.peer);
            return Err(DlcError::ConnectionClosed);
        }

        let result = self.conn.read_until(&self.prompt);
        let raw = self.track(result)?;
        let (echo, payload) = split_reply(&raw, &self.prompt);

        if let Some(expected) = self.in_flight.take() {
            if echo != expected.as_slice() {
                let expected = String::from_utf8_lossy(&expected).into_owned();
                let got = String::from_utf8_lossy(echo).into_owned();
                tracing::error!(
                    "Reply from {} answers '{}', not '{}'; closing",
                    self.peer,
                    got,
                    expected
                );
                self.close();
                return Err(DlcError::Desynchronized { expected, got });
            }
        }

        tracing::debug!(
            "Received response from {}: {}",
            self.peer,
            String::from_utf8_lossy(&payload)
        );
        Ok(payload)
    }

    /// One complete exchange: send a request and read its reply
    pub fn request(
        &mut self,
        directive: Directive,
        name: Option<&ParameterName>,
        args: &[Value],
    ) -> Result<Vec<u8>> {
        self.send(directive, name, args)?;
        self.receive()
    }

    /// Say `(quit)` and close the connection
    ///
    /// Best effort and idempotent: failures are logged, never returned.
    pub fn close(&mut self) {
        if self.state == FramerState::Closed {
            return;
        }

        if self.state == FramerState::Open {
            tracing::debug!("Closing connection to {}", self.peer);
            if let Err(e) = self.send(Directive::Quit, None, &[]) {
                tracing::warn!("Failed to send quit to {}: {}", self.peer, e);
            }
        }

        if let Err(e) = self.conn.close() {
            tracing::warn!("Error closing connection to {}: {}", self.peer, e);
        }
        self.state = FramerState::Closed;
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == FramerState::Closed
    }

    /// Get the peer address string
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// A closed stream ends the session
    fn track<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(DlcError::ConnectionClosed) = result {
            tracing::debug!("Connection closed by {}", self.peer);
            self.state = FramerState::Closed;
        }
        result
    }
}

impl<C: Connection> Drop for Framer<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Strip the prompt and echo line from a raw reply
pub fn extract_payload(raw: &[u8], prompt: &[u8]) -> Vec<u8> {
    split_reply(raw, prompt).1
}

/// Split a raw reply into its echo line and its payload
///
/// Line breaks may be CRLF or LF; trailing blanks on the echo are ignored.
pub fn split_reply<'a>(raw: &'a [u8], prompt: &[u8]) -> (&'a [u8], Vec<u8>) {
    let body = raw.strip_suffix(prompt).unwrap_or(raw);
    let end = body
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |i| i + 1);

    let mut lines = body[..end]
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line));

    let echo = lines.next().unwrap_or_default();
    let echo_end = echo
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);

    let payload: Vec<&[u8]> = lines.collect();
    (&echo[..echo_end], payload.join(&b'\n'))
}
