//! Connection Handling
//!
//! The byte-stream contract the framer runs on, with a buffered
//! implementation for any `Read + Write` stream and a TCP flavour.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use bytes::BytesMut;

use crate::config::Config;
use crate::error::{DlcError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Maximum bytes buffered while waiting for a delimiter (16 MB)
pub const MAX_REPLY_SIZE: usize = 16 * 1024 * 1024;

/// A connected byte stream
///
/// `read_until` returns everything up to and including `delimiter`.
/// End of stream is reported as [`DlcError::ConnectionClosed`] and an
/// expired read bound as [`DlcError::Timeout`].
pub trait Connection: Send {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>>;

    fn close(&mut self) -> Result<()>;
}

/// Buffered connection over any `Read + Write` stream
pub struct StreamConnection<T> {
    stream: T,
    buf: BytesMut,
}

impl<T: Read + Write + Send> StreamConnection<T> {
    pub fn new(stream: T) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Borrow the underlying stream
    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    /// Consume the connection and return the inner stream
    pub fn into_inner(self) -> T {
        self.stream
    }
}

impl<T: Read + Write + Send> Connection for StreamConnection<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).map_err(map_io_error)?;
        self.stream.flush().map_err(map_io_error)
    }

    fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        let mut searched = 0;
        loop {
            if let Some(end) = find_delimiter(&self.buf, delimiter, searched) {
                return Ok(self.buf.split_to(end).to_vec());
            }
            // A delimiter may straddle the next chunk boundary
            searched = self.buf.len().saturating_sub(delimiter.len().saturating_sub(1));

            if self.buf.len() > MAX_REPLY_SIZE {
                return Err(DlcError::Transport(std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!("reply exceeds {} bytes without a prompt", MAX_REPLY_SIZE),
                )));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.stream.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(map_io_error(err)),
            };

            if read == 0 {
                return Err(DlcError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    fn close(&mut self) -> Result<()> {
        self.buf.clear();
        self.stream.flush().map_err(map_io_error)
    }
}

/// TCP connection to one of the controller's interfaces
pub struct TcpConnection {
    inner: StreamConnection<TcpStream>,
    peer_addr: String,
}

impl TcpConnection {
    /// Connect to `addr` (`host:port`) and apply the configured timeouts
    pub fn connect(addr: &str, config: &Config) -> Result<Self> {
        let stream = match config.connect_timeout {
            Some(timeout) => connect_with_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(|source| DlcError::Connection {
            addr: addr.to_string(),
            source,
        })?;

        // Requests are single short lines
        stream.set_nodelay(true)?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(config.write_timeout())?;

        tracing::debug!("Connected to {}", addr);

        Ok(Self {
            inner: StreamConnection::new(stream),
            peer_addr: addr.to_string(),
        })
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Connection for TcpConnection {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)
    }

    fn read_until(&mut self, delimiter: &[u8]) -> Result<Vec<u8>> {
        self.inner.read_until(delimiter)
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()?;
        match self.inner.get_ref().shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer already hung up
            Err(err) if err.kind() == ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(DlcError::Transport(err)),
        }
    }
}

fn connect_with_timeout(addr: &str, timeout: std::time::Duration) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for socket_addr in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&socket_addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(ErrorKind::AddrNotAvailable, "address resolved to nothing")
    }))
}

/// Index one past the first `delimiter` at or after `from`
fn find_delimiter(buf: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    if delimiter.is_empty() || buf.len() < delimiter.len() {
        return None;
    }
    buf[from..]
        .windows(delimiter.len())
        .position(|w| w == delimiter)
        .map(|i| from + i + delimiter.len())
}

fn map_io_error(err: std::io::Error) -> DlcError {
    match err.kind() {
        // Unix reports an expired socket timeout as WouldBlock, Windows as TimedOut
        ErrorKind::WouldBlock | ErrorKind::TimedOut => DlcError::Timeout,
        _ => DlcError::Transport(err),
    }
}
