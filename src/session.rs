//! Command Session
//!
//! The `do` / `set` / `query` interface over the command port.
//!
//! ## Responsibilities
//! - Canonicalize parameter names before anything is sent
//! - Serialize requests onto the half-duplex connection
//! - Separate instrument-reported errors from values
//! - Route errors through the configured callbacks

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{DlcError, Result};
use crate::network::{Connection, Framer, TcpConnection};
use crate::protocol::{Directive, ErrorCode, ErrorDialect, MarkerDialect, ParameterName, Reply, Value};

/// Session-wide fallback for instrument errors
///
/// Returns a substitute reply value, or an error to propagate.
pub type ErrorHandler = Arc<dyn Fn(&ErrorCode) -> Result<Value> + Send + Sync>;

/// A session on the command interface
///
/// ## Concurrency Model
///
/// The connection is strictly half-duplex: the framer sits behind a mutex
/// and every operation holds it for one full request/reply exchange. The
/// session can therefore be shared (`Arc<CommandSession>`) between threads,
/// including a [`MonitorSession`](crate::monitor::MonitorSession) polling
/// through it.
///
/// ## Error Dispatch
///
/// When the instrument reports an error, the first of these applies:
/// 1. the per-call callback (`*_or_else` methods)
/// 2. the session handler set with [`with_error_handler`](Self::with_error_handler)
/// 3. `DlcError::Machine { code, message }`
pub struct CommandSession<C: Connection = TcpConnection> {
    /// Framed connection (exclusive access per exchange)
    framer: Mutex<Framer<C>>,

    /// Error form of the device's dialect
    dialect: Arc<dyn ErrorDialect>,

    /// Session-level error fallback
    error_handler: Option<ErrorHandler>,

    /// Peer address for logging
    peer: String,
}

impl CommandSession<TcpConnection> {
    /// Connect to the command port of the configured controller
    pub fn connect(config: &Config) -> Result<Self> {
        let addr = config.command_addr();
        let conn = TcpConnection::connect(&addr, config)?;
        Self::open(conn, config, addr)
    }
}

impl<C: Connection> CommandSession<C> {
    /// Open a session over an established connection
    ///
    /// Reads the login banner before returning.
    pub fn open(conn: C, config: &Config, peer: impl Into<String>) -> Result<Self> {
        let peer = peer.into();
        let framer = Framer::open(conn, config.prompt.clone(), peer.clone())?;

        Ok(Self {
            framer: Mutex::new(framer),
            dialect: Arc::new(MarkerDialect::new(config.error_marker.clone())),
            error_handler: None,
            peer,
        })
    }

    /// Install the session-level error handler
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ErrorCode) -> Result<Value> + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Replace the error dialect
    pub fn with_dialect(mut self, dialect: Arc<dyn ErrorDialect>) -> Self {
        self.dialect = dialect;
        self
    }

    // =========================================================================
    // set
    // =========================================================================

    /// Set a parameter
    pub fn set(&self, name: impl AsRef<[u8]>, value: impl Into<Value>) -> Result<()> {
        self.set_with(name.as_ref(), value.into(), None::<fn(ErrorCode) -> Result<()>>)
    }

    /// Set a parameter, handing an instrument error to `on_error`
    pub fn set_or_else<F>(&self, name: impl AsRef<[u8]>, value: impl Into<Value>, on_error: F) -> Result<()>
    where
        F: FnOnce(ErrorCode) -> Result<()>,
    {
        self.set_with(name.as_ref(), value.into(), Some(on_error))
    }

    fn set_with<F>(&self, name: &[u8], value: Value, on_error: Option<F>) -> Result<()>
    where
        F: FnOnce(ErrorCode) -> Result<()>,
    {
        let name = ParameterName::new(name)?;
        let payload = self.transact(Directive::ParamSet, &name, std::slice::from_ref(&value))?;

        // The acknowledgement must still be a well-formed reply
        match Reply::classify(&payload, self.dialect.as_ref())? {
            Reply::Value(_) => Ok(()),
            Reply::Error(error) => self.dispatch(error, on_error, |_| ()),
        }
    }

    // =========================================================================
    // query
    // =========================================================================

    /// Read a parameter
    pub fn query(&self, name: impl AsRef<[u8]>) -> Result<Value> {
        self.query_with(name.as_ref(), None::<fn(ErrorCode) -> Result<Value>>)
    }

    /// Read a parameter, handing an instrument error to `on_error`
    pub fn query_or_else<F>(&self, name: impl AsRef<[u8]>, on_error: F) -> Result<Value>
    where
        F: FnOnce(ErrorCode) -> Result<Value>,
    {
        self.query_with(name.as_ref(), Some(on_error))
    }

    fn query_with<F>(&self, name: &[u8], on_error: Option<F>) -> Result<Value>
    where
        F: FnOnce(ErrorCode) -> Result<Value>,
    {
        let name = ParameterName::new(name)?;
        let payload = self.transact(Directive::ParamRef, &name, &[])?;

        match Reply::classify(&payload, self.dialect.as_ref())? {
            Reply::Value(value) => Ok(value),
            Reply::Error(error) => self.dispatch(error, on_error, |value| value),
        }
    }

    // =========================================================================
    // exec (the protocol's `do`)
    // =========================================================================

    /// Run a command
    ///
    /// Returns `None` when the instrument answers with the empty list.
    #[doc(alias = "do")]
    pub fn exec(&self, name: impl AsRef<[u8]>, args: &[Value]) -> Result<Option<Value>> {
        self.exec_with(name.as_ref(), args, None::<fn(ErrorCode) -> Result<Option<Value>>>)
    }

    /// Run a command, handing an instrument error to `on_error`
    pub fn exec_or_else<F>(&self, name: impl AsRef<[u8]>, args: &[Value], on_error: F) -> Result<Option<Value>>
    where
        F: FnOnce(ErrorCode) -> Result<Option<Value>>,
    {
        self.exec_with(name.as_ref(), args, Some(on_error))
    }

    fn exec_with<F>(&self, name: &[u8], args: &[Value], on_error: Option<F>) -> Result<Option<Value>>
    where
        F: FnOnce(ErrorCode) -> Result<Option<Value>>,
    {
        let name = ParameterName::new(name)?;
        let payload = self.transact(Directive::Exec, &name, args)?;

        match Reply::classify(&payload, self.dialect.as_ref())? {
            Reply::Value(value) => Ok(non_unit(value)),
            Reply::Error(error) => self.dispatch(error, on_error, non_unit),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Close the session
    ///
    /// Idempotent; also runs when the session is dropped.
    pub fn close(&self) {
        self.framer.lock().close();
    }

    pub fn is_closed(&self) -> bool {
        self.framer.lock().is_closed()
    }

    /// Get the peer address string
    pub fn peer(&self) -> &str {
        &self.peer
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// One exchange under the connection lock
    fn transact(&self, directive: Directive, name: &ParameterName, args: &[Value]) -> Result<Vec<u8>> {
        let mut framer = self.framer.lock();
        framer.request(directive, Some(name), args)
    }

    fn dispatch<T, F>(&self, error: ErrorCode, on_error: Option<F>, adapt: impl FnOnce(Value) -> T) -> Result<T>
    where
        F: FnOnce(ErrorCode) -> Result<T>,
    {
        tracing::debug!("Instrument at {} reported error {}", self.peer, error);

        if let Some(callback) = on_error {
            return callback(error);
        }
        if let Some(handler) = &self.error_handler {
            return handler(&error).map(adapt);
        }
        Err(DlcError::Machine {
            code: error.code,
            message: error.message,
        })
    }
}

fn non_unit(value: Value) -> Option<Value> {
    if value.is_unit() {
        None
    } else {
        Some(value)
    }
}
