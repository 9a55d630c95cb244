//! Configuration for dlcpro
//!
//! Connection parameters for the command and monitoring interfaces,
//! with the protocol defaults.

use std::time::Duration;

use crate::error::{DlcError, Result};

/// Default port of the command interface
pub const DEFAULT_COMMAND_PORT: u16 = 1998;

/// Default port of the monitoring interface
pub const DEFAULT_MONITOR_PORT: u16 = 1999;

/// Prompt the instrument prints after the banner and after every reply
pub const DEFAULT_PROMPT: &[u8] = b"> ";

/// Marker that opens an error reply on current firmware
pub const DEFAULT_ERROR_MARKER: &str = "Error:";

/// Main configuration for a controller connection
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Addressing
    // -------------------------------------------------------------------------
    /// Host name or IP address of the controller
    pub host: String,

    /// Port of the command interface
    pub command_port: u16,

    /// Port of the monitoring interface
    pub monitor_port: u16,

    // -------------------------------------------------------------------------
    // Timeouts
    // -------------------------------------------------------------------------
    /// Bound on establishing the TCP connection (None = OS default)
    pub connect_timeout: Option<Duration>,

    /// Read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Dialect
    // -------------------------------------------------------------------------
    /// Byte sequence terminating every reply
    pub prompt: Vec<u8>,

    /// Leading marker of an instrument error reply
    pub error_marker: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            command_port: DEFAULT_COMMAND_PORT,
            monitor_port: DEFAULT_MONITOR_PORT,
            connect_timeout: None,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            prompt: DEFAULT_PROMPT.to_vec(),
            error_marker: DEFAULT_ERROR_MARKER.to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` of the command interface
    pub fn command_addr(&self) -> String {
        format!("{}:{}", self.host, self.command_port)
    }

    /// `host:port` of the monitoring interface
    pub fn monitor_addr(&self) -> String {
        format!("{}:{}", self.host, self.monitor_port)
    }

    pub(crate) fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub(crate) fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the controller host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the command interface port
    pub fn command_port(mut self, port: u16) -> Self {
        self.config.command_port = port;
        self
    }

    /// Set the monitoring interface port
    pub fn monitor_port(mut self, port: u16) -> Self {
        self.config.monitor_port = port;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the reply prompt
    pub fn prompt(mut self, prompt: impl Into<Vec<u8>>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    /// Set the error reply marker
    pub fn error_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.error_marker = marker.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        let config = self.config;
        if config.host.trim().is_empty() {
            return Err(DlcError::Config("host must not be empty".to_string()));
        }
        if config.prompt.is_empty() {
            return Err(DlcError::Config("prompt must not be empty".to_string()));
        }
        if config.error_marker.is_empty() {
            return Err(DlcError::Config(
                "error marker must not be empty".to_string(),
            ));
        }
        Ok(config)
    }
}
