//! Reply classification
//!
//! A reply is either an instrument-reported error or a value. Errors are
//! recognised on the raw payload before any decoding is attempted, by an
//! [`ErrorDialect`] that can be swapped per firmware revision.

use std::fmt;

use crate::error::Result;

use super::codec::decode;
use super::value::Value;

/// An instrument-reported failure
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorCode {
    pub code: i64,
    pub message: String,
}

impl ErrorCode {
    /// Code reported when the error reply carries no numeric code
    pub const UNKNOWN: i64 = -1;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Recognises the error form of a device dialect
pub trait ErrorDialect: Send + Sync + fmt::Debug {
    /// Return the error carried by `payload`, or `None` for a normal reply
    fn detect(&self, payload: &[u8]) -> Option<ErrorCode>;
}

/// Dialect where error replies start with a fixed marker
///
/// `Error: -10 unknown parameter` gives code `-10` and message
/// `unknown parameter`. Without a number after the marker the code is
/// [`ErrorCode::UNKNOWN`] and the whole remainder is the message.
#[derive(Debug, Clone)]
pub struct MarkerDialect {
    marker: Vec<u8>,
}

impl MarkerDialect {
    pub fn new(marker: impl Into<Vec<u8>>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl Default for MarkerDialect {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ERROR_MARKER)
    }
}

impl ErrorDialect for MarkerDialect {
    fn detect(&self, payload: &[u8]) -> Option<ErrorCode> {
        let start = payload
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(payload.len());
        let rest = payload[start..].strip_prefix(self.marker.as_slice())?;
        let rest = String::from_utf8_lossy(rest);
        let rest = rest.trim();

        let (head, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        match head.parse::<i64>() {
            Ok(code) => Some(ErrorCode::new(code, tail.trim())),
            Err(_) => Some(ErrorCode::new(ErrorCode::UNKNOWN, rest)),
        }
    }
}

/// A classified reply
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Value(Value),
    Error(ErrorCode),
}

impl Reply {
    /// Check for an error form first, then decode the payload as a value
    pub fn classify(payload: &[u8], dialect: &dyn ErrorDialect) -> Result<Self> {
        if let Some(error) = dialect.detect(payload) {
            return Ok(Reply::Error(error));
        }
        Ok(Reply::Value(decode(payload)?))
    }
}
