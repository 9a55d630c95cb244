//! Error types for dlcpro
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::protocol::ParameterName;

/// Result type alias using DlcError
pub type Result<T> = std::result::Result<T, DlcError>;

/// Unified error type for dlcpro operations
#[derive(Debug, Error)]
pub enum DlcError {
    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Malformed response: {0}")]
    Malformed(#[from] MalformedResponse),

    #[error("Unsupported type: cannot encode {0}")]
    UnsupportedType(String),

    #[error("Invalid parameter name: {0}")]
    InvalidParameterName(String),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Timed out waiting for the instrument prompt")]
    Timeout,

    #[error("Failed to connect to {addr}: {source}")]
    Connection {
        addr: String,
        source: std::io::Error,
    },

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Reply out of step with request: sent '{expected}', reply echoes '{got}'")]
    Desynchronized { expected: String, got: String },

    // -------------------------------------------------------------------------
    // Instrument Errors
    // -------------------------------------------------------------------------
    #[error("Machine error {code}: {message}")]
    Machine { code: i64, message: String },

    // -------------------------------------------------------------------------
    // Monitoring Errors
    // -------------------------------------------------------------------------
    #[error("Already monitoring parameter {0}")]
    AlreadyMonitoring(ParameterName),

    #[error("Not monitoring parameter {0}")]
    NotMonitoring(ParameterName),

    #[error("Threshold type mismatch: {0}")]
    ThresholdType(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Structural violations found while decoding a reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedResponse {
    #[error("unterminated string opened at position {position}")]
    UnterminatedString { position: usize },

    #[error("unterminated list opened at position {position}")]
    UnterminatedList { position: usize },

    #[error("unmatched ')' at position {position}")]
    UnexpectedClose { position: usize },

    #[error("could not parse atom '{0}'")]
    UnparsableAtom(String),

    #[error("expected exactly one top-level value, found {0}")]
    MultipleTopLevelValues(usize),

    #[error("empty response")]
    Empty,

    #[error("string starting at position {position} is not valid UTF-8")]
    InvalidUtf8 { position: usize },
}

