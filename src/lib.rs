//! # dlcpro
//!
//! Client for the command and monitoring interfaces of DLC pro instrument
//! controllers, which speak a line-oriented s-expression protocol:
//! - Codec between native values and the parenthesized wire text
//! - Prompt-delimited request/reply framing over TCP
//! - `do` / `set` / `query` with configurable error dispatch
//! - Poll-driven change monitoring with threshold gating
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │      CommandSession      │     │      MonitorSession      │
//! │   (exec / set / query)   │     │ (subscriptions, pollers) │
//! └────────────┬─────────────┘     └────────────┬─────────────┘
//!              │                                │
//!              ▼                                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Codec + Reply dialect                    │
//! │          (Value <-> s-expression, error detection)          │
//! └─────────────────────────────┬───────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Framer                             │
//! │        (request line out, prompt-framed reply in)           │
//! └─────────────────────────────┬───────────────────────────────┘
//!                               │
//!                               ▼
//!                  TCP :1998 (command) / :1999 (monitor)
//! ```
//!
//! ## Logging
//!
//! Everything is logged through `tracing`; install any subscriber to see it.
//! Sent lines and received replies are logged at `debug`.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod session;

#[cfg(feature = "monitor")]
pub mod monitor;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DlcError, MalformedResponse, Result};
pub use config::Config;
pub use protocol::{canonicalize, ErrorCode, ParameterName, Value};
pub use session::CommandSession;

#[cfg(feature = "monitor")]
pub use monitor::{MonitorSession, Subscription};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of dlcpro
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
