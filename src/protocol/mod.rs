//! Protocol Module
//!
//! Defines the wire protocol spoken by the controller's command and
//! monitoring interfaces.
//!
//! ## Request Format
//! One line per request, terminated by `\n`:
//! ```text
//! (exec 'NAME ARG...)
//! (param-set! 'NAME VALUE)
//! (param-ref 'NAME)
//! (quit)
//! ```
//!
//! ## Reply Format
//! ```text
//! ┌──────────────────┬──────────────────────┬──────────┐
//! │ echo line \r\n   │ payload (1+ lines)   │ prompt   │
//! └──────────────────┴──────────────────────┴──────────┘
//! ```
//! The echo is discarded by the framer; the payload is one s-expression
//! value or an error form recognised by an [`ErrorDialect`].

mod codec;
mod directive;
mod name;
mod reply;
mod value;

pub use codec::{decode, encode, encode_into, parse_atom};
pub use directive::{request_line, Directive};
pub use name::{canonicalize, ParameterName};
pub use reply::{ErrorCode, ErrorDialect, MarkerDialect, Reply};
pub use value::Value;
