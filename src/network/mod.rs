//! Network Module
//!
//! Byte-stream connections and reply framing.
//!
//! ## Architecture
//! - `Connection`: write / read-until-delimiter / close contract
//! - `Framer`: one request line out, one prompt-terminated reply in

mod connection;
mod framer;

pub use connection::{Connection, StreamConnection, TcpConnection, MAX_REPLY_SIZE};
pub use framer::{extract_payload, split_reply, Framer, FramerState};
