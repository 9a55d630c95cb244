//! Monitor Module
//!
//! Client-side change notifications for instrument parameters.
//!
//! ## Responsibilities
//! - Poll each monitored parameter at its own interval
//! - Drop samples that did not change enough (see [`ChangeGate`])
//! - Fan emitted samples out to any number of [`SampleStream`]s
//! - Complete every stream exactly once when monitoring stops
//!
//! Compiled with the `monitor` feature (on by default).

mod gate;
mod session;
mod stream;

pub use gate::ChangeGate;
pub use session::{MonitorSession, Subscription};
pub use stream::{MonitorEvent, Sample, SampleStream};

use crate::error::Result;
use crate::network::Connection;
use crate::protocol::{ParameterName, Value};
use crate::session::CommandSession;

/// Anything that can read a parameter's current value
pub trait ParameterSource: Send + Sync {
    fn sample(&self, name: &ParameterName) -> Result<Value>;

    /// Release the source; called by an owning monitor session on close
    fn shutdown(&self) {}
}

impl<C: Connection> ParameterSource for CommandSession<C> {
    fn sample(&self, name: &ParameterName) -> Result<Value> {
        self.query(name)
    }

    fn shutdown(&self) {
        self.close();
    }
}
