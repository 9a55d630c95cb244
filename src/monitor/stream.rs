//! Sample streams
//!
//! A cancellable, multi-subscriber event channel. Each subscriber gets its
//! own unbounded crossbeam channel; completion is a distinct event sent
//! exactly once to every stream.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::error::DlcError;

/// One item of a sample stream
#[derive(Debug, Clone)]
pub enum MonitorEvent<T> {
    /// A value that passed the change gate
    Sample(T),

    /// A failed poll; the stream continues
    Error(Arc<DlcError>),

    /// Monitoring stopped; nothing follows
    Completed,
}

/// Item type of a [`SampleStream`] used as an iterator
pub type Sample<T> = std::result::Result<T, Arc<DlcError>>;

/// Receiving end of a subscription
///
/// Iterating blocks for the next sample and ends when monitoring stops.
/// A stream cannot be restarted; call `stream()` on the subscription again
/// for a fresh one.
#[derive(Debug)]
pub struct SampleStream<T> {
    rx: Receiver<MonitorEvent<T>>,
    completed: bool,
}

impl<T> SampleStream<T> {
    fn new(rx: Receiver<MonitorEvent<T>>) -> Self {
        Self { rx, completed: false }
    }

    /// Wait up to `timeout` for the next event
    ///
    /// `None` on timeout, or once `Completed` has been returned.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<MonitorEvent<T>> {
        if self.completed {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(self.observe(event)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.observe(MonitorEvent::Completed)),
        }
    }

    /// Next event if one is already queued
    pub fn try_next(&mut self) -> Option<MonitorEvent<T>> {
        if self.completed {
            return None;
        }
        match self.rx.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.observe(MonitorEvent::Completed)),
        }
    }

    /// Whether this stream has delivered its completion
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn observe(&mut self, event: MonitorEvent<T>) -> MonitorEvent<T> {
        if let MonitorEvent::Completed = event {
            self.completed = true;
        }
        event
    }
}

impl<T> Iterator for SampleStream<T> {
    type Item = Sample<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.completed {
            return None;
        }
        match self.rx.recv() {
            Ok(MonitorEvent::Sample(value)) => Some(Ok(value)),
            Ok(MonitorEvent::Error(error)) => Some(Err(error)),
            Ok(MonitorEvent::Completed) | Err(_) => {
                self.completed = true;
                None
            }
        }
    }
}

/// Fan-out point feeding every stream of one subscription
pub(crate) struct Hub<T> {
    state: Mutex<HubState<T>>,
}

struct HubState<T> {
    subscribers: Vec<Sender<MonitorEvent<T>>>,
    last: Option<T>,
    completed: bool,
}

impl<T: Clone> Hub<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(HubState {
                subscribers: Vec::new(),
                last: None,
                completed: false,
            }),
        }
    }

    /// Attach a new stream; it starts with the latest sample, if any
    pub(crate) fn subscribe(&self) -> SampleStream<T> {
        let (tx, rx) = unbounded();
        let mut state = self.state.lock();

        // `rx` is still in hand, so these sends cannot fail
        if let Some(last) = &state.last {
            let _ = tx.send(MonitorEvent::Sample(last.clone()));
        }
        if state.completed {
            let _ = tx.send(MonitorEvent::Completed);
        } else {
            state.subscribers.push(tx);
        }

        SampleStream::new(rx)
    }

    /// Deliver a sample to every live stream
    pub(crate) fn publish(&self, item: T) {
        let mut state = self.state.lock();
        if state.completed {
            return;
        }
        // Streams that were dropped are pruned here
        state
            .subscribers
            .retain(|tx| tx.send(MonitorEvent::Sample(item.clone())).is_ok());
        state.last = Some(item);
    }

    /// Deliver a poll failure to every live stream
    pub(crate) fn fail(&self, error: Arc<DlcError>) {
        let mut state = self.state.lock();
        if state.completed {
            return;
        }
        state
            .subscribers
            .retain(|tx| tx.send(MonitorEvent::Error(Arc::clone(&error))).is_ok());
    }

    /// Complete every stream; returns false if already completed
    pub(crate) fn complete(&self) -> bool {
        let mut state = self.state.lock();
        if state.completed {
            return false;
        }
        state.completed = true;
        for tx in state.subscribers.drain(..) {
            // Fails only for a stream already dropped, which needs no completion
            let _ = tx.send(MonitorEvent::Completed);
        }
        true
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.state.lock().completed
    }
}
