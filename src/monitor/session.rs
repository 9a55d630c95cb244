//! Monitor Session
//!
//! Push-style subscriptions emulated on top of a poll-only interface.
//!
//! ## Threading
//! Every subscription owns one poller thread, woken by a crossbeam ticker.
//! All pollers sample through the same [`ParameterSource`], whose own lock
//! serializes them onto the connection.
//!
//! ## Cancellation
//! Stopping a subscription removes it from the table, drops its cancel
//! sender and joins the poller before completing the streams, so no sample
//! can arrive after `Completed`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, select, tick, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{DlcError, Result};
use crate::network::TcpConnection;
use crate::protocol::{ParameterName, Value};
use crate::session::CommandSession;

use super::gate::ChangeGate;
use super::stream::{Hub, SampleStream};
use super::ParameterSource;

/// Handle to one monitored parameter
///
/// Cheap to clone; every clone refers to the same subscription.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

struct SubscriptionInner {
    name: ParameterName,
    interval: Duration,
    threshold: Option<Value>,
    hub: Hub<Value>,
}

impl Subscription {
    fn new(name: ParameterName, interval: Duration, threshold: Option<Value>) -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                name,
                interval,
                threshold,
                hub: Hub::new(),
            }),
        }
    }

    pub fn name(&self) -> &ParameterName {
        &self.inner.name
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn threshold(&self) -> Option<&Value> {
        self.inner.threshold.as_ref()
    }

    /// A new stream of emitted samples, starting with the latest one
    pub fn stream(&self) -> SampleStream<Value> {
        self.inner.hub.subscribe()
    }

    /// Whether monitoring has been stopped
    pub fn is_completed(&self) -> bool {
        self.inner.hub.is_completed()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.inner.name)
            .field("interval", &self.inner.interval)
            .field("threshold", &self.inner.threshold)
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Table entry for a running subscription
struct ActiveMonitor {
    subscription: Subscription,
    cancel: Sender<()>,
    poller: JoinHandle<()>,
}

impl ActiveMonitor {
    /// Halt polling, then complete the streams
    fn finish(self) {
        drop(self.cancel);
        if self.poller.thread().id() != thread::current().id() && self.poller.join().is_err() {
            tracing::warn!("Poller for {} panicked", self.subscription.name());
        }
        self.subscription.inner.hub.complete();
        tracing::debug!("Stopped monitoring {}", self.subscription.name());
    }
}

/// A session on the monitoring interface
pub struct MonitorSession {
    /// Where samples come from
    source: Arc<dyn ParameterSource>,

    /// Whether `close` shuts the source down
    owns_source: bool,

    /// Active subscriptions, at most one per parameter
    active: Mutex<HashMap<ParameterName, ActiveMonitor>>,

    /// Every emission of every subscription
    all: Arc<Hub<(ParameterName, Value)>>,

    closed: AtomicBool,
}

impl MonitorSession {
    /// Connect to the monitoring port of the configured controller
    pub fn connect(config: &Config) -> Result<Self> {
        let addr = config.monitor_addr();
        let conn = TcpConnection::connect(&addr, config)?;
        let session = CommandSession::open(conn, config, addr)?;
        Ok(Self::owning(Arc::new(session)))
    }

    /// Monitor through `source` and shut it down on close
    pub fn owning(source: Arc<dyn ParameterSource>) -> Self {
        Self::new(source, true)
    }

    /// Monitor through a source that stays open after this session closes,
    /// e.g. a command session shared with other callers
    pub fn sharing(source: Arc<dyn ParameterSource>) -> Self {
        Self::new(source, false)
    }

    fn new(source: Arc<dyn ParameterSource>, owns_source: bool) -> Self {
        Self {
            source,
            owns_source,
            active: Mutex::new(HashMap::new()),
            all: Arc::new(Hub::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether `name` is currently monitored
    pub fn is_monitoring(&self, name: impl AsRef<[u8]>) -> Result<bool> {
        let name = ParameterName::new(name)?;
        Ok(self.active.lock().contains_key(&name))
    }

    /// Start polling `name` every `interval`
    ///
    /// With a `threshold`, only samples differing from the last emitted one by
    /// at least that much are emitted; without one, only changed samples are.
    pub fn begin_monitoring(
        &self,
        name: impl AsRef<[u8]>,
        interval: Duration,
        threshold: Option<Value>,
    ) -> Result<Subscription> {
        let name = ParameterName::new(name)?;
        if interval.is_zero() {
            return Err(DlcError::Config(format!(
                "monitoring interval for {} must be non-zero",
                name
            )));
        }
        let gate = ChangeGate::new(threshold.clone())?;

        // `close` flips the flag under this lock, so no poller can be added
        // after it has drained the table
        let mut active = self.active.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(DlcError::ConnectionClosed);
        }
        if active.contains_key(&name) {
            return Err(DlcError::AlreadyMonitoring(name));
        }

        let subscription = Subscription::new(name.clone(), interval, threshold);
        let (cancel_tx, cancel_rx) = bounded(1);
        let poller = Poller {
            source: Arc::clone(&self.source),
            subscription: subscription.clone(),
            all: Arc::clone(&self.all),
            gate,
            cancel: cancel_rx,
        };
        let handle = thread::Builder::new()
            .name(format!("monitor {}", name))
            .spawn(move || poller.run())?;

        tracing::debug!("Monitoring {} every {:?}", name, interval);
        active.insert(
            name,
            ActiveMonitor {
                subscription: subscription.clone(),
                cancel: cancel_tx,
                poller: handle,
            },
        );

        Ok(subscription)
    }

    /// The handle of a parameter already being monitored
    pub fn monitor(&self, name: impl AsRef<[u8]>) -> Result<Subscription> {
        let name = ParameterName::new(name)?;
        match self.active.lock().get(&name) {
            Some(entry) => Ok(entry.subscription.clone()),
            None => Err(DlcError::NotMonitoring(name)),
        }
    }

    /// Stop polling `name` and complete its streams
    pub fn stop_monitoring(&self, name: impl AsRef<[u8]>) -> Result<()> {
        let name = ParameterName::new(name)?;
        // Released before joining the poller
        let entry = self.active.lock().remove(&name);
        match entry {
            Some(entry) => {
                entry.finish();
                Ok(())
            }
            None => Err(DlcError::NotMonitoring(name)),
        }
    }

    /// Stop every subscription; never fails
    pub fn stop_monitoring_all(&self) {
        let entries: Vec<ActiveMonitor> = self.active.lock().drain().map(|(_, e)| e).collect();
        for entry in entries {
            entry.finish();
        }
    }

    /// Names of all monitored parameters, sorted
    pub fn monitored(&self) -> Vec<ParameterName> {
        let mut names: Vec<ParameterName> = self.active.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// A stream of `(name, sample)` for every emission of every subscription
    ///
    /// Completes only when the session closes.
    pub fn monitor_all(&self) -> SampleStream<(ParameterName, Value)> {
        self.all.subscribe()
    }

    /// Stop all monitoring and release the source if owned
    ///
    /// Idempotent; also runs when the session is dropped.
    pub fn close(&self) {
        let entries: Vec<ActiveMonitor> = {
            let mut active = self.active.lock();
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            active.drain().map(|(_, e)| e).collect()
        };
        // Pollers are joined outside the lock
        for entry in entries {
            entry.finish();
        }
        self.all.complete();
        if self.owns_source {
            self.source.shutdown();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Body of a poller thread
struct Poller {
    source: Arc<dyn ParameterSource>,
    subscription: Subscription,
    all: Arc<Hub<(ParameterName, Value)>>,
    gate: ChangeGate,
    cancel: Receiver<()>,
}

impl Poller {
    fn run(mut self) {
        let ticker = tick(self.subscription.interval());
        loop {
            let keep_polling = select! {
                recv(self.cancel) -> _ => false,
                recv(ticker) -> _ => {
                    // A tick and a cancel can be ready together
                    matches!(self.cancel.try_recv(), Err(TryRecvError::Empty)) && self.poll_once()
                }
            };
            if !keep_polling {
                break;
            }
        }
        tracing::trace!("Poller for {} exiting", self.subscription.name());
    }

    /// Returns false once the source is gone for good
    fn poll_once(&mut self) -> bool {
        let name = self.subscription.name();
        let hub = &self.subscription.inner.hub;
        tracing::trace!("Polling {}", name);

        match self.source.sample(name) {
            Ok(value) => match self.gate.offer(value) {
                Ok(Some(value)) => {
                    self.all.publish((name.clone(), value.clone()));
                    hub.publish(value);
                }
                Ok(None) => {}
                Err(e) => hub.fail(Arc::new(e)),
            },
            Err(DlcError::ConnectionClosed) => {
                tracing::warn!("Connection closed while polling {}", name);
                hub.fail(Arc::new(DlcError::ConnectionClosed));
                return false;
            }
            Err(e) => {
                tracing::warn!("Polling {} failed: {}", name, e);
                hub.fail(Arc::new(e));
            }
        }
        true
    }
}
