//! Connection manager - the live channel's lifecycle owner.
//!
//! One background task runs per connect epoch. It opens a transport chosen
//! by the [`TransportPlan`], pumps inbound frames into the [`InboundSink`],
//! flushes outbound frames, and on failure walks the backoff schedule until
//! the channel reopens or the attempt budget is spent.
//!
//! ```text
//! DISCONNECTED --connect()--> CONNECTING --open--> CONNECTED
//!                                  │                   │ close/error
//!                                  └──── error ────────┤
//!                                                      ▼
//!                      attempts < max: RECONNECTING --timer--> CONNECTING
//!                      attempts = max: FAILED (until connect())
//! any --disconnect()--> DISCONNECTED
//! ```
//!
//! Sends are only possible while CONNECTED over a transport with a send
//! half. Frames accepted then are flushed in order by the task; frames still
//! queued when the transport closes are discarded, never carried across a
//! reconnect.

use serde_json::{json, Value as JsonValue};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::domain::connection::{
    BackoffPolicy, ConnectionLifecycle, ConnectionState, FailureOutcome, TransportEnvironment,
    TransportKind, TransportPlan,
};
use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use crate::ports::{
    ConnectionObserver, InboundSink, Transport, TransportConnector, TransportSignal,
};

/// Default consecutive socket failures before falling back to the stream.
pub const DEFAULT_SOCKET_FALLBACK_AFTER: u32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub policy: BackoffPolicy,
    pub environment: TransportEnvironment,
    /// Zero disables fallback.
    pub socket_fallback_after: u32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("not connected (state {0})")]
    NotConnected(ConnectionState),

    #[error("{0} transport has no client-to-server channel")]
    Unsupported(TransportKind),
}

impl From<SendError> for DomainError {
    fn from(err: SendError) -> Self {
        let code = match &err {
            SendError::NotConnected(_) => ErrorCode::NotConnected,
            SendError::Unsupported(_) => ErrorCode::Unsupported,
        };
        DomainError::new(code, err.to_string())
    }
}

pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    connector: Arc<dyn TransportConnector>,
    sink: Arc<dyn InboundSink>,
    status: watch::Sender<ConnectionState>,
    observers: Mutex<Vec<Arc<dyn ConnectionObserver>>>,
    inner: Mutex<Inner>,
}

struct Inner {
    lifecycle: ConnectionLifecycle,
    plan: TransportPlan,
    epoch: u64,
    task: Option<JoinHandle<()>>,
    active: Option<TransportKind>,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn TransportConnector>,
        sink: Arc<dyn InboundSink>,
        settings: ConnectionSettings,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                connector,
                sink,
                status,
                observers: Mutex::new(Vec::new()),
                inner: Mutex::new(Inner {
                    lifecycle: ConnectionLifecycle::new(settings.policy),
                    plan: TransportPlan::new(settings.environment, settings.socket_fallback_after),
                    epoch: 0,
                    task: None,
                    active: None,
                    outbound: None,
                }),
            }),
        }
    }

    /// Starts connecting. A no-op returning false while CONNECTING,
    /// CONNECTED or RECONNECTING. From FAILED it starts a fresh attempt
    /// budget. Must be called inside a tokio runtime.
    pub fn connect(&self) -> bool {
        let started = self.shared.update(None, |inner| {
            if !inner.lifecycle.begin() {
                return None;
            }
            inner.plan.reset();
            inner.epoch += 1;
            Some(inner.epoch)
        });

        let Some(Some(epoch)) = started else {
            tracing::debug!(state = %self.status(), "connect ignored, already active");
            return false;
        };

        let task = tokio::spawn(run_epoch(Arc::clone(&self.shared), epoch));
        let mut inner = self.shared.lock();
        if inner.epoch == epoch {
            inner.task = Some(task);
        } else {
            // Disconnected before the handle could be stored.
            task.abort();
        }
        true
    }

    /// Tears down the channel: cancels any backoff timer, drops the
    /// transport and discards queued outbound frames. Synchronous.
    pub fn disconnect(&self) {
        let task = self.shared.update(None, |inner| {
            inner.epoch += 1;
            inner.active = None;
            inner.outbound = None;
            inner.lifecycle.reset();
            inner.task.take()
        });
        if let Some(Some(task)) = task {
            task.abort();
        }
        self.shared.sink.on_connection_reset();
        tracing::info!("disconnected");
    }

    /// Sends `{type, payload}` over the active transport.
    ///
    /// # Errors
    ///
    /// `NotConnected` unless CONNECTED; `Unsupported` when the active
    /// transport is the receive-only stream. Both are also logged.
    pub fn send(&self, event_type: &str, payload: JsonValue) -> Result<(), SendError> {
        let inner = self.shared.lock();
        let state = inner.lifecycle.state();
        if state != ConnectionState::Connected {
            tracing::warn!(event_type, state = %state, "send dropped, not connected");
            return Err(SendError::NotConnected(state));
        }
        let Some(outbound) = &inner.outbound else {
            let kind = inner.active.unwrap_or(TransportKind::Stream);
            tracing::warn!(event_type, transport = %kind, "send dropped, transport is receive-only");
            return Err(SendError::Unsupported(kind));
        };
        let frame = json!({ "type": event_type, "payload": payload }).to_string();
        outbound
            .send(frame)
            .map_err(|_| SendError::NotConnected(state))
    }

    pub fn status(&self) -> ConnectionState {
        *self.shared.status.borrow()
    }

    /// Receiver that observes every status change.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.shared.status.subscribe()
    }

    /// Registers a callback invoked synchronously on every transition, after
    /// the new state is visible through `status()`.
    pub fn add_observer(&self, observer: Arc<dyn ConnectionObserver>) {
        self.shared
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Transport of the current connection, if one is open.
    pub fn active_transport(&self) -> Option<TransportKind> {
        self.shared.lock().active
    }

    /// Consecutive failed attempts in the current cycle.
    pub fn attempts(&self) -> u32 {
        self.shared.lock().lifecycle.attempts()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.epoch += 1;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    /// Runs `f` under the lock, publishes any state change, then notifies
    /// observers outside the lock. With `Some(epoch)`, returns `None` without
    /// running `f` if that epoch has ended.
    fn update<R>(&self, epoch: Option<u64>, f: impl FnOnce(&mut Inner) -> R) -> Option<R> {
        let (result, previous, current) = {
            let mut inner = self.lock();
            if epoch.is_some_and(|e| e != inner.epoch) {
                return None;
            }
            let previous = inner.lifecycle.state();
            let result = f(&mut inner);
            let current = inner.lifecycle.state();
            if previous != current {
                self.status.send_replace(current);
            }
            (result, previous, current)
        };

        if previous != current {
            tracing::debug!(from = %previous, to = %current, "connection state changed");
            let observers = self
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            for observer in observers {
                observer.on_state_change(previous, current);
            }
        }
        Some(result)
    }

    /// Applies a lifecycle transition for `epoch`. False when the epoch has
    /// ended or the transition was invalid; either way the task must stop.
    fn transition(
        &self,
        epoch: u64,
        f: impl FnOnce(&mut Inner) -> Result<(), ValidationError>,
    ) -> bool {
        match self.update(Some(epoch), f) {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                tracing::error!(error = %e, "invalid connection transition");
                false
            }
            None => false,
        }
    }
}

enum Pumped {
    Closed(Option<String>),
    Broken(String),
    Superseded,
}

enum Step {
    Signal(TransportSignal),
    Outbound(Option<String>),
}

async fn run_epoch(shared: Arc<Shared>, epoch: u64) {
    loop {
        let Some(kind) = shared.update(Some(epoch), |inner| inner.plan.next()) else {
            return;
        };
        tracing::debug!(transport = %kind, epoch, "opening transport");

        let socket_broke = match shared.connector.open(kind).await {
            Ok(mut transport) => {
                let (tx, mut rx) = mpsc::unbounded_channel();
                let outbound = transport.duplex().is_some().then_some(tx);
                let opened = shared.transition(epoch, |inner| {
                    inner.lifecycle.opened()?;
                    inner.plan.record_open(kind);
                    inner.active = Some(kind);
                    inner.outbound = outbound;
                    Ok(())
                });
                if !opened {
                    transport.close().await;
                    return;
                }
                tracing::info!(transport = %kind, "connected");

                let ended = pump(&shared, epoch, transport.as_mut(), &mut rx).await;
                transport.close().await;
                let broke = match ended {
                    Pumped::Superseded => return,
                    Pumped::Closed(reason) => {
                        tracing::info!(transport = %kind, reason = reason.as_deref().unwrap_or(""), "transport closed");
                        false
                    }
                    Pumped::Broken(error) => {
                        tracing::warn!(transport = %kind, error = %error, "transport error");
                        true
                    }
                };
                shared.sink.on_connection_reset();
                broke
            }
            Err(e) => {
                tracing::warn!(transport = %kind, error = %e, "transport open failed");
                true
            }
        };

        let outcome = shared.update(Some(epoch), |inner| {
            inner.active = None;
            inner.outbound = None;
            if socket_broke {
                inner.plan.record_failure(kind);
            }
            inner.lifecycle.failed()
        });

        match outcome {
            Some(Ok(FailureOutcome::Retry { attempt, delay })) => {
                tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
                tokio::time::sleep(delay).await;
                if !shared.transition(epoch, |inner| inner.lifecycle.retry_due()) {
                    return;
                }
            }
            Some(Ok(FailureOutcome::Exhausted)) => {
                tracing::warn!("reconnect attempts exhausted, connection failed");
                return;
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "invalid connection transition");
                return;
            }
            None => return,
        }
    }
}

async fn pump(
    shared: &Shared,
    epoch: u64,
    transport: &mut dyn Transport,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> Pumped {
    let mut can_send = true;
    loop {
        let step = tokio::select! {
            signal = transport.next_signal() => Step::Signal(signal),
            frame = outbound.recv(), if can_send => Step::Outbound(frame),
        };

        match step {
            Step::Signal(TransportSignal::Message(raw)) => {
                if !shared.is_current(epoch) {
                    return Pumped::Superseded;
                }
                shared.sink.on_message(&raw);
            }
            Step::Signal(TransportSignal::Closed { reason }) => return Pumped::Closed(reason),
            Step::Signal(TransportSignal::Error(error)) => return Pumped::Broken(error),
            Step::Outbound(Some(frame)) => {
                if let Some(duplex) = transport.duplex() {
                    if let Err(e) = duplex.send_text(frame).await {
                        return Pumped::Broken(e.to_string());
                    }
                }
            }
            Step::Outbound(None) => can_send = false,
        }
    }
}
