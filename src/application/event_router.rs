//! Event router - decode, fan-out, and the pre-ready replay queue.
//!
//! Raw frames from the connection manager arrive through [`InboundSink`].
//! Each one is decoded into an [`EventEnvelope`] and handed to every handler
//! registered for its type, in registration order. Until [`EventRouter::mark_ready`]
//! is called, envelopes are held in a bounded FIFO instead.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::domain::foundation::{EventEnvelope, EventType, SubscriptionId};
use crate::ports::{EventHandler, InboundSink};

/// Default capacity of the replay queue.
pub const DEFAULT_REPLAY_QUEUE_CAPACITY: usize = 100;

type HandlerList = Vec<(SubscriptionId, Arc<dyn EventHandler>)>;

pub struct EventRouter {
    inner: Mutex<RouterInner>,
}

struct RouterInner {
    handlers: HashMap<EventType, HandlerList>,
    ready: bool,
    replay: VecDeque<EventEnvelope>,
    capacity: usize,
}

impl EventRouter {
    pub fn new(replay_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(RouterInner {
                handlers: HashMap::new(),
                ready: false,
                replay: VecDeque::with_capacity(replay_capacity),
                capacity: replay_capacity,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RouterInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handler` for `event_type`. Dropping the returned handle
    /// does not unsubscribe; call [`Subscription::unsubscribe`].
    pub fn subscribe(
        self: &Arc<Self>,
        event_type: impl Into<EventType>,
        handler: Arc<dyn EventHandler>,
    ) -> Subscription {
        let event_type = event_type.into();
        let id = SubscriptionId::new();
        tracing::debug!(
            event_type = %event_type,
            handler = handler.name(),
            subscription_id = %id,
            "subscribed"
        );
        self.lock()
            .handlers
            .entry(event_type.clone())
            .or_default()
            .push((id, handler));

        Subscription {
            id,
            event_type,
            router: Arc::downgrade(self),
        }
    }

    /// Registers a closure as a handler.
    pub fn subscribe_fn<F>(self: &Arc<Self>, event_type: impl Into<EventType>, callback: F) -> Subscription
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        self.subscribe(event_type, Arc::new(FnHandler(callback)))
    }

    /// Removes exactly one registration. Returns false if it was already gone.
    fn remove(&self, event_type: &EventType, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let Some(list) = inner.handlers.get_mut(event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sid, _)| *sid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            inner.handlers.remove(event_type);
        }
        removed
    }

    pub fn subscriber_count(&self, event_type: &EventType) -> usize {
        self.lock().handlers.get(event_type).map_or(0, Vec::len)
    }

    /// Decodes and dispatches one raw frame. Malformed frames are logged and
    /// dropped.
    pub fn route_raw(&self, raw: &str) {
        match EventEnvelope::decode(raw) {
            Ok(envelope) => self.dispatch(envelope),
            Err(e) => {
                tracing::warn!(error = %e, bytes = raw.len(), "dropping malformed envelope");
            }
        }
    }

    /// Dispatches to every matching handler, or queues while not ready.
    pub fn dispatch(&self, envelope: EventEnvelope) {
        let handlers = {
            let mut inner = self.lock();
            if !inner.ready {
                inner.enqueue(envelope);
                return;
            }
            inner.handlers_for(&envelope.event_type)
        };
        invoke(&handlers, &envelope);
    }

    /// Drains the replay queue in receipt order, then switches to live
    /// dispatch. Envelopes that arrive during the drain join the back of the
    /// queue and are drained too.
    pub fn mark_ready(&self) {
        let mut drained = 0usize;
        loop {
            let (envelope, handlers) = {
                let mut inner = self.lock();
                match inner.replay.pop_front() {
                    Some(envelope) => {
                        let handlers = inner.handlers_for(&envelope.event_type);
                        (envelope, handlers)
                    }
                    None => {
                        inner.ready = true;
                        break;
                    }
                }
            };
            invoke(&handlers, &envelope);
            drained += 1;
        }
        tracing::debug!(drained, "event router ready");
    }

    /// Switches back to queueing and discards anything still queued. Used
    /// when the store stops listening, so a later `mark_ready` replays only
    /// what arrived after this point.
    pub fn mark_not_ready(&self) {
        let mut inner = self.lock();
        inner.ready = false;
        inner.replay.clear();
        tracing::debug!("event router queueing");
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    pub fn queued(&self) -> usize {
        self.lock().replay.len()
    }
}

impl RouterInner {
    fn enqueue(&mut self, envelope: EventEnvelope) {
        if self.capacity == 0 {
            return;
        }
        while self.replay.len() >= self.capacity {
            if let Some(evicted) = self.replay.pop_front() {
                tracing::debug!(event_type = %evicted.event_type, "replay queue full, evicting oldest");
            }
        }
        self.replay.push_back(envelope);
    }

    fn handlers_for(&self, event_type: &EventType) -> HandlerList {
        let handlers = self.handlers.get(event_type).cloned().unwrap_or_default();
        if handlers.is_empty() && !event_type.is_known() {
            tracing::debug!(event_type = %event_type, "no subscribers for event type");
        }
        handlers
    }
}

// Lock is released before handlers run, so a handler may subscribe or
// unsubscribe without deadlocking.
fn invoke(handlers: &HandlerList, envelope: &EventEnvelope) {
    for (_, handler) in handlers {
        handler.handle(envelope);
    }
}

impl InboundSink for EventRouter {
    fn on_message(&self, raw: &str) {
        self.route_raw(raw);
    }

    fn on_connection_reset(&self) {
        let mut inner = self.lock();
        if !inner.replay.is_empty() {
            tracing::debug!(discarded = inner.replay.len(), "connection reset, clearing replay queue");
            inner.replay.clear();
        }
    }
}

/// Handle to one registration.
pub struct Subscription {
    id: SubscriptionId,
    event_type: EventType,
    router: Weak<EventRouter>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Removes this registration. Idempotent: later calls return false.
    pub fn unsubscribe(&self) -> bool {
        match self.router.upgrade() {
            Some(router) => router.remove(&self.event_type, self.id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .finish()
    }
}

struct FnHandler<F>(F);

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&EventEnvelope) + Send + Sync,
{
    fn handle(&self, envelope: &EventEnvelope) {
        (self.0)(envelope)
    }

    fn name(&self) -> &'static str {
        "closure"
    }
}
