//! Canonical state store.
//!
//! One reducer entry point for every writer: REST results, routed events,
//! and optimistic mutations all go through [`Store::dispatch`]. Listeners see
//! whole post-reducer snapshots through a `watch` channel.

use tokio::sync::watch;

use crate::domain::pipeline::{reduce, Action, DashboardState};

pub struct Store {
    state: watch::Sender<DashboardState>,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(DashboardState::default())
    }

    pub fn with_state(initial: DashboardState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Applies one action. Synchronous; concurrent dispatches are serialized.
    pub fn dispatch(&self, action: Action) {
        let name = action.name();
        self.state.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, action);
        });
        tracing::trace!(action = name, "dispatched");
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Reads the current state without cloning it. Keep `f` short: it holds
    /// the store's read lock.
    pub fn read<R>(&self, f: impl FnOnce(&DashboardState) -> R) -> R {
        f(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
