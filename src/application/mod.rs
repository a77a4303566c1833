//! Application layer - Orchestration over the domain and the ports.
//!
//! Each component owns one concern: the connection manager owns the live
//! channel, the event router owns delivery, the store owns state, and the
//! coordinator owns optimistic writes. The session ties them together.

pub mod connection_manager;
pub mod event_adapter;
pub mod event_router;
pub mod optimistic;
pub mod session;
pub mod store;

pub use connection_manager::{
    ConnectionManager, ConnectionSettings, SendError, DEFAULT_SOCKET_FALLBACK_AFTER,
};
pub use event_adapter::{action_for, AdapterError, StoreEventAdapter};
pub use event_router::{EventRouter, Subscription, DEFAULT_REPLAY_QUEUE_CAPACITY};
pub use optimistic::{MutationError, OptimisticCoordinator, PendingChange, PendingMutation};
pub use session::{RealtimeSession, SessionSettings};
pub use store::Store;
