//! ConnectionObserver port - Status callbacks from the connection manager.

use crate::domain::connection::ConnectionState;

/// Notified synchronously on every connection state transition.
///
/// Exhausted retries are reported here as a transition to `Failed`, never
/// as an error return.
pub trait ConnectionObserver: Send + Sync {
    fn on_state_change(&self, previous: ConnectionState, current: ConnectionState);
}

impl<F> ConnectionObserver for F
where
    F: Fn(ConnectionState, ConnectionState) + Send + Sync,
{
    fn on_state_change(&self, previous: ConnectionState, current: ConnectionState) {
        self(previous, current)
    }
}
