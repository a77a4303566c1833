//! Connection domain - lifecycle states, backoff, and transport choice.
//!
//! Pure logic only; the connection manager in the application layer owns
//! the timers and the transports.

mod backoff;
mod lifecycle;
mod state;
mod transport_plan;

pub use backoff::{BackoffPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
pub use lifecycle::{ConnectionLifecycle, FailureOutcome};
pub use state::ConnectionState;
pub use transport_plan::{TransportEnvironment, TransportKind, TransportPlan};
