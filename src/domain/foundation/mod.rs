//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the event envelope, and error types
//! that form the vocabulary of the pipeline dashboard core.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DecodeError, EventEnvelope, EventType};
pub use ids::{LeadId, MessageId, StageId, SubscriptionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
