//! Pipeline module - Leads, stages, conversations and the dashboard store model.
//!
//! `DashboardState` is changed only by [`reduce`], which receives REST
//! results and live events alike as [`Action`]s.

mod action;
mod conversation;
mod lead;
mod metrics;
mod reducer;
mod stage;
mod state;

pub use action::Action;
pub use conversation::{upsert_message, ConversationMessage, MessageDirection};
pub use lead::{Lead, LeadPatch};
pub use metrics::DashboardMetrics;
pub use reducer::reduce;
pub use stage::{sort_for_display, PipelineStage};
pub use state::DashboardState;
