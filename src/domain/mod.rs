//! Domain layer containing the pipeline model and connection rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, event envelope, errors)
//! - `connection` - Connection lifecycle, backoff policy and transport selection
//! - `pipeline` - Leads, stages, dashboard state and its reducer

pub mod connection;
pub mod foundation;
pub mod pipeline;
