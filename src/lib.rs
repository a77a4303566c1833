//! Pipeline Sync - Real-time synchronization core for the sales pipeline dashboard
//!
//! Keeps a canonical client-side view of leads, stages, conversations and
//! metrics consistent with the backend: REST loads seed the store, a
//! self-healing live channel (socket or server-push stream) streams events
//! into it, and optimistic mutations apply locally before the server
//! confirms them.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
