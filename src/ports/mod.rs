//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the sync core and the outside world. Adapters implement these ports.
//!
//! ## Live Channel Ports
//!
//! - `Transport` / `DuplexTransport` - An open socket or push stream
//! - `TransportConnector` - Opens a transport of a requested kind
//! - `TokenSource` - Auth token read at connect time
//! - `InboundSink` - Receives raw inbound frames (the event router)
//! - `ConnectionObserver` - Connection status callbacks
//!
//! ## Dispatch Ports
//!
//! - `EventHandler` - Callback invoked for a dispatched envelope
//!
//! ## Backend Ports
//!
//! - `PipelineApi` - REST calls for stages, leads, metrics and mutations

mod connection_observer;
mod event_handler;
mod inbound_sink;
mod pipeline_api;
mod token_source;
mod transport;

pub use connection_observer::ConnectionObserver;
pub use event_handler::EventHandler;
pub use inbound_sink::InboundSink;
pub use pipeline_api::{ApiError, PipelineApi};
pub use token_source::TokenSource;
pub use transport::{
    DuplexTransport, Transport, TransportConnector, TransportError, TransportSignal,
};
