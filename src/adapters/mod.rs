//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the sync core to external systems:
//! - `websocket` - Bidirectional socket transport (tokio-tungstenite)
//! - `sse` - Receive-only push stream transport (reqwest + SSE decoding)
//! - `http` - REST client for the pipeline backend
//! - `auth` - Token sources for the live channel and REST calls

pub mod auth;
pub mod endpoints;
pub mod http;
pub mod live_connector;
pub mod sse;
pub mod websocket;

pub use auth::{CookieTokenSource, DEFAULT_AUTH_COOKIE};
pub use endpoints::ChannelEndpoints;
pub use http::HttpPipelineApi;
pub use live_connector::LiveConnector;
pub use sse::{SseDecoder, SseTransport};
pub use websocket::WebSocketTransport;
