//! WebSocket adapter for the bidirectional live channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │      ConnectionManager       │  owns one transport per epoch
//! └──────────────────────────────┘
//!            │ next_signal / duplex().send_text
//!            ▼
//! ┌──────────────────────────────┐
//! │     WebSocketTransport       │  tokio-tungstenite client
//! └──────────────────────────────┘
//!            │ wss://<host>/ws  (Authorization: Bearer)
//!            ▼
//!       dashboard server
//! ```

mod transport;

pub use transport::WebSocketTransport;
