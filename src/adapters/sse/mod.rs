//! Server-Sent Events adapters for the receive-only push stream.

mod decoder;
mod transport;

pub use decoder::SseDecoder;
pub use transport::SseTransport;
