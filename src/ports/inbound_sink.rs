//! InboundSink port - Where the connection manager delivers raw frames.

/// Receives raw inbound text from the live channel.
///
/// Implemented by the event router. Called from the connection task in the
/// order frames arrive; implementations must not block.
pub trait InboundSink: Send + Sync {
    fn on_message(&self, raw: &str);

    /// The transport closed. Anything buffered for that connection is stale.
    fn on_connection_reset(&self);
}
