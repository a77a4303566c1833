//! Transport ports - Interfaces for the live event channel.
//!
//! Two drivers exist: a bidirectional socket and a server-push stream. Both
//! normalize their open/message/error/close signals into [`TransportSignal`].
//! Only the socket can send; that capability is exposed through
//! [`Transport::duplex`] so callers check it at the type level instead of
//! probing at runtime.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::connection::TransportKind;
use crate::domain::foundation::{DomainError, ErrorCode};

/// One normalized signal from an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// A complete text frame (socket) or event data block (stream).
    Message(String),
    /// The peer closed the channel or the body ended.
    Closed { reason: Option<String> },
    /// The channel broke. Treated like a close by the connection manager.
    Error(String),
}

/// Errors raised while opening or writing to a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("send failed: {0}")]
    Send(String),
}

impl From<TransportError> for DomainError {
    fn from(err: TransportError) -> Self {
        DomainError::new(ErrorCode::TransportError, err.to_string())
    }
}

/// An open live channel.
///
/// `next_signal` must be cancel safe: the connection manager races it against
/// outbound frames and drops the future when a frame wins. Implementations
/// keep partial-read state in `self`, never in the future.
#[async_trait]
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    /// Waits for the next signal. After `Closed` or `Error` the transport is
    /// finished and is not polled again.
    async fn next_signal(&mut self) -> TransportSignal;

    /// The send half, for transports that have one.
    fn duplex(&mut self) -> Option<&mut dyn DuplexTransport> {
        None
    }

    /// Closes the channel. Idempotent.
    async fn close(&mut self);
}

/// Client-to-server capability of a transport.
#[async_trait]
pub trait DuplexTransport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
}

/// Opens transports of a requested kind.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn open(&self, kind: TransportKind) -> Result<Box<dyn Transport>, TransportError>;
}
