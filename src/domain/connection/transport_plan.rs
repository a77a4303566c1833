//! Which transport the next connection attempt uses.
//!
//! The socket transport is preferred when the environment supports it and
//! the origin is secure. A socket that keeps dying falls back to the
//! push-stream transport for the rest of the reconnect cycle; an explicit
//! `connect()` resets the plan and tries the socket again.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Bidirectional socket.
    Socket,
    /// Unidirectional server-push text stream. Has no client-to-server channel.
    Stream,
}

impl TransportKind {
    pub fn supports_send(&self) -> bool {
        matches!(self, TransportKind::Socket)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Socket => f.write_str("socket"),
            TransportKind::Stream => f.write_str("stream"),
        }
    }
}

/// What the runtime environment offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportEnvironment {
    pub socket_supported: bool,
    pub secure_origin: bool,
}

impl TransportEnvironment {
    fn prefers_socket(&self) -> bool {
        self.socket_supported && self.secure_origin
    }
}

#[derive(Debug, Clone)]
pub struct TransportPlan {
    environment: TransportEnvironment,
    /// Consecutive socket failures before falling back. Zero disables fallback.
    fallback_after: u32,
    socket_failures: u32,
}

impl TransportPlan {
    pub fn new(environment: TransportEnvironment, fallback_after: u32) -> Self {
        Self {
            environment,
            fallback_after,
            socket_failures: 0,
        }
    }

    /// Transport for the next CONNECTING entry.
    pub fn next(&self) -> TransportKind {
        if !self.environment.prefers_socket() {
            return TransportKind::Stream;
        }
        if self.fallback_after > 0 && self.socket_failures >= self.fallback_after {
            return TransportKind::Stream;
        }
        TransportKind::Socket
    }

    pub fn record_failure(&mut self, kind: TransportKind) {
        if kind == TransportKind::Socket {
            self.socket_failures = self.socket_failures.saturating_add(1);
        }
    }

    pub fn record_open(&mut self, kind: TransportKind) {
        if kind == TransportKind::Socket {
            self.socket_failures = 0;
        }
    }

    pub fn reset(&mut self) {
        self.socket_failures = 0;
    }
}
