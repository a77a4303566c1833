//! Production `TransportConnector`: socket via tungstenite, stream via reqwest.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use super::endpoints::ChannelEndpoints;
use super::sse::SseTransport;
use super::websocket::WebSocketTransport;
use crate::domain::connection::{TransportEnvironment, TransportKind};
use crate::ports::{TokenSource, Transport, TransportConnector, TransportError};

pub struct LiveConnector {
    endpoints: ChannelEndpoints,
    tokens: Arc<dyn TokenSource>,
    stream_client: Client,
    connect_timeout: Duration,
}

impl LiveConnector {
    /// `connect_timeout` bounds both handshakes; an established socket or
    /// stream stays open indefinitely.
    pub fn new(
        endpoints: ChannelEndpoints,
        tokens: Arc<dyn TokenSource>,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let stream_client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoints,
            tokens,
            stream_client,
            connect_timeout,
        })
    }

    /// Environment facts the transport plan needs.
    pub fn environment(&self, socket_enabled: bool) -> TransportEnvironment {
        TransportEnvironment {
            socket_supported: socket_enabled,
            secure_origin: self.endpoints.is_secure(),
        }
    }
}

#[async_trait]
impl TransportConnector for LiveConnector {
    async fn open(&self, kind: TransportKind) -> Result<Box<dyn Transport>, TransportError> {
        let token = self.tokens.token();
        match kind {
            TransportKind::Socket => {
                let url = self.endpoints.socket_url()?;
                tracing::debug!(%url, "opening socket transport");
                let socket = WebSocketTransport::connect(&url, token, self.connect_timeout).await?;
                Ok(Box::new(socket))
            }
            TransportKind::Stream => {
                let url = self.endpoints.stream_url()?;
                tracing::debug!(%url, "opening stream transport");
                let stream = SseTransport::open(&self.stream_client, url, token).await?;
                Ok(Box::new(stream))
            }
        }
    }
}
