//! Bidirectional socket transport over `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{
    client::IntoClientRequest,
    error::Error as WsError,
    http::header::{HeaderValue, AUTHORIZATION},
    protocol::Message,
};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::domain::connection::TransportKind;
use crate::ports::{DuplexTransport, Transport, TransportError, TransportSignal};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketTransport {
    ws: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Performs the handshake. The token, when present, travels as a bearer
    /// `Authorization` header. A server that accepts TCP but never completes
    /// the upgrade fails the attempt after `handshake_timeout`.
    pub async fn connect(
        url: &Url,
        token: Option<Secret<String>>,
        handshake_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidEndpoint(e.to_string()))?;

        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|_| TransportError::Connect("token is not a valid header value".into()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let handshake = tokio::time::timeout(handshake_timeout, connect_async(request))
            .await
            .map_err(|_| {
                TransportError::Connect(format!(
                    "socket handshake timed out after {:?}",
                    handshake_timeout
                ))
            })?;

        match handshake {
            Ok((ws, _response)) => Ok(Self { ws, closed: false }),
            Err(WsError::Http(response)) => Err(TransportError::Status(response.status().as_u16())),
            Err(e) => Err(TransportError::Connect(e.to_string())),
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    async fn next_signal(&mut self) -> TransportSignal {
        if self.closed {
            return TransportSignal::Closed { reason: None };
        }
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return TransportSignal::Message(text),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => return TransportSignal::Message(text),
                    Err(_) => tracing::warn!("dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    self.closed = true;
                    return TransportSignal::Closed {
                        reason: frame.map(|f| f.reason.to_string()),
                    };
                }
                // Pongs are queued by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(e)) => {
                    self.closed = true;
                    return TransportSignal::Error(format!("WebSocket error: {}", e));
                }
                None => {
                    self.closed = true;
                    return TransportSignal::Closed { reason: None };
                }
            }
        }
    }

    fn duplex(&mut self) -> Option<&mut dyn DuplexTransport> {
        Some(self)
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.ws.close(None).await {
                tracing::debug!(error = %e, "socket close handshake failed");
            }
        }
    }
}

#[async_trait]
impl DuplexTransport for WebSocketTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.ws
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    #[tokio::test]
    async fn exchanges_frames_with_bearer_auth() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut auth = None;
            let capture_auth = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                auth = req
                    .headers()
                    .get(AUTHORIZATION)
                    .map(|v| v.to_str().unwrap().to_string());
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, capture_auth)
                .await
                .unwrap();

            ws.send(Message::Text("hello".into())).await.unwrap();
            let received = match ws.next().await {
                Some(Ok(Message::Text(text))) => text,
                other => panic!("unexpected frame: {:?}", other),
            };
            ws.close(None).await.unwrap();
            (auth, received)
        });

        let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();
        let mut socket = WebSocketTransport::connect(
            &url,
            Some(Secret::new("abc".to_string())),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(socket.kind(), TransportKind::Socket);
        assert_eq!(socket.next_signal().await, TransportSignal::Message("hello".into()));

        socket
            .duplex()
            .unwrap()
            .send_text("ping".to_string())
            .await
            .unwrap();
        assert!(matches!(socket.next_signal().await, TransportSignal::Closed { .. }));

        let (auth, received) = server.await.unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer abc"));
        assert_eq!(received, "ping");
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();
        let result = WebSocketTransport::connect(&url, None, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[tokio::test]
    async fn stalled_upgrade_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accepts TCP and never answers the upgrade request.
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let url = Url::parse(&format!("ws://{}/ws", addr)).unwrap();
        let result = WebSocketTransport::connect(&url, None, Duration::from_millis(200)).await;

        match result {
            Err(TransportError::Connect(message)) => assert!(message.contains("timed out")),
            other => panic!("expected handshake timeout, got {:?}", other.map(|_| ())),
        }
        server.abort();
    }
}
