//! Push-stream transport over HTTP Server-Sent Events.
//!
//! Receive-only: [`Transport::duplex`] stays `None`, so the connection
//! manager rejects sends while this driver is active.

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, Secret};
use std::collections::VecDeque;
use std::pin::Pin;

use super::SseDecoder;
use crate::domain::connection::TransportKind;
use crate::ports::{Transport, TransportError, TransportSignal};

type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

pub struct SseTransport {
    body: ByteStream,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

impl SseTransport {
    /// Opens the stream. A non-2xx answer is an open failure.
    pub async fn open(
        client: &Client,
        url: Url,
        token: Option<Secret<String>>,
    ) -> Result<Self, TransportError> {
        let mut request = client.get(url).header(ACCEPT, "text/event-stream");
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Connect(format!("Connection failed: {}", e))
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
        Ok(Self::from_stream(Box::pin(body)))
    }

    fn from_stream(body: ByteStream) -> Self {
        Self {
            body,
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }
}

#[async_trait]
impl Transport for SseTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    async fn next_signal(&mut self) -> TransportSignal {
        loop {
            if let Some(data) = self.ready.pop_front() {
                return TransportSignal::Message(data);
            }
            if self.finished {
                return TransportSignal::Closed { reason: None };
            }
            match self.body.next().await {
                Some(Ok(chunk)) => self.ready.extend(self.decoder.feed(&chunk)),
                Some(Err(e)) => {
                    self.finished = true;
                    return TransportSignal::Error(format!("Stream error: {}", e));
                }
                None => {
                    self.finished = true;
                    return TransportSignal::Closed {
                        reason: Some("stream ended".to_string()),
                    };
                }
            }
        }
    }

    async fn close(&mut self) {
        self.finished = true;
        self.body = Box::pin(futures::stream::empty());
        self.ready.clear();
    }
}
