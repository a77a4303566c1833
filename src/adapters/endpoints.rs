//! Live channel endpoint addressing.

use reqwest::Url;

use crate::domain::foundation::UserId;
use crate::ports::TransportError;

/// Resolved URLs for both live channel drivers.
#[derive(Debug, Clone)]
pub struct ChannelEndpoints {
    base_url: Url,
    socket_path: String,
    stream_path: String,
    user_id: UserId,
}

impl ChannelEndpoints {
    pub fn new(
        base_url: &str,
        socket_path: impl Into<String>,
        stream_path: impl Into<String>,
        user_id: UserId,
    ) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", base_url, e)))?;
        match base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(TransportError::InvalidEndpoint(format!(
                    "unsupported scheme {}",
                    other
                )))
            }
        }
        Ok(Self {
            base_url,
            socket_path: socket_path.into(),
            stream_path: stream_path.into(),
            user_id,
        })
    }

    /// True when the dashboard is served over https.
    pub fn is_secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }

    /// Socket endpoint: `http` becomes `ws`, `https` becomes `wss`.
    pub fn socket_url(&self) -> Result<Url, TransportError> {
        let mut url = self.join(&self.socket_path)?;
        let scheme = if self.is_secure() { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| TransportError::InvalidEndpoint(format!("cannot use {} for {}", scheme, url)))?;
        Ok(url)
    }

    /// Push-stream endpoint with the `userId` query parameter.
    pub fn stream_url(&self) -> Result<Url, TransportError> {
        let mut url = self.join(&self.stream_path)?;
        url.query_pairs_mut()
            .append_pair("userId", self.user_id.as_str());
        Ok(url)
    }

    /// REST endpoint under the same origin.
    pub fn api_url(&self, path: &str) -> Result<Url, TransportError> {
        self.join(path)
    }

    fn join(&self, path: &str) -> Result<Url, TransportError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path))
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", path, e)))
    }
}
