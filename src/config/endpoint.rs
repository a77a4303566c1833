//! Backend endpoint configuration

use reqwest::Url;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::DEFAULT_AUTH_COOKIE;

/// Where the dashboard backend lives and who is connecting
#[derive(Debug, Deserialize)]
pub struct EndpointConfig {
    /// Origin of the dashboard backend (http or https)
    pub base_url: String,

    #[serde(default = "default_socket_path")]
    pub socket_path: String,

    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    /// Sent as `userId` on the stream transport
    pub user_id: String,

    /// Cookie carrying the auth token
    #[serde(default = "default_auth_cookie_name")]
    pub auth_cookie_name: String,

    /// Raw `Cookie` header value the token is read from
    pub cookie_header: Option<Secret<String>>,

    /// Allow the socket transport at all
    #[serde(default = "default_socket_enabled")]
    pub socket_enabled: bool,

    /// REST request timeout in seconds; also bounds the stream handshake
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl EndpointConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Cookie header, or an empty one when not configured.
    pub fn cookie_header(&self) -> Secret<String> {
        self.cookie_header
            .as_ref()
            .map(|header| Secret::new(header.expose_secret().clone()))
            .unwrap_or_else(|| Secret::new(String::new()))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ValidationError::InvalidBaseUrl(self.base_url.clone())),
        }
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingRequired("endpoint.user_id"));
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

fn default_socket_path() -> String {
    "/ws".to_string()
}

fn default_stream_path() -> String {
    "/api/events".to_string()
}

fn default_auth_cookie_name() -> String {
    DEFAULT_AUTH_COOKIE.to_string()
}

fn default_socket_enabled() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(base_url: &str) -> EndpointConfig {
        EndpointConfig {
            base_url: base_url.to_string(),
            socket_path: default_socket_path(),
            stream_path: default_stream_path(),
            user_id: "42".to_string(),
            auth_cookie_name: default_auth_cookie_name(),
            cookie_header: None,
            socket_enabled: true,
            request_timeout_secs: 30,
        }
    }

    #[test]
    fn test_valid_endpoint() {
        assert!(endpoint("https://crm.example.com").validate().is_ok());
        assert!(endpoint("http://localhost:3000").validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        assert_eq!(
            endpoint("ftp://crm.example.com").validate(),
            Err(ValidationError::InvalidBaseUrl("ftp://crm.example.com".into()))
        );
        assert!(endpoint("not a url").validate().is_err());
    }

    #[test]
    fn test_rejects_empty_user_id() {
        let mut config = endpoint("https://crm.example.com");
        config.user_id = "  ".to_string();
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("endpoint.user_id"))
        );
    }

    #[test]
    fn test_validation_invalid_timeout() {
        let mut config = endpoint("https://crm.example.com");
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.request_timeout_secs = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_cookie_header_is_empty() {
        let config = endpoint("https://crm.example.com");
        assert_eq!(config.cookie_header().expose_secret(), "");
    }
}
