//! Cookie-backed token source.
//!
//! The dashboard's auth token lives in a cookie set by the login flow. The
//! live channel reads it from the current cookie header at connect time.

use secrecy::{ExposeSecret, Secret};
use std::sync::RwLock;

use crate::ports::TokenSource;

/// Default cookie holding the bearer token.
pub const DEFAULT_AUTH_COOKIE: &str = "token";

/// Reads a named cookie out of a `Cookie` header value.
pub struct CookieTokenSource {
    cookie_name: String,
    cookie_header: RwLock<Secret<String>>,
}

impl CookieTokenSource {
    pub fn new(cookie_name: impl Into<String>, cookie_header: Secret<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            cookie_header: RwLock::new(cookie_header),
        }
    }

    /// Replaces the cookie header, e.g. after a token refresh. The next
    /// connect attempt picks it up.
    pub fn set_cookie_header(&self, cookie_header: Secret<String>) {
        let mut guard = self
            .cookie_header
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = cookie_header;
    }
}

impl TokenSource for CookieTokenSource {
    fn token(&self) -> Option<Secret<String>> {
        let guard = self
            .cookie_header
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        find_cookie(guard.expose_secret(), &self.cookie_name).map(|v| Secret::new(v.to_string()))
    }
}

/// Finds `name` in a `a=1; b=2` cookie string. Empty values count as absent.
fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}
