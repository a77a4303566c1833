//! Authentication adapters.
//!
//! Implementations of the `TokenSource` port:
//!
//! - `cookie_token` - Reads the bearer token from the dashboard's auth cookie

mod cookie_token;

pub use cookie_token::{CookieTokenSource, DEFAULT_AUTH_COOKIE};
