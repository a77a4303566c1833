//! TokenSource port - Out-of-band auth token for the live channel.

use secrecy::Secret;

/// Supplies the bearer token at connect time.
///
/// Read fresh on every attempt so a refreshed token is picked up by the next
/// reconnect. `None` means connect unauthenticated and let the server decide.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<Secret<String>>;
}
