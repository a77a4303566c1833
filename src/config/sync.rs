//! Reconnect and replay configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::DEFAULT_REPLAY_QUEUE_CAPACITY;
use crate::domain::connection::{BackoffPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};

/// Live channel tuning
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Delay before the first reconnect, doubled on each further attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Reconnects scheduled before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Events held while the store is still loading
    #[serde(default = "default_replay_queue_capacity")]
    pub replay_queue_capacity: usize,

    /// Consecutive socket failures before falling back to the stream (0 = never)
    #[serde(default = "default_socket_fallback_after")]
    pub socket_fallback_after: u32,
}

impl SyncConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.base_delay_ms, self.max_attempts)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_delay_ms == 0 {
            return Err(ValidationError::ZeroBaseDelay);
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::ZeroMaxAttempts);
        }
        if self.replay_queue_capacity == 0 {
            return Err(ValidationError::ZeroQueueCapacity);
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_attempts: default_max_attempts(),
            replay_queue_capacity: default_replay_queue_capacity(),
            socket_fallback_after: default_socket_fallback_after(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_replay_queue_capacity() -> usize {
    DEFAULT_REPLAY_QUEUE_CAPACITY
}

fn default_socket_fallback_after() -> u32 {
    crate::application::DEFAULT_SOCKET_FALLBACK_AFTER
}
