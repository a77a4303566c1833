//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `PIPELINE_SYNC` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use pipeline_sync::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Dashboard backend at {}", config.endpoint.base_url);
//! ```

mod endpoint;
mod error;
mod logging;
mod sync;

pub use endpoint::EndpointConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use sync::SyncConfig;

use serde::Deserialize;

use crate::application::{ConnectionSettings, SessionSettings};
use crate::domain::connection::TransportEnvironment;

/// Root configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Reconnect, replay and fallback tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Backend location and identity
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `PIPELINE_SYNC` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `PIPELINE_SYNC__SYNC__BASE_DELAY_MS=500` -> `sync.base_delay_ms = 500`
    /// - `PIPELINE_SYNC__ENDPOINT__BASE_URL=...` -> `endpoint.base_url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PIPELINE_SYNC")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for zero delays, attempts or queue capacity,
    /// a non-http(s) base URL, or an empty user id.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.sync.validate()?;
        self.endpoint.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Session tuning for the given transport environment.
    pub fn session_settings(&self, environment: TransportEnvironment) -> SessionSettings {
        SessionSettings {
            connection: ConnectionSettings {
                policy: self.sync.backoff_policy(),
                environment,
                socket_fallback_after: self.sync.socket_fallback_after,
            },
            replay_queue_capacity: self.sync.replay_queue_capacity,
        }
    }
}
