use std::{env, time::Duration};

use thiserror::Error;

/// Default bound on every store call, in seconds.
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 100;

const LOCAL_SESSION_SECRET: &str = "super-secure-test-secret-value-local";

/// AppConfig
///
/// Holds the service configuration. Loaded once at startup and never mutated;
/// handlers pull it out of the shared state via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the local session bypass and log format.
    pub env: Env,
    // MongoDB connection string.
    pub mongodb_uri: String,
    // Database that holds the `todos` collection.
    pub mongodb_database: String,
    // HMAC secret used to verify session tokens.
    pub session_secret: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Upper bound on a single store call.
    pub store_timeout: Duration,
}

/// Env
///
/// Runtime context. `Local` enables developer conveniences (pretty logs, the
/// `x-user-id` session bypass); `Production` demands every secret explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} is not a valid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "go-mongodb".to_string(),
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// In `production` the MongoDB URI and session secret are mandatory; in
    /// `local` both fall back to development values.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let defaults = Self::default();

        let (mongodb_uri, session_secret) = match env {
            Env::Production => (
                env::var("MONGODB_URI").map_err(|_| ConfigError::Missing("MONGODB_URI"))?,
                env::var("SESSION_SECRET").map_err(|_| ConfigError::Missing("SESSION_SECRET"))?,
            ),
            Env::Local => (
                env::var("MONGODB_URI").unwrap_or(defaults.mongodb_uri),
                env::var("SESSION_SECRET").unwrap_or(defaults.session_secret),
            ),
        };

        let store_timeout = match env::var("STORE_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "STORE_TIMEOUT_SECS",
                        value: raw,
                    });
                }
            },
            Err(_) => defaults.store_timeout,
        };

        Ok(Self {
            env,
            mongodb_uri,
            mongodb_database: env::var("MONGODB_DATABASE").unwrap_or(defaults.mongodb_database),
            session_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            store_timeout,
        })
    }
}
