//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ORDERS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `ORDERS_HOST` - Bind address (default: 127.0.0.1)
//! - `ORDERS_PORT` - Listen port (default: 8080)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size, at least 2 (default: 10)
//! - `NATS_URL` - NATS server URL (default: `nats://localhost:4222`)
//! - `NATS_TOKEN` - NATS auth token
//! - `NATS_STREAM` - `JetStream` stream name (default: ORDERS)
//! - `NATS_SUBJECT` - Subject orders are published on (default: orders)
//! - `NATS_DURABLE_NAME` - Durable consumer name (default: orders-service)
//! - `NATS_ACK_WAIT_SECS` - Redelivery delay for unacknowledged messages (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// The store pool needs one connection for the rehydration cursor and one
/// for loading each aggregate.
const MIN_DATABASE_CONNECTIONS: u32 = 2;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Service configuration.
#[derive(Clone)]
pub struct ServiceConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum pooled database connections
    pub database_max_connections: u32,
    /// IP address to bind the lookup server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Message channel configuration
    pub nats: NatsConfig,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("nats", &self.nats)
            .field("sentry", &self.sentry)
            .finish()
    }
}

/// NATS `JetStream` channel configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct NatsConfig {
    /// Server URL
    pub url: String,
    /// Optional auth token
    pub token: Option<SecretString>,
    /// Stream holding order messages
    pub stream: String,
    /// Subject orders are published on
    pub subject: String,
    /// Durable consumer name; the acknowledged position survives restarts
    pub durable_name: String,
    /// How long the server waits for an ack before redelivering
    pub ack_wait: Duration,
}

impl std::fmt::Debug for NatsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("stream", &self.stream)
            .field("subject", &self.subject)
            .field("durable_name", &self.durable_name)
            .field("ack_wait", &self.ack_wait)
            .finish()
    }
}

/// Sentry configuration. Error tracking is disabled without a DSN.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ORDERS_DATABASE_URL")?;
        let database_max_connections: u32 = parse_env_or_default("DATABASE_MAX_CONNECTIONS", "10")?;
        if database_max_connections < MIN_DATABASE_CONNECTIONS {
            return Err(ConfigError::InvalidEnvVar(
                "DATABASE_MAX_CONNECTIONS".to_string(),
                format!("must be at least {MIN_DATABASE_CONNECTIONS}"),
            ));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            host: parse_env_or_default("ORDERS_HOST", "127.0.0.1")?,
            port: parse_env_or_default("ORDERS_PORT", "8080")?,
            nats: NatsConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl NatsConfig {
    /// Load the channel settings on their own.
    ///
    /// Used by tools that publish orders without touching the database.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `NATS_ACK_WAIT_SECS` is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let ack_wait_secs: u64 = parse_env_or_default("NATS_ACK_WAIT_SECS", "30")?;
        if ack_wait_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "NATS_ACK_WAIT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            url: get_env_or_default("NATS_URL", "nats://localhost:4222"),
            token: get_optional_env("NATS_TOKEN").map(SecretString::from),
            stream: get_env_or_default("NATS_STREAM", "ORDERS"),
            subject: get_env_or_default("NATS_SUBJECT", "orders"),
            durable_name: get_env_or_default("NATS_DURABLE_NAME", "orders-service"),
            ack_wait: Duration::from_secs(ack_wait_secs),
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary_key` if neither is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default`.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn nats_config() -> NatsConfig {
        NatsConfig {
            url: "nats://localhost:4222".to_string(),
            token: Some(SecretString::from("super_secret_nats_token")),
            stream: "ORDERS".to_string(),
            subject: "orders".to_string(),
            durable_name: "orders-service".to_string(),
            ack_wait: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_parse_value() {
        let port: u16 = parse_value("ORDERS_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);

        let host: IpAddr = parse_value("ORDERS_HOST", "0.0.0.0").unwrap();
        assert!(host.is_unspecified());

        let rate: f32 = parse_value("SENTRY_SAMPLE_RATE", "0.25").unwrap();
        assert!((rate - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_value_invalid() {
        let err = parse_value::<u16>("ORDERS_PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "ORDERS_PORT"));

        let err = parse_value::<u16>("ORDERS_PORT", "70000").unwrap_err();
        assert!(err.to_string().starts_with("Invalid environment variable ORDERS_PORT"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServiceConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            database_max_connections: 10,
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            nats: nats_config(),
            sentry: SentryConfig::default(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ServiceConfig {
            database_url: SecretString::from("postgres://user:hunter2@db/orders"),
            database_max_connections: 10,
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            nats: nats_config(),
            sentry: SentryConfig::default(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("orders-service"));
        assert!(debug_output.contains("nats://localhost:4222"));

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("super_secret_nats_token"));
    }
}
