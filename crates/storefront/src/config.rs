//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARIGOLD_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//! - `GATEWAY_API_URL` - Payment gateway REST endpoint base
//! - `GATEWAY_KEY_ID` - Gateway key ID (public, handed to the client widget)
//! - `GATEWAY_KEY_SECRET` - Gateway key secret (signs payment references)
//!
//! ## Optional
//! - `MARIGOLD_HOST` - Bind address (default: 127.0.0.1)
//! - `MARIGOLD_PORT` - Listen port (default: 3000)
//! - `MARIGOLD_BASE_URL` - Public URL (default: http://localhost:3000)
//! - `MARIGOLD_SHIPPING_FEE` - Flat shipping fee in rupees (default: 49)
//! - `MARIGOLD_FREE_SHIPPING_THRESHOLD` - Free-shipping subtotal in rupees
//!   (default: 499)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

use marigold_core::Price;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct MarigoldConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Payment gateway configuration
    pub gateway: GatewayConfig,
    /// Flat shipping fee below the free-shipping threshold
    pub shipping_fee: Price,
    /// Subtotal at or above which shipping is free
    pub free_shipping_threshold: Price,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Payment gateway API configuration.
///
/// Implements `Debug` manually to redact the key secret.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Gateway REST endpoint base (e.g. <https://api.gateway.example>)
    pub api_url: String,
    /// Key ID, safe to expose to the client widget
    pub key_id: String,
    /// Key secret, server-side only; signs payment references
    pub key_secret: SecretString,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_url", &self.api_url)
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish()
    }
}

impl MarigoldConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MARIGOLD_DATABASE_URL")?;
        let host = get_env_or_default("MARIGOLD_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("MARIGOLD_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("MARIGOLD_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("MARIGOLD_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("MARIGOLD_BASE_URL", "http://localhost:3000");

        let gateway = GatewayConfig::from_env()?;
        let shipping_fee = get_rupees("MARIGOLD_SHIPPING_FEE", 49)?;
        let free_shipping_threshold = get_rupees("MARIGOLD_FREE_SHIPPING_THRESHOLD", 499)?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            gateway,
            shipping_fee,
            free_shipping_threshold,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl GatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_required_env("GATEWAY_API_URL")?,
            key_id: get_required_env("GATEWAY_KEY_ID")?,
            key_secret: get_required_secret("GATEWAY_KEY_SECRET")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a whole-rupee amount from the environment.
fn get_rupees(key: &str, default: i64) -> Result<Price, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<i64>()
            .map(Price::from_rupees)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(Price::from_rupees(default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = MarigoldConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            gateway: GatewayConfig {
                api_url: "https://api.gateway.example".to_string(),
                key_id: "key_test".to_string(),
                key_secret: SecretString::from("secret"),
            },
            shipping_fee: Price::from_rupees(49),
            free_shipping_threshold: Price::from_rupees(499),
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_gateway_config_debug_redacts_secret() {
        let config = GatewayConfig {
            api_url: "https://api.gateway.example".to_string(),
            key_id: "key_test".to_string(),
            key_secret: SecretString::from("super_secret_value"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("key_test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_value"));
    }
}
