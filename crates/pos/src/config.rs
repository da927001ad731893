//! POS configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOP_API_URL` - Base URL of the shop backend (e.g., http://localhost:8000)
//!
//! ## Optional
//! - `POS_HOST` - Bind address (default: 127.0.0.1)
//! - `POS_PORT` - Listen port (default: 4000)
//! - `SHOP_API_TOKEN` - Bearer token for the shop backend
//! - `POS_CHECKOUT_TIMEOUT_SECS` - Upper bound on a checkout call (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// POS application configuration.
#[derive(Debug, Clone)]
pub struct PosConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Shop backend API configuration
    pub shop_api: ShopApiConfig,
    /// Upper bound on a single checkout service call
    pub checkout_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Shop backend API configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct ShopApiConfig {
    /// Base URL of the shop backend, without a trailing slash
    pub base_url: Url,
    /// Bearer token sent with every request, if configured
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for ShopApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PosConfig {
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

        let host = get_env_or_default("POS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("POS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("POS_PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("POS_PORT".to_string(), e.to_string()))?;

        let shop_api = ShopApiConfig::from_env()?;

        let timeout_secs = get_env_or_default("POS_CHECKOUT_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("POS_CHECKOUT_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            host,
            port,
            shop_api,
            checkout_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("SHOP_API_URL")?;
        let base_url = parse_base_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("SHOP_API_URL".to_string(), e))?;
        let token = get_optional_env("SHOP_API_TOKEN").map(SecretString::from);

        Ok(Self { base_url, token })
    }
}

/// Parse and validate a backend base URL, trimming any trailing slash.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim_end_matches('/')).map_err(|e| e.to_string())?;
    if url.host_str().is_none() {
        return Err("URL must have a host".to_string());
    }
    Ok(url)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_trims_trailing_slash() {
        let url = parse_base_url("http://localhost:8000/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/");
        assert_eq!(url.host_str(), Some("localhost"));
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_shop_api_config_debug_redacts_token() {
        let config = ShopApiConfig {
            base_url: Url::parse("http://localhost:8000").unwrap(),
            token: Some(SecretString::from("super_secret_bearer_token")),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("localhost"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer_token"));
    }

    #[test]
    fn test_socket_addr() {
        let config = PosConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 4000,
            shop_api: ShopApiConfig {
                base_url: Url::parse("http://localhost:8000").unwrap(),
                token: None,
            },
            checkout_timeout: Duration::from_secs(30),
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 4000);
    }
}
