//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TOURLINE_DATABASE_URL` - `PostgreSQL` connection string
//! - `SMTP_HOST` - SMTP relay host
//! - `SMTP_USERNAME` - SMTP account username
//! - `SMTP_PASSWORD` - SMTP account password
//! - `SMTP_FROM_ADDRESS` - From address for outbound mail
//!
//! ## Optional
//! - `TOURLINE_HOST` - Bind address (default: 127.0.0.1)
//! - `TOURLINE_PORT` - Listen port (default: 3000)
//! - `SMTP_PORT` - SMTP relay port (default: 587)

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Outbound email configuration
    pub email: EmailConfig,
}

/// SMTP configuration for the notifier.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP relay port
    pub smtp_port: u16,
    /// SMTP account username
    pub smtp_username: String,
    /// SMTP account password
    pub smtp_password: SecretString,
    /// From address for outbound mail
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = SecretString::from(require_env("TOURLINE_DATABASE_URL")?);

        let host = optional_env("TOURLINE_HOST")
            .map_or(Ok(IpAddr::from([127, 0, 0, 1])), |value| {
                value.parse().map_err(|_| {
                    ConfigError::InvalidEnvVar("TOURLINE_HOST".to_owned(), value)
                })
            })?;

        let port = parse_port("TOURLINE_PORT", 3000)?;

        let email = EmailConfig {
            smtp_host: require_env("SMTP_HOST")?,
            smtp_port: parse_port("SMTP_PORT", 587)?,
            smtp_username: require_env("SMTP_USERNAME")?,
            smtp_password: SecretString::from(require_env("SMTP_PASSWORD")?),
            from_address: require_env("SMTP_FROM_ADDRESS")?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            email,
        })
    }

    /// The socket address to bind the listener to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_port(name: &str, default: u16) -> Result<u16, ConfigError> {
    optional_env(name).map_or(Ok(default), |value| {
        value
            .parse()
            .map_err(|_| ConfigError::InvalidEnvVar(name.to_owned(), value))
    })
}
