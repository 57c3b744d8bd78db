//! Console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CONSOLE_API_BASE_URL` - Base URL of the API gateway fronting the services
//!
//! ## Optional
//! - `CONSOLE_HOST` - Bind address (default: 127.0.0.1)
//! - `CONSOLE_PORT` - Listen port (default: 3002)
//! - `CONSOLE_BASE_URL` - Public URL of the console (default: `http://{host}:{port}`)
//! - `CONSOLE_AUTH_PATH` - Gateway prefix of the auth service (default: /auth-service)
//! - `CONSOLE_API_CONNECT_TIMEOUT_SECS` - Transport connect timeout (default: 10)
//! - `CONSOLE_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_PORT: &str = "3002";
const DEFAULT_AUTH_PATH: &str = "/auth-service";
const DEFAULT_CONNECT_TIMEOUT_SECS: &str = "10";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Console application configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the console
    pub base_url: String,
    /// Backend gateway settings
    pub api: ApiConfig,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Sentry settings (DSN is optional)
    pub sentry: SentryConfig,
}

/// Where and how to reach the backend services.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Gateway base URL, without trailing slash
    pub base_url: String,
    /// Path prefix of the auth service on the gateway
    pub auth_path: String,
    /// Transport-level connect timeout
    pub connect_timeout: Duration,
}

/// Sentry error tracking configuration.
///
/// Implements `Debug` manually to redact the DSN.
#[derive(Clone)]
pub struct SentryConfig {
    pub dsn: Option<SecretString>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl std::fmt::Debug for SentryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryConfig")
            .field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .field("traces_sample_rate", &self.traces_sample_rate)
            .finish()
    }
}

impl ConsoleConfig {
    /// Load configuration from the process environment (and `.env`).
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env
            .or_default("CONSOLE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| invalid("CONSOLE_HOST", e))?;
        let port = env
            .or_default("CONSOLE_PORT", DEFAULT_PORT)
            .parse::<u16>()
            .map_err(|e| invalid("CONSOLE_PORT", e))?;
        let base_url = env
            .optional("CONSOLE_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}"));

        let api = ApiConfig {
            base_url: parse_api_base(&env.required("CONSOLE_API_BASE_URL")?)?,
            auth_path: normalize_path(&env.or_default("CONSOLE_AUTH_PATH", DEFAULT_AUTH_PATH)),
            connect_timeout: Duration::from_secs(
                env.or_default("CONSOLE_API_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)
                    .parse::<u64>()
                    .map_err(|e| invalid("CONSOLE_API_CONNECT_TIMEOUT_SECS", e))?,
            ),
        };

        let sentry = SentryConfig {
            dsn: env.optional("SENTRY_DSN").map(SecretString::from),
            environment: env.optional("SENTRY_ENVIRONMENT"),
            sample_rate: env
                .optional("SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            traces_sample_rate: env
                .optional("SENTRY_TRACES_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0.1),
        };

        Ok(Self {
            host,
            port,
            base_url,
            api,
            log_json: env.optional("CONSOLE_LOG_JSON").is_some(),
            sentry,
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the console is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

fn invalid(key: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), err.to_string())
}

fn parse_api_base(raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw).map_err(|e| invalid("CONSOLE_API_BASE_URL", e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            "CONSOLE_API_BASE_URL",
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ConsoleConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ConsoleConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("CONSOLE_API_BASE_URL", "http://gateway:8080/api/")]).unwrap();
        assert_eq!(config.api.base_url, "http://gateway:8080/api");
        assert_eq!(config.api.auth_path, "/auth-service");
        assert_eq!(config.port, 3002);
        assert_eq!(config.base_url, "http://127.0.0.1:3002");
        assert!(!config.is_secure());
        assert!(config.sentry.dsn.is_none());
    }

    #[test]
    fn test_missing_api_base() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnvVar(k)) if k == "CONSOLE_API_BASE_URL"));
    }

    #[test]
    fn test_rejects_non_http_base() {
        let err = load(&[("CONSOLE_API_BASE_URL", "ftp://gateway")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(..)));
    }

    #[test]
    fn test_auth_path_normalized() {
        let config = load(&[
            ("CONSOLE_API_BASE_URL", "https://gw"),
            ("CONSOLE_AUTH_PATH", "auth/"),
            ("CONSOLE_BASE_URL", "https://console.example"),
        ])
        .unwrap();
        assert_eq!(config.api.auth_path, "/auth");
        assert!(config.is_secure());
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("CONSOLE_API_BASE_URL", "http://gw"), ("CONSOLE_PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(k, _) if k == "CONSOLE_PORT"));
    }

    #[test]
    fn test_sentry_debug_redacts_dsn() {
        let config = load(&[
            ("CONSOLE_API_BASE_URL", "http://gw"),
            ("SENTRY_DSN", "https://key@sentry.io/1"),
        ])
        .unwrap();
        let debug = format!("{:?}", config.sentry);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("key@sentry"));
    }
}
