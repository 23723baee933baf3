//! Configuration structures for Basilica clients.
//!
//! This module provides the connection settings for the Basilica API, including
//! environment-variable loading and validation.

use crate::Error;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Default Basilica API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.basilica.ai";

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "BASILICA_API_URL";

/// Environment variable holding the API bearer token.
pub const API_TOKEN_ENV: &str = "BASILICA_API_TOKEN";

/// Configuration for a Basilica client instance.
///
/// The token is held as a [`SecretString`] and is redacted from `Debug` output.
#[derive(Debug, Validate)]
pub struct BasilicaConfig {
    /// API base URL
    #[validate(url)]
    pub base_url: String,

    /// Optional bearer token
    pub api_token: Option<SecretString>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 3600))]
    pub request_timeout_secs: u64,

    /// Connection timeout in seconds
    #[validate(range(min = 1, max = 300))]
    pub connect_timeout_secs: u64,

    /// Maximum number of retry attempts for idempotent requests
    #[validate(range(min = 0, max = 10))]
    pub max_retries: u32,
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    3
}

impl BasilicaConfig {
    /// Create a new client configuration for the given API URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            base_url: base_url.into(),
            api_token: None,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
        };

        config.ensure_valid()?;
        Ok(config)
    }

    /// Run the field validators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing every invalid field.
    pub fn ensure_valid(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {}", e)))
    }

    /// Load configuration from `BASILICA_API_URL` and `BASILICA_API_TOKEN`.
    ///
    /// Unset or blank variables fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `BASILICA_API_URL` is not a valid URL.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using a custom variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved URL is invalid.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let base_url = non_blank(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::new(base_url)?;

        if let Some(token) = non_blank(API_TOKEN_ENV) {
            config = config.with_api_token(token);
        }

        Ok(config)
    }

    /// Set the bearer token for authentication.
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(SecretString::from(token.into()));
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set connection timeout in seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout_secs = seconds;
        self
    }

    /// Set maximum retry attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the connection timeout as a Duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Expose the bearer token, if one is configured.
    #[must_use]
    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_ref().map(|token| token.expose_secret())
    }

    /// Parse the base URL, normalising it to end with `/` so relative paths join below it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_base_url(&self) -> Result<Url, Error> {
        normalize_base_url(&self.base_url)
    }
}

impl Default for BasilicaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Parse a base URL and make sure its path ends with `/`.
///
/// # Errors
///
/// Returns an error if the URL cannot be parsed or cannot carry a path.
pub fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url =
        Url::parse(raw).map_err(|e| Error::ConfigError(format!("Invalid API URL: {}", e)))?;

    if url.cannot_be_a_base() {
        return Err(Error::ConfigError(format!(
            "Invalid API URL: `{raw}` cannot be used as a base"
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
