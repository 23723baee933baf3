//! HTTP client utilities and retry logic.
//!
//! This module provides HTTP client configuration, retry policies, and the shared
//! [`ServiceClient`] used by the Basilica API client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

use crate::config::normalize_base_url;
use crate::error::{Error, Result};

/// Default timeout for Basilica API requests (seconds)
pub const BASILICA_DEFAULT_TIMEOUT: u64 = 30;

/// Default connection timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

// Connection pool settings

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

// Retry settings

/// Default maximum number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial retry delay in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;

/// Default maximum retry delay in milliseconds (for exponential backoff)
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5000;

/// Retry policy with exponential backoff.
///
/// Configures how idempotent HTTP requests are retried on transient failure, using
/// exponential backoff to avoid hammering a struggling API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,

    /// Initial delay before first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential backoff)
    pub max_delay: Duration,

    /// Backoff multiplier (typically 2 for exponential backoff)
    pub backoff_multiplier: u32,
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            backoff_multiplier: 2,
        }
    }

    /// Create a retry policy with no retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            backoff_multiplier: 1,
        }
    }

    /// Set the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculate delay for a given attempt number.
    ///
    /// Uses exponential backoff: delay = min(initial_delay * multiplier^(attempt-1), max_delay)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let multiplier = self.backoff_multiplier.saturating_pow(attempt - 1);
        let delay = self.initial_delay.saturating_mul(multiplier);

        std::cmp::min(delay, self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client configuration.
///
/// Timeouts, retries, and connection pooling for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Retry policy
    pub retry_policy: RetryPolicy,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(BASILICA_DEFAULT_TIMEOUT),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            retry_policy: RetryPolicy::new(),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true for methods that are safe to resend after a transient failure.
#[must_use]
pub fn is_idempotent(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::DELETE, Method::OPTIONS].contains(method)
}

/// Builder for [`ServiceClient`].
#[derive(Debug, Clone)]
pub struct ServiceClientBuilder {
    service: String,
    base_url: Url,
    http_config: ClientConfig,
    user_agent: Option<String>,
    bearer_token: Option<Arc<SecretString>>,
}

impl ServiceClientBuilder {
    /// Create a builder for a named service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid.
    pub fn new(
        service: impl Into<String>,
        base_url: impl AsRef<str>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url.as_ref())?;

        Ok(Self {
            service: service.into(),
            base_url,
            http_config: ClientConfig::new().with_timeout(timeout),
            user_agent: None,
            bearer_token: None,
        })
    }

    /// Set the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.http_config.retry_policy = retry;
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        self.with_secret_token(SecretString::from(token.into()))
    }

    /// Same as [`Self::with_bearer_token`] for a token that is already a secret.
    #[must_use]
    pub fn with_secret_token(mut self, token: SecretString) -> Self {
        self.bearer_token = Some(Arc::new(token));
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn build(self) -> Result<ServiceClient> {
        let config = &self.http_config;
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .gzip(true);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!(
                "Failed to build {} HTTP client: {err}",
                self.service
            ))
        })?;

        Ok(ServiceClient {
            service: self.service,
            http,
            base_url: self.base_url,
            bearer_token: self.bearer_token,
            retry_policy: self.http_config.retry_policy,
        })
    }
}

/// Shared HTTP plumbing: URL resolution, authentication, and retries.
#[derive(Clone)]
pub struct ServiceClient {
    service: String,
    http: reqwest::Client,
    base_url: Url,
    bearer_token: Option<Arc<SecretString>>,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceClient")
            .field("service", &self.service)
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.bearer_token.is_some())
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl ServiceClient {
    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Return the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns true if requests carry a bearer token.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// Resolve `path` relative to the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be joined.
    pub fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path.trim_start_matches('/')).map_err(|err| {
            Error::InvalidEndpoint(format!(
                "Invalid {} path `{path}`: {err}",
                self.service
            ))
        })
    }

    /// Send a request, retrying transient failures of idempotent methods.
    ///
    /// `customize` is applied to every attempt (headers, body); `map_status` turns a
    /// non-success status and its body into an [`Error`]. Errors for which
    /// [`Error::is_retryable`] returns false are returned immediately.
    ///
    /// # Errors
    ///
    /// Returns the mapped error of the last attempt.
    pub async fn execute_with_retry<F, M>(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
        customize: F,
        map_status: M,
    ) -> Result<Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
        M: Fn(StatusCode, String) -> Error,
    {
        let max_retries = if is_idempotent(&method) {
            self.retry_policy.max_retries
        } else {
            0
        };
        let mut attempt = 0;

        loop {
            let url = self.build_url(path)?;
            let mut request = self.http.request(method.clone(), url);
            if !params.is_empty() {
                request = request.query(params);
            }
            if let Some(token) = &self.bearer_token {
                request = request.bearer_auth(token.expose_secret());
            }
            request = customize(request);

            info!(service = %self.service, %method, path, attempt, "Sending request");

            let error = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    map_status(status, text)
                }
                Err(err) => Error::from(err),
            };

            if !error.is_retryable() || attempt >= max_retries {
                return Err(error);
            }

            attempt += 1;
            let delay = self.retry_policy.delay_for_attempt(attempt);
            if delay > Duration::from_millis(0) {
                debug!(
                    service = %self.service,
                    path,
                    error = %error,
                    "Retrying request after {:?}",
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}
