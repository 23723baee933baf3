//! Asynchronous Basilica API client implementation.

use crate::models::{
    ExecutorListParams, HealthCheckResponse, ListExecutorsResponse, ListRentalsResponse,
    LogParams, RentalListParams, RentalResponse, RentalStatus, StartRentalRequest,
};
use crate::logs::{LogStream, LOG_FOLLOW_TIMEOUT};
use crate::rental::StartRentalOptions;
use crate::wait::{RentalStatusProvider, RentalWaiter, WaitOptions};
use crate::Result;
use async_trait::async_trait;
use basilica_core::client::{
    ClientConfig, RetryPolicy, ServiceClient, ServiceClientBuilder, BASILICA_DEFAULT_TIMEOUT,
};
use basilica_core::config::BasilicaConfig;
use basilica_core::error::ErrorResponse;
use basilica_core::Error;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use url::Url;

const USER_AGENT: &str = concat!("basilica-sdk/", env!("CARGO_PKG_VERSION"));

const SERVICE_NAME: &str = "basilica-api";

/// Error code the API uses for a request without credentials.
pub const AUTH_MISSING_CODE: &str = "BASILICA_API_AUTH_MISSING";

/// Builder for [`BasilicaClient`].
#[derive(Debug, Clone)]
pub struct BasilicaClientBuilder {
    inner: ServiceClientBuilder,
}

impl BasilicaClientBuilder {
    /// Create a builder for the specified base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let builder = ServiceClientBuilder::new(
            SERVICE_NAME,
            base_url,
            Duration::from_secs(BASILICA_DEFAULT_TIMEOUT),
        )?
        .with_user_agent(USER_AGENT);

        Ok(Self { inner: builder })
    }

    /// Create a builder from a validated [`BasilicaConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &BasilicaConfig) -> Result<Self> {
        config.ensure_valid()?;

        let http_config = ClientConfig::new()
            .with_timeout(config.timeout())
            .with_connect_timeout(config.connect_timeout())
            .with_retry_policy(RetryPolicy::new().with_max_retries(config.max_retries));

        let mut builder = Self::new(&config.base_url)?.with_http_config(http_config);
        if let Some(token) = config.api_token() {
            builder = builder.with_bearer_token(token);
        }

        Ok(builder)
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.inner = self.inner.with_retry_policy(retry);
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.inner = self.inner.with_http_config(config);
        self
    }

    /// Authenticate with a bearer token.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.inner = self.inner.with_bearer_token(token);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn build(self) -> Result<BasilicaClient> {
        let inner = self.inner.build()?;
        Ok(BasilicaClient { inner })
    }
}

/// Asynchronous Basilica API client.
#[derive(Debug, Clone)]
pub struct BasilicaClient {
    inner: ServiceClient,
}

impl BasilicaClient {
    /// Construct an unauthenticated client directly from the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        BasilicaClientBuilder::new(base_url)?.build()
    }

    /// Start building a client for the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn builder(base_url: impl AsRef<str>) -> Result<BasilicaClientBuilder> {
        BasilicaClientBuilder::new(base_url)
    }

    /// Construct a client from `BASILICA_API_URL` and `BASILICA_API_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment holds an invalid URL.
    pub fn from_env() -> Result<Self> {
        let config = BasilicaConfig::from_env()?;
        BasilicaClientBuilder::from_config(&config)?.build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.inner.base_url()
    }

    /// Check API health.
    pub async fn health_check(&self) -> Result<HealthCheckResponse> {
        self.get_json("health", &[]).await
    }

    /// List executors matching the filters.
    pub async fn list_executors(
        &self,
        params: &ExecutorListParams,
    ) -> Result<ListExecutorsResponse> {
        self.get_json("executors", &params.to_pairs()).await
    }

    /// Start a rental. The request is sent once and never retried.
    pub async fn start_rental(&self, request: &StartRentalRequest) -> Result<RentalResponse> {
        let response: RentalResponse = self
            .send_json(Method::POST, "rentals", Some(request), &[])
            .await?;
        info!(rental_id = %response.rental_id, "Rental started");
        Ok(response)
    }

    /// Build a request from `options` and start the rental.
    pub async fn start_rental_with(&self, options: StartRentalOptions) -> Result<RentalResponse> {
        let request = options.build()?;
        self.start_rental(&request).await
    }

    /// Fetch the current status of a rental.
    pub async fn get_rental(&self, rental_id: &str) -> Result<RentalStatus> {
        let path = rental_path(rental_id)?;
        self.get_json(&path, &[]).await
    }

    /// List the caller's rentals.
    pub async fn list_rentals(&self, params: &RentalListParams) -> Result<ListRentalsResponse> {
        self.get_json("rentals", &params.to_pairs()).await
    }

    /// Stop a rental.
    pub async fn stop_rental(&self, rental_id: &str) -> Result<()> {
        let path = rental_path(rental_id)?;
        self.inner
            .execute_with_retry(
                Method::DELETE,
                &path,
                &[],
                |request| request.header("Accept", "application/json"),
                map_status_to_error,
            )
            .await?;
        info!(rental_id, "Rental stopped");
        Ok(())
    }

    /// Fetch a snapshot of a rental's container logs as text.
    ///
    /// Use [`Self::stream_rental_logs`] to follow the output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `params.follow` is set, since a followed
    /// stream never completes.
    pub async fn get_rental_logs(&self, rental_id: &str, params: &LogParams) -> Result<String> {
        if params.follow {
            return Err(Error::InvalidRequest(
                "following logs requires stream_rental_logs".to_string(),
            ));
        }
        self.stream_rental_logs(rental_id, params)
            .await?
            .into_text()
            .await
    }

    /// Open the container log stream of a rental.
    ///
    /// With `params.follow` the request deadline is raised to [`LOG_FOLLOW_TIMEOUT`].
    /// Connection failures before the response arrives are retried like any other
    /// `GET`; once the stream is open, errors surface from [`LogStream::next_chunk`]
    /// and nothing is resent.
    pub async fn stream_rental_logs(
        &self,
        rental_id: &str,
        params: &LogParams,
    ) -> Result<LogStream> {
        let path = format!("{}/logs", rental_path(rental_id)?);
        let follow = params.follow;
        let response = self
            .inner
            .execute_with_retry(
                Method::GET,
                &path,
                &params.to_pairs(),
                |request| {
                    let request = request.header("Accept", "text/plain, */*");
                    if follow {
                        request.timeout(LOG_FOLLOW_TIMEOUT)
                    } else {
                        request
                    }
                },
                map_status_to_error,
            )
            .await?;

        info!(rental_id, follow, "Opened rental log stream");
        Ok(LogStream::new(rental_id, response))
    }

    /// Poll a rental until it reaches `options.target_state`.
    ///
    /// See [`RentalWaiter::wait_for_rental`] for the possible outcomes.
    pub async fn wait_for_rental(
        &self,
        rental_id: &str,
        options: &WaitOptions,
    ) -> Result<RentalStatus> {
        RentalWaiter::new(self.clone())
            .wait_for_rental(rental_id, options)
            .await
    }

    async fn get_json<T>(&self, path: &str, params: &[(&'static str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send_json::<(), T>(Method::GET, path, None, params)
            .await
    }

    async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .inner
            .execute_with_retry(
                method,
                path,
                params,
                |mut request| {
                    request = request.header("Accept", "application/json");
                    if let Some(payload) = body {
                        request = request.json(payload);
                    }
                    request
                },
                map_status_to_error,
            )
            .await?;

        response.json::<R>().await.map_err(|err| {
            Error::ParseError(format!(
                "Failed to parse Basilica response for `{path}`: {err}"
            ))
        })
    }
}

#[async_trait]
impl RentalStatusProvider for BasilicaClient {
    async fn get_rental(&self, rental_id: &str) -> Result<RentalStatus> {
        Self::get_rental(self, rental_id).await
    }
}

fn rental_path(rental_id: &str) -> Result<String> {
    let rental_id = rental_id.trim();
    if rental_id.is_empty() {
        return Err(Error::InvalidRequest(
            "rental id must not be empty".to_string(),
        ));
    }
    if rental_id.contains(['/', '?', '#']) {
        return Err(Error::InvalidRequest(format!(
            "rental id `{rental_id}` contains reserved characters"
        )));
    }
    Ok(format!("rentals/{rental_id}"))
}

fn map_status_to_error(status: StatusCode, text: String) -> Error {
    let parsed = ErrorResponse::parse(&text);
    let message = match &parsed {
        Some(body) => body.error.message.clone(),
        None if text.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        None => text,
    };

    match status {
        StatusCode::UNAUTHORIZED => match parsed {
            Some(body) if body.error.code == AUTH_MISSING_CODE => {
                Error::MissingAuthentication(message)
            }
            _ => Error::Authentication(message),
        },
        StatusCode::FORBIDDEN => Error::Authorization(message),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::BadRequest(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            Error::ServiceUnavailable(format!("Basilica API temporarily unavailable: {message}"))
        }
        status if status.is_server_error() => {
            Error::ServiceUnavailable(format!("Basilica API server error {status}: {message}"))
        }
        _ => Error::HttpError(format!("Basilica API error {status}: {message}")),
    }
}
