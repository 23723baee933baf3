//! Error types for Basilica operations.
//!
//! This module provides the error type hierarchy shared by the Basilica crates,
//! including the outcomes of waiting on a rental and the structured error bodies
//! returned by the API.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::types::RentalState;

/// Main error type for Basilica operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The Basilica API could not be reached or is temporarily unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An HTTP request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API rejected the request payload
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request was rejected locally before being sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No credentials were supplied for an endpoint that requires them
    #[error("Authentication required: {0}")]
    MissingAuthentication(String),

    /// Supplied credentials were rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Credentials are valid but lack permission
    #[error("Access denied: {0}")]
    Authorization(String),

    /// Too many requests
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Failed to parse an API response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),

    /// A rental reached a terminal failure state other than the awaited one
    #[error("Rental {rental_id} reached terminal state {state}")]
    RentalTerminalState {
        /// Rental being awaited
        rental_id: String,
        /// State that ended the wait
        state: RentalState,
    },

    /// The deadline elapsed before a rental reached the awaited state
    #[error(
        "Timed out after {}s waiting for rental {rental_id} to reach {target_state} (last state: {})",
        .elapsed.as_secs(),
        describe_state(.last_state.as_ref())
    )]
    RentalWaitTimeout {
        /// Rental being awaited
        rental_id: String,
        /// State that was awaited
        target_state: RentalState,
        /// Time spent waiting
        elapsed: Duration,
        /// Most recently observed state, if any poll completed
        last_state: Option<RentalState>,
    },
}

fn describe_state(state: Option<&RentalState>) -> String {
    state.map_or_else(|| "unknown".to_string(), ToString::to_string)
}

/// Specialized result type for Basilica operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error body returned by the Basilica API.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
    /// Optional request ID for tracing
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Error detail structure.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ErrorDetail {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Whether the server considers the failure transient
    #[serde(default)]
    pub retryable: Option<bool>,
    /// Additional error details
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Attempt to parse a structured error body.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::MissingAuthentication(_) => "AUTH_MISSING",
            Self::Authentication(_) => "AUTH_FAILED",
            Self::Authorization(_) => "FORBIDDEN",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InternalError(_) => "INTERNAL_ERROR",
            Self::RentalTerminalState { .. } => "RENTAL_TERMINAL_STATE",
            Self::RentalWaitTimeout { .. } => "RENTAL_WAIT_TIMEOUT",
        }
    }

    /// Returns true if retrying the same operation later may succeed.
    ///
    /// A wait timeout is retryable: the rental may simply still be provisioning.
    /// A terminal rental state is not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable(_)
                | Self::Timeout(_)
                | Self::RateLimited(_)
                | Self::RentalWaitTimeout { .. }
        )
    }

    /// Returns true if the error was caused by the caller's request.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::BadRequest(_)
                | Self::InvalidRequest(_)
                | Self::MissingAuthentication(_)
                | Self::Authentication(_)
                | Self::Authorization(_)
                | Self::RateLimited(_)
                | Self::ValidationError(_)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::ServiceUnavailable("test".to_string()).error_code(),
            "SERVICE_UNAVAILABLE"
        );
        assert_eq!(Error::Timeout("test".to_string()).error_code(), "TIMEOUT");
        assert_eq!(
            Error::NotFound("test".to_string()).error_code(),
            "NOT_FOUND"
        );
        assert_eq!(
            Error::MissingAuthentication("test".to_string()).error_code(),
            "AUTH_MISSING"
        );
        assert_eq!(
            Error::RateLimited("test".to_string()).error_code(),
            "RATE_LIMITED"
        );
        assert_eq!(
            Error::RentalTerminalState {
                rental_id: "r-1".to_string(),
                state: RentalState::Failed,
            }
            .error_code(),
            "RENTAL_TERMINAL_STATE"
        );
        assert_eq!(
            Error::RentalWaitTimeout {
                rental_id: "r-1".to_string(),
                target_state: RentalState::Active,
                elapsed: Duration::from_secs(300),
                last_state: None,
            }
            .error_code(),
            "RENTAL_WAIT_TIMEOUT"
        );
    }

    #[test]
    fn test_wait_error_display() {
        let err = Error::RentalTerminalState {
            rental_id: "r-42".to_string(),
            state: RentalState::Failed,
        };
        assert_eq!(err.to_string(), "Rental r-42 reached terminal state Failed");

        let err = Error::RentalWaitTimeout {
            rental_id: "r-42".to_string(),
            target_state: RentalState::Active,
            elapsed: Duration::from_secs(20),
            last_state: Some(RentalState::Pending),
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 20s waiting for rental r-42 to reach Active (last state: Pending)"
        );

        let err = Error::RentalWaitTimeout {
            rental_id: "r-42".to_string(),
            target_state: RentalState::Active,
            elapsed: Duration::from_secs(5),
            last_state: None,
        };
        assert!(err.to_string().ends_with("(last state: unknown)"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Timeout("slow".to_string()).is_retryable());
        assert!(Error::ServiceUnavailable("down".to_string()).is_retryable());
        assert!(Error::RentalWaitTimeout {
            rental_id: "r".to_string(),
            target_state: RentalState::Active,
            elapsed: Duration::from_secs(1),
            last_state: None,
        }
        .is_retryable());

        assert!(!Error::Authentication("bad token".to_string()).is_retryable());
        assert!(!Error::RentalTerminalState {
            rental_id: "r".to_string(),
            state: RentalState::Cancelled,
        }
        .is_retryable());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::BadRequest("bad".to_string()).is_client_error());
        assert!(Error::RateLimited("slow down".to_string()).is_client_error());
        assert!(!Error::InternalError("boom".to_string()).is_client_error());
        assert!(!Error::ServiceUnavailable("down".to_string()).is_client_error());
    }

    #[test]
    fn test_parse_api_error_body() {
        let body = r#"{
            "error": {
                "code": "BASILICA_API_AUTH_MISSING",
                "message": "Authentication required",
                "timestamp": "2024-01-01T00:00:00Z",
                "retryable": false
            }
        }"#;

        let parsed = ErrorResponse::parse(body).unwrap();
        assert_eq!(parsed.error.code, "BASILICA_API_AUTH_MISSING");
        assert_eq!(parsed.error.message, "Authentication required");
        assert_eq!(parsed.error.retryable, Some(false));

        assert!(ErrorResponse::parse("not json").is_none());
    }

    #[test]
    fn test_from_url_parse_error() {
        let err = url::Url::parse("not a url").unwrap_err();
        let basilica_err: Error = err.into();
        assert!(matches!(basilica_err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let basilica_err: Error = err.into();
        assert!(matches!(basilica_err, Error::ParseError(_)));
    }

    #[test]
    fn test_error_partial_eq() {
        let err1 = Error::NotFound("test".to_string());
        let err2 = Error::NotFound("test".to_string());
        let err3 = Error::NotFound("other".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
