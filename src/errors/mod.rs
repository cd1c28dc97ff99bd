//! Error types for the User Permissions API client.
//!
//! Every failure a call can produce is one of the [`SdkError`] variants.
//! Caller input problems are detected before a request is built
//! ([`SdkError::Validation`]); everything else comes out of the request
//! pipeline and is classified so the retry handler can decide whether another
//! attempt is worthwhile.

use std::time::Duration;
use thiserror::Error;

use crate::transport::Response;

/// Result type alias for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;

/// Comprehensive error type for SDK operations.
#[derive(Debug, Error)]
pub enum SdkError {
    /// Malformed caller input, detected before a request is built.
    #[error("Validation error: {message}")]
    Validation {
        /// Error message describing the validation issue.
        message: String,
        /// The field that failed validation.
        field: Option<String>,
    },

    /// Connection or timeout failure below the HTTP layer.
    #[error("Network error ({kind}): {message}")]
    Network {
        /// What went wrong at the network level.
        kind: NetworkErrorKind,
        /// Error message.
        message: String,
    },

    /// The server answered with a non-success status code.
    #[error("HTTP error {status}: {}", describe_response(.response))]
    Http {
        /// HTTP status code.
        status: u16,
        /// The full response, kept for hooks and callers.
        response: Box<Response>,
    },

    /// The retry budget was spent without a successful response.
    #[error("Retry budget exhausted after {attempts} attempts: {source}")]
    RetryExhausted {
        /// Number of attempts performed.
        attempts: u32,
        /// The last error observed.
        #[source]
        source: Box<SdkError>,
    },

    /// Configuration error (invalid base URL, unparseable environment value).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },

    /// A successful response whose body could not be decoded or validated.
    #[error("Decode error (status {}): {message}", .response.status)]
    Decode {
        /// Why decoding failed.
        message: String,
        /// The response as received.
        response: Box<Response>,
    },

    /// The worker running an async call failed or was cancelled.
    #[error("Execution error: {message}")]
    Execution {
        /// Error message.
        message: String,
    },
}

/// Network-level failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The attempt did not complete within the resolved timeout.
    Timeout,
    /// The connection could not be established.
    Connect,
    /// The connection broke while sending or reading.
    Other,
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Connect => "connect",
            NetworkErrorKind::Other => "io",
        };
        f.write_str(name)
    }
}

fn describe_response(response: &Response) -> String {
    match ApiErrorBody::from_response(response) {
        Some(body) => format!("{}: {}", body.code, body.message),
        None => response.body.to_string(),
    }
}

impl SdkError {
    /// Returns true if another attempt may succeed.
    ///
    /// Network failures, 5xx responses and 429 are retryable. Everything
    /// else, including an already exhausted retry budget, is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            SdkError::Network { .. } => true,
            SdkError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Returns true if this error was produced by exhausting the retry budget.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, SdkError::RetryExhausted { .. })
    }

    /// Returns true for a network timeout, directly or under a retry wrapper.
    pub fn is_timeout(&self) -> bool {
        match self {
            SdkError::Network { kind, .. } => *kind == NetworkErrorKind::Timeout,
            SdkError::RetryExhausted { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Returns the HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::Http { status, .. } => Some(*status),
            SdkError::RetryExhausted { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Returns the response that caused this error, if one was received.
    pub fn response(&self) -> Option<&Response> {
        match self {
            SdkError::Http { response, .. } | SdkError::Decode { response, .. } => Some(response),
            SdkError::RetryExhausted { source, .. } => source.response(),
            _ => None,
        }
    }

    /// Returns the server-requested wait before the next attempt.
    ///
    /// Only 429 responses carrying a `Retry-After` header produce a value.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SdkError::Http {
                status: 429,
                response,
            } => response.retry_after(),
            _ => None,
        }
    }

    /// Decodes the structured error body returned by the API, if present.
    pub fn api_error(&self) -> Option<ApiErrorBody> {
        self.response().and_then(ApiErrorBody::from_response)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        SdkError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        SdkError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        SdkError::Configuration {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        SdkError::Network {
            kind,
            message: message.into(),
        }
    }

    /// Creates a decode error that keeps the response it came from.
    pub fn decode(message: impl Into<String>, response: Response) -> Self {
        SdkError::Decode {
            message: message.into(),
            response: Box::new(response),
        }
    }

    /// Creates an HTTP error from a non-success response.
    pub fn http(response: Response) -> Self {
        SdkError::Http {
            status: response.status,
            response: Box::new(response),
        }
    }
}

/// Error body returned by the API for 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code (e.g. `NOT_FOUND`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Per-field details, present for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ApiErrorDetail>>,
}

/// A single field-level problem reported by the API.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ApiErrorDetail {
    /// The offending field.
    pub field: String,
    /// Why it was rejected.
    pub reason: String,
}

impl ApiErrorBody {
    /// Decodes the error body of a response, if it has the expected shape.
    pub fn from_response(response: &Response) -> Option<Self> {
        response
            .body
            .as_json()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            NetworkErrorKind::Timeout
        } else if err.is_connect() {
            NetworkErrorKind::Connect
        } else {
            NetworkErrorKind::Other
        };
        SdkError::network(kind, err.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for SdkError {
    fn from(err: url::ParseError) -> Self {
        SdkError::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}
