//! Error types for API requests.
//!
//! The split between the variants of [`RequestError`] is load-bearing:
//!
//! - [`RequestError::Transport`]: the server could not be reached (connection
//!   failure, timeout). Safe for the caller to retry.
//! - [`RequestError::Http`]: the server answered with a non-2xx status.
//! - [`RequestError::RateLimited`]: the server rejected the call for rate
//!   reasons despite throttling. Logged, never retried automatically.
//! - [`RequestError::InvalidRequest`] / [`RequestError::InvalidPath`]: the
//!   request was rejected locally before anything was sent.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_runtime::clients::RequestError;
//!
//! match executor.get(&credential, "products", None).await {
//!     Ok(response) => println!("Products: {}", response.body),
//!     Err(RequestError::Transport(e)) => println!("Unreachable: {e}"),
//!     Err(RequestError::RateLimited { retry_after, .. }) => {
//!         println!("Throttled, retry after {retry_after:?}s");
//!     }
//!     Err(e) => println!("Rejected: {e}"),
//! }
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::throttle::Capacity;

/// Error returned when the transport could not complete an exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No response within the receive timeout.
    #[error("Request timed out after {timeout:?}")]
    Timeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The connection could not be established or was lost.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the failure.
        message: String,
    },

    /// Any other failure reported by the HTTP library.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Error returned when the API answers with a non-2xx status.
///
/// The message field contains JSON with whichever of `errors`, `error`,
/// `error_description` and `error_reference` were present, so it can be
/// logged as-is.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// Serialized error message in JSON format.
    pub message: String,
    /// Reference ID for error reporting (from X-Request-Id header).
    pub error_reference: Option<String>,
    /// The raw decoded response body.
    pub body: serde_json::Value,
}

/// Error returned when a request fails local validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidHttpRequestError {
    /// A request body was provided without specifying the body type.
    #[error("Cannot set a body without also setting body_type.")]
    MissingBodyType,

    /// A POST or PUT request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// The GraphQL cost estimate is unusable.
    #[error("Invalid estimated query cost {cost}.")]
    InvalidCost {
        /// The rejected estimate.
        cost: f64,
    },
}

/// Unified error type for a single API call.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The server could not be reached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server rejected the request.
    #[error(transparent)]
    Http(#[from] HttpResponseError),

    /// The server reported the rate limit as exhausted.
    #[error("Rate limited by Shopify (status {code}); retry after {retry_after:?}s")]
    RateLimited {
        /// The HTTP status code (429 for REST, usually 200 for GraphQL).
        code: u16,
        /// Seconds to wait, from `Retry-After` when present.
        retry_after: Option<f64>,
        /// Telemetry reported alongside the rejection.
        capacity: Option<Capacity>,
    },

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// The REST path is empty after normalization.
    #[error("Invalid REST API path: '{path}'")]
    InvalidPath {
        /// The path that was provided.
        path: String,
    },

    /// A list response did not contain the expected collection.
    #[error("Response body has no array under key '{key}'")]
    MissingCollection {
        /// The key that was expected.
        key: String,
    },
}

impl RequestError {
    /// Returns `true` if the server was never reached, so a retry by the
    /// caller cannot cause a duplicate write.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns the HTTP status code, if the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => Some(e.code),
            Self::RateLimited { code, .. } => Some(*code),
            _ => None,
        }
    }
}
