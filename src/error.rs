//! Errors raised while building configuration and credentials.
//!
//! All configuration constructors return `Result<T, ConfigError>` so that
//! invalid values are rejected before any request is issued.
//!
//! # Example
//!
//! ```rust
//! use shopify_runtime::{AccessToken, ConfigError};
//!
//! let result = AccessToken::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyAccessToken)));
//! ```

use thiserror::Error;

/// Errors that can occur while building configuration or credentials.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Access token cannot be empty.
    #[error("Access token is empty; every request needs an Admin API token")]
    EmptyAccessToken,

    /// Application name cannot be empty.
    #[error("App name is empty; credentials and throttle state are keyed by app and shop")]
    EmptyAppName,

    /// Shop domain is invalid.
    #[error("Invalid shop domain '{domain}': expected 'shop-name' or 'shop-name.myshopify.com'")]
    InvalidShopDomain {
        /// The invalid domain that was provided.
        domain: String,
    },

    /// API version is invalid.
    #[error("Invalid API version '{version}': expected a quarterly 'YYYY-MM' release or 'unstable'")]
    InvalidApiVersion {
        /// The invalid version string that was provided.
        version: String,
    },

    /// Host URL is invalid.
    #[error("Invalid host URL '{url}': expected scheme and host, e.g. 'http://127.0.0.1:8080'")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A throttle setting is out of range.
    #[error("Invalid throttle setting '{field}': {reason}")]
    InvalidThrottleSetting {
        /// The name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
