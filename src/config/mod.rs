//! Configuration types for the runtime.
//!
//! # Overview
//!
//! - [`ClientConfig`]: API version, host override, user agent and timeouts
//! - [`ClientConfigBuilder`]: builder for [`ClientConfig`]
//! - [`ThrottleSettings`]: tuning for the per-credential throttle gate
//! - [`AccessToken`], [`ShopDomain`], [`HostUrl`], [`ApiVersion`]: validated newtypes
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use shopify_runtime::{ApiVersion, ClientConfig, ThrottleSettings};
//!
//! let config = ClientConfig::builder()
//!     .api_version(ApiVersion::V2025_07)
//!     .request_timeout(Duration::from_secs(10))
//!     .throttle(ThrottleSettings::default().with_low_watermark(4.0).unwrap())
//!     .build();
//!
//! assert_eq!(config.api_version(), &ApiVersion::V2025_07);
//! ```

mod newtypes;
mod version;

pub use newtypes::{AccessToken, HostUrl, ShopDomain};
pub use version::ApiVersion;

use std::time::Duration;

use crate::error::ConfigError;

/// Default receive timeout for a single transport call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs for [`ThrottleGate`](crate::throttle::ThrottleGate).
///
/// # Defaults
///
/// - `low_watermark`: 2 REST calls are kept in reserve
/// - `rest_leak_rate`: 2 calls per second (standard REST bucket)
/// - `default_query_cost`: 10 points when a GraphQL caller gives no estimate
/// - `fallback_restore_rate`: 50 points per second if the server reports none
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThrottleSettings {
    low_watermark: f64,
    rest_leak_rate: f64,
    default_query_cost: f64,
    fallback_restore_rate: f64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            low_watermark: 2.0,
            rest_leak_rate: 2.0,
            default_query_cost: 10.0,
            fallback_restore_rate: 50.0,
        }
    }
}

impl ThrottleSettings {
    /// Number of REST calls held back so concurrent callers racing on stale
    /// telemetry do not exhaust the bucket.
    #[must_use]
    pub const fn low_watermark(&self) -> f64 {
        self.low_watermark
    }

    /// REST bucket replenishment, in calls per second.
    #[must_use]
    pub const fn rest_leak_rate(&self) -> f64 {
        self.rest_leak_rate
    }

    /// Cost assumed for GraphQL requests without an explicit estimate.
    #[must_use]
    pub const fn default_query_cost(&self) -> f64 {
        self.default_query_cost
    }

    /// Restore rate used when GraphQL telemetry reports none (or zero).
    #[must_use]
    pub const fn fallback_restore_rate(&self) -> f64 {
        self.fallback_restore_rate
    }

    /// Sets the REST low watermark.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThrottleSetting`] if the value is negative
    /// or not finite.
    pub fn with_low_watermark(mut self, value: f64) -> Result<Self, ConfigError> {
        self.low_watermark = non_negative("low_watermark", value)?;
        Ok(self)
    }

    /// Sets the REST leak rate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThrottleSetting`] unless the value is
    /// positive and finite.
    pub fn with_rest_leak_rate(mut self, value: f64) -> Result<Self, ConfigError> {
        self.rest_leak_rate = positive("rest_leak_rate", value)?;
        Ok(self)
    }

    /// Sets the default GraphQL query cost estimate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThrottleSetting`] if the value is negative
    /// or not finite.
    pub fn with_default_query_cost(mut self, value: f64) -> Result<Self, ConfigError> {
        self.default_query_cost = non_negative("default_query_cost", value)?;
        Ok(self)
    }

    /// Sets the fallback GraphQL restore rate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidThrottleSetting`] unless the value is
    /// positive and finite.
    pub fn with_fallback_restore_rate(mut self, value: f64) -> Result<Self, ConfigError> {
        self.fallback_restore_rate = positive("fallback_restore_rate", value)?;
        Ok(self)
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidThrottleSetting {
            field,
            reason: format!("expected a finite value >= 0, got {value}"),
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidThrottleSetting {
            field,
            reason: format!("must be greater than zero, got {value}"),
        })
    }
}

/// Runtime configuration shared by every credential.
///
/// `ClientConfig` is `Clone`, `Send` and `Sync`; build it once and hand it to
/// [`RequestExecutor`](crate::clients::RequestExecutor).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    api_version: ApiVersion,
    api_host: Option<HostUrl>,
    user_agent_prefix: Option<String>,
    request_timeout: Duration,
    throttle: ThrottleSettings,
}

impl ClientConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the API version.
    #[must_use]
    pub const fn api_version(&self) -> &ApiVersion {
        &self.api_version
    }

    /// Returns the host override, if configured.
    #[must_use]
    pub const fn api_host(&self) -> Option<&HostUrl> {
        self.api_host.as_ref()
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the per-call receive timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the throttle settings.
    #[must_use]
    pub const fn throttle(&self) -> &ThrottleSettings {
        &self.throttle
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfigBuilder::new().build()
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for [`ClientConfig`]. Every field is optional.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    api_version: Option<ApiVersion>,
    api_host: Option<HostUrl>,
    user_agent_prefix: Option<String>,
    request_timeout: Option<Duration>,
    throttle: Option<ThrottleSettings>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API version.
    #[must_use]
    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Routes requests to `host` instead of `https://{shop}`.
    #[must_use]
    pub fn api_host(mut self, host: HostUrl) -> Self {
        self.api_host = Some(host);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the receive timeout for each transport call.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the throttle settings.
    #[must_use]
    pub const fn throttle(mut self, settings: ThrottleSettings) -> Self {
        self.throttle = Some(settings);
        self
    }

    /// Builds the [`ClientConfig`].
    #[must_use]
    pub fn build(self) -> ClientConfig {
        ClientConfig {
            api_version: self.api_version.unwrap_or_else(ApiVersion::latest),
            api_host: self.api_host,
            user_agent_prefix: self.user_agent_prefix,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            throttle: self.throttle.unwrap_or_default(),
        }
    }
}
