//! Validated newtype wrappers for configuration and credential values.
//!
//! Each wrapper validates its contents on construction, so a value that
//! reaches the request path is known to be well formed.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Shopify Admin API access token.
///
/// The `Debug` implementation masks the token so credentials can be logged
/// without leaking secrets.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::AccessToken;
///
/// let token = AccessToken::new("shpat_123").unwrap();
/// assert_eq!(token.as_ref(), "shpat_123");
/// assert_eq!(format!("{:?}", token), "AccessToken(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a new access token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyAccessToken`] if the token is empty.
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConfigError::EmptyAccessToken);
        }
        Ok(Self(token))
    }
}

impl AsRef<str> for AccessToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(*****)")
    }
}

/// A validated Shopify shop domain.
///
/// Short names are normalized to the full `shop.myshopify.com` form, which is
/// also the form used in throttle keys and request URLs.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::ShopDomain;
///
/// let domain = ShopDomain::new("My-Store").unwrap();
/// assert_eq!(domain.as_ref(), "my-store.myshopify.com");
/// assert_eq!(domain.shop_name(), "my-store");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    const SUFFIX: &'static str = ".myshopify.com";

    /// Creates a new validated shop domain.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidShopDomain`] unless the input is a shop
    /// name or a `*.myshopify.com` domain.
    pub fn new(domain: impl Into<String>) -> Result<Self, ConfigError> {
        let mut domain = domain.into().trim().to_lowercase();
        if !domain.ends_with(Self::SUFFIX) {
            if domain.contains('.') {
                return Err(ConfigError::InvalidShopDomain { domain });
            }
            domain.push_str(Self::SUFFIX);
        }

        let shop = Self(domain);
        if shop.shop_name().is_empty()
            || shop.shop_name().starts_with('-')
            || shop.shop_name().ends_with('-')
            || !shop
                .shop_name()
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(ConfigError::InvalidShopDomain { domain: shop.0 });
        }
        Ok(shop)
    }

    /// Returns the shop name portion of the domain.
    #[must_use]
    pub fn shop_name(&self) -> &str {
        self.0.strip_suffix(Self::SUFFIX).unwrap_or(&self.0)
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShopDomain> for String {
    fn from(domain: ShopDomain) -> Self {
        domain.0
    }
}

/// A validated base URL that replaces `https://{shop}` for API requests.
///
/// Used when requests are routed through a proxy, and in tests to point the
/// runtime at a local mock server. Scheme, host and port are kept; any
/// trailing slash is dropped.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::HostUrl;
///
/// let url = HostUrl::new("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(url.scheme(), "http");
/// assert_eq!(url.host_name(), "127.0.0.1");
/// assert_eq!(url.as_ref(), "http://127.0.0.1:8080");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostUrl {
    url: String,
    scheme_end: usize,
    host_end: usize,
}

impl HostUrl {
    /// Creates a new validated host URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHostUrl`] if the URL has no scheme or
    /// no host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        let invalid = || ConfigError::InvalidHostUrl { url: url.clone() };

        let scheme_end = url.find("://").ok_or_else(invalid)?;
        let scheme = &url[..scheme_end];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let host_start = scheme_end + 3;
        let host_end = url[host_start..]
            .find([':', '/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);
        if host_end <= host_start {
            return Err(invalid());
        }

        Ok(Self {
            url,
            scheme_end,
            host_end,
        })
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host name portion of the URL.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.url[self.scheme_end + 3..self.host_end]
    }
}

impl AsRef<str> for HostUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}
