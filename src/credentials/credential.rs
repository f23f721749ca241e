use crate::config::{AccessToken, ShopDomain};
use crate::error::ConfigError;

/// An immutable API credential.
///
/// Two credentials for the same app and shop share throttle state even if
/// their tokens differ, because the server accounts usage per app install.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::credentials::Credential;
/// use shopify_runtime::{AccessToken, ShopDomain};
///
/// let credential = Credential::new(
///     "exporter",
///     ShopDomain::new("my-store").unwrap(),
///     AccessToken::new("shpat_123").unwrap(),
/// )
/// .unwrap();
///
/// assert_eq!(credential.shop().as_ref(), "my-store.myshopify.com");
/// assert!(!format!("{credential:?}").contains("shpat_123"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    app_name: String,
    shop: ShopDomain,
    access_token: AccessToken,
}

impl Credential {
    /// Creates a credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyAppName`] if `app_name` is blank.
    pub fn new(
        app_name: impl Into<String>,
        shop: ShopDomain,
        access_token: AccessToken,
    ) -> Result<Self, ConfigError> {
        let app_name = app_name.into();
        if app_name.trim().is_empty() {
            return Err(ConfigError::EmptyAppName);
        }
        Ok(Self {
            app_name,
            shop,
            access_token,
        })
    }

    /// Returns the application name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the shop domain.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    /// Returns the access token.
    #[must_use]
    pub const fn access_token(&self) -> &AccessToken {
        &self.access_token
    }
}

// Verify Credential is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Credential>();
};
