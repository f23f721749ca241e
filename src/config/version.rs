//! Admin API version selection.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Shopify Admin API version, used in the `/admin/api/{version}/` path.
///
/// Bulk operations are available on every listed version. Unknown but
/// well-formed quarterly versions parse into [`ApiVersion::Custom`].
///
/// # Example
///
/// ```rust
/// use shopify_runtime::ApiVersion;
///
/// let version: ApiVersion = "2025-07".parse().unwrap();
/// assert_eq!(version, ApiVersion::V2025_07);
/// assert_eq!(version.to_string(), "2025-07");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    /// API version 2025-01.
    V2025_01,
    /// API version 2025-04.
    V2025_04,
    /// API version 2025-07.
    V2025_07,
    /// API version 2025-10.
    V2025_10,
    /// Unstable API version.
    Unstable,
    /// A well-formed version not known to this crate.
    Custom(String),
}

impl ApiVersion {
    /// Returns the latest stable API version.
    #[must_use]
    pub const fn latest() -> Self {
        Self::V2025_10
    }

    /// Returns `true` for named stable versions.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        !matches!(self, Self::Unstable | Self::Custom(_))
    }

    const fn as_known_str(&self) -> Option<&'static str> {
        match self {
            Self::V2025_01 => Some("2025-01"),
            Self::V2025_04 => Some("2025-04"),
            Self::V2025_07 => Some("2025-07"),
            Self::V2025_10 => Some("2025-10"),
            Self::Unstable => Some("unstable"),
            Self::Custom(_) => None,
        }
    }

    // Shopify releases quarterly: YYYY-01, -04, -07, -10.
    fn is_valid_version_format(s: &str) -> bool {
        let Some((year, month)) = s.split_once('-') else {
            return false;
        };
        year.len() == 4
            && year.chars().all(|c| c.is_ascii_digit())
            && matches!(month, "01" | "04" | "07" | "10")
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::latest()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(s) => f.write_str(s),
            known => f.write_str(known.as_known_str().unwrap_or_default()),
        }
    }
}

impl FromStr for ApiVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "2025-01" => Ok(Self::V2025_01),
            "2025-04" => Ok(Self::V2025_04),
            "2025-07" => Ok(Self::V2025_07),
            "2025-10" => Ok(Self::V2025_10),
            "unstable" => Ok(Self::Unstable),
            _ if Self::is_valid_version_format(&s) => Ok(Self::Custom(s)),
            _ => Err(ConfigError::InvalidApiVersion { version: s }),
        }
    }
}
