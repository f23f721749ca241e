//! Bulk operation data types.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Server-side state of a bulk operation.
///
/// Values Shopify adds in the future deserialize as [`Unknown`](Self::Unknown)
/// and are polled like a running operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkOperationStatus {
    /// Accepted, not started yet.
    Created,
    /// In progress.
    Running,
    /// Finished; results are available at the operation's `url`.
    Completed,
    /// Finished with an error; see `error_code`.
    Failed,
    /// Cancellation requested, not yet effective.
    Canceling,
    /// Cancelled.
    Canceled,
    /// Results are no longer available.
    Expired,
    /// Any status this library does not know about.
    #[serde(other)]
    Unknown,
}

impl BulkOperationStatus {
    /// Returns `true` if the operation will not change state again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Canceled | Self::Expired
        )
    }
}

impl fmt::Display for BulkOperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Canceling => "CANCELING",
            Self::Canceled => "CANCELED",
            Self::Expired => "EXPIRED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// A bulk operation as reported by `currentBulkOperation`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
    /// Global id, e.g. `gid://shopify/BulkOperation/720918`.
    pub id: String,
    /// Current state.
    pub status: BulkOperationStatus,
    /// Reason for a `FAILED` status, e.g. `ACCESS_DENIED` or `TIMEOUT`.
    #[serde(default)]
    pub error_code: Option<String>,
    /// When the operation was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the operation reached a terminal state.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of objects processed so far.
    #[serde(default, deserialize_with = "count_from_string")]
    pub object_count: Option<u64>,
    /// Size of the result file in bytes.
    #[serde(default, deserialize_with = "count_from_string")]
    pub file_size: Option<u64>,
    /// Pre-signed location of the JSONL results. `None` if there were no rows.
    #[serde(default)]
    pub url: Option<String>,
    /// Pre-signed location of whatever was written before a failure.
    #[serde(default)]
    pub partial_data_url: Option<String>,
}

// UnsignedInt64 arrives as a JSON string.
fn count_from_string<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Text(String),
        Number(u64),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(text)) => text
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// How [`poll`](crate::bulk::BulkOperationController::poll) waits for an
/// operation to finish.
///
/// The total wait is bounded by `interval * (max_attempts - 1)` plus the
/// time spent on the status requests themselves.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use shopify_runtime::bulk::PollPolicy;
///
/// // Check every 30 seconds for up to an hour, then give up and cancel.
/// let policy = PollPolicy::new(Duration::from_secs(30), 120, true);
/// assert_eq!(policy.max_attempts(), 120);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_attempts: u32,
    auto_cancel: bool,
}

impl PollPolicy {
    /// Creates a policy.
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is zero. A policy that never looks at the
    /// operation is a programming error.
    #[must_use]
    pub fn new(interval: Duration, max_attempts: u32, auto_cancel: bool) -> Self {
        assert!(max_attempts > 0, "PollPolicy requires at least one attempt");
        Self {
            interval,
            max_attempts,
            auto_cancel,
        }
    }

    /// Time between two status requests.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of status requests before giving up.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether an operation that outlives the policy is cancelled.
    #[must_use]
    pub const fn auto_cancel(&self) -> bool {
        self.auto_cancel
    }
}

impl Default for PollPolicy {
    /// Every 10 seconds for up to an hour, cancelling on timeout.
    fn default() -> Self {
        Self::new(Duration::from_secs(10), 360, true)
    }
}
