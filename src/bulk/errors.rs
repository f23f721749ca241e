//! Error types for bulk operations.
//!
//! Each controller operation has its own error type, so a caller can tell
//! "the server refused the job" ([`SubmitError::UserErrors`]) apart from
//! "the server could not be reached" ([`SubmitError::Request`]) without
//! inspecting strings.

use thiserror::Error;

use crate::bulk::BulkOperationStatus;
use crate::clients::{RequestError, TransportError};

/// Error returned by [`submit`](crate::bulk::BulkOperationController::submit).
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The mutation request itself failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Shopify accepted the request but refused to start the operation.
    #[error("Bulk operation was not started: {}", .messages.join("; "))]
    UserErrors {
        /// The `userErrors[].message` values.
        messages: Vec<String>,
    },

    /// The response did not contain an operation id.
    #[error("Unexpected bulkOperationRunQuery response: {reason}")]
    MalformedResponse {
        /// What was missing.
        reason: String,
    },
}

/// Error returned by [`cancel`](crate::bulk::BulkOperationController::cancel).
#[derive(Debug, Error)]
pub enum CancelError {
    /// The mutation request itself failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Shopify refused to cancel the operation.
    #[error("Bulk operation was not cancelled: {}", .messages.join("; "))]
    UserErrors {
        /// The `userErrors[].message` values.
        messages: Vec<String>,
    },

    /// The response did not contain an operation status.
    #[error("Unexpected bulkOperationCancel response: {reason}")]
    MalformedResponse {
        /// What was missing.
        reason: String,
    },
}

/// Error returned by [`status`](crate::bulk::BulkOperationController::status).
#[derive(Debug, Error)]
pub enum StatusError {
    /// The status query failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// No bulk operation has been run for this app and shop.
    #[error("No current bulk operation")]
    NoCurrentOperation,

    /// The operation could not be decoded.
    #[error("Unexpected currentBulkOperation response: {reason}")]
    MalformedResponse {
        /// Decoding failure.
        reason: String,
    },
}

/// Error returned by [`poll`](crate::bulk::BulkOperationController::poll).
#[derive(Debug, Error)]
pub enum PollError {
    /// A status request failed. Polling stops at the first failure.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// The operation did not finish within the policy's attempts.
    #[error("Bulk operation {} did not finish after {attempts} polls", .job_id.as_deref().unwrap_or("<not visible>"))]
    Timeout {
        /// Id of the last operation observed, if any was.
        job_id: Option<String>,
        /// Number of status requests made.
        attempts: u32,
    },

    /// Shopify reported the operation as failed.
    #[error("Bulk operation {job_id} failed with error code {}", .error_code.as_deref().unwrap_or("<none>"))]
    Failed {
        /// Id of the failed operation.
        job_id: String,
        /// The reported `errorCode`.
        error_code: Option<String>,
        /// Location of partial results, if any were written.
        partial_data_url: Option<String>,
    },

    /// The operation was cancelled or expired before completing.
    #[error("Bulk operation {job_id} ended with status {status}")]
    Ended {
        /// Id of the operation.
        job_id: String,
        /// `CANCELED` or `EXPIRED`.
        status: BulkOperationStatus,
    },

    /// A status response could not be decoded.
    #[error("Unexpected currentBulkOperation response: {reason}")]
    MalformedResponse {
        /// Decoding failure.
        reason: String,
    },
}

/// Error returned while fetching or decoding a JSONL result payload.
#[derive(Debug, Error)]
pub enum ResultStreamError {
    /// The payload could not be downloaded.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The storage host answered with a non-2xx status.
    #[error("Result download failed with status {status}")]
    Http {
        /// The HTTP status code.
        status: u16,
    },

    /// A line is not a valid record.
    #[error("Result line {line} is not a valid record: {source}")]
    Parse {
        /// 1-based line number in the payload.
        line: usize,
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },
}

/// Error returned by [`run`](crate::bulk::BulkOperationController::run).
#[derive(Debug, Error)]
pub enum BulkError {
    /// Submitting failed.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Waiting for completion failed.
    #[error(transparent)]
    Poll(#[from] PollError),

    /// Reading the results failed.
    #[error(transparent)]
    Results(#[from] ResultStreamError),
}
