//! Bulk query operations.
//!
//! A bulk operation runs a GraphQL query server-side over the whole shop and
//! writes the result as newline-delimited JSON to a pre-signed URL.
//!
//! # Overview
//!
//! - [`BulkOperationController`]: submit, poll, cancel and inspect operations
//! - [`PollPolicy`]: interval, attempt budget and auto-cancel for polling
//! - [`ResultStreamReader`]: downloads and decodes the JSONL results
//! - [`BulkOperation`] / [`BulkOperationStatus`]: the server-side state
//!
//! # Lifecycle
//!
//! ```text
//! submit ──► poll ──┬──► COMPLETED ──► read results
//!                   ├──► FAILED / CANCELED / EXPIRED
//!                   └──► attempts exhausted ──► cancel (if auto_cancel)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use shopify_runtime::bulk::{BulkOperationController, PollPolicy};
//!
//! let controller = BulkOperationController::new(executor);
//!
//! controller.submit(&credential, "{ orders { edges { node { id } } } }").await?;
//! let policy = PollPolicy::new(Duration::from_secs(5), 120, true);
//! let url = controller.poll(&credential, &policy).await?;
//! let orders = controller.reader().read(url.as_deref()).await?;
//! ```

mod controller;
mod errors;
mod queries;
mod results;
mod types;

pub use controller::BulkOperationController;
pub use errors::{BulkError, CancelError, PollError, ResultStreamError, StatusError, SubmitError};
pub use results::{parse_lines, ResultStreamReader, DEFAULT_DOWNLOAD_TIMEOUT};
pub use types::{BulkOperation, BulkOperationStatus, PollPolicy};
