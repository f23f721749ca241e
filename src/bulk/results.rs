//! JSONL result download.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::bulk::ResultStreamError;
use crate::clients::{Transport, TransportRequest};

/// Default receive timeout for a result download.
///
/// Result files can be much larger than an API response, so this is longer
/// than [`DEFAULT_REQUEST_TIMEOUT`](crate::config::DEFAULT_REQUEST_TIMEOUT).
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Downloads and decodes the newline-delimited JSON written by a bulk
/// operation.
///
/// The result URL is pre-signed, so the request carries no access token and
/// does not go through the throttle gate.
///
/// # Example
///
/// ```rust,ignore
/// let reader = ResultStreamReader::new(executor.transport().clone());
/// let products = reader.read(url.as_deref()).await?;
/// ```
#[derive(Clone, Debug)]
pub struct ResultStreamReader {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl ResultStreamReader {
    /// Creates a reader that downloads through `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    /// Sets the receive timeout for downloads.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetches `url` and decodes every non-empty line as JSON, in order.
    ///
    /// `None` means the operation produced no rows and yields an empty vec
    /// without any request.
    ///
    /// # Errors
    ///
    /// - [`ResultStreamError::Transport`] if the download did not complete
    /// - [`ResultStreamError::Http`] for a non-2xx status
    /// - [`ResultStreamError::Parse`] for the first malformed line; no
    ///   records are returned in that case
    pub async fn read(
        &self,
        url: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, ResultStreamError> {
        self.read_as(url).await
    }

    /// Like [`read`](Self::read), decoding each line as `T`.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read); a line that is valid JSON but does not
    /// match `T` is a [`ResultStreamError::Parse`].
    pub async fn read_as<T: DeserializeOwned>(
        &self,
        url: Option<&str>,
    ) -> Result<Vec<T>, ResultStreamError> {
        let Some(url) = url else {
            return Ok(Vec::new());
        };

        let response = self
            .transport
            .send(TransportRequest::get(url, self.timeout))
            .await?;

        if !(200..300).contains(&response.status) {
            return Err(ResultStreamError::Http {
                status: response.status,
            });
        }

        let records = parse_lines(&response.body)?;
        tracing::debug!(
            records = records.len(),
            bytes = response.body.len(),
            "Decoded bulk operation results"
        );
        Ok(records)
    }
}

/// Decodes a JSONL payload. Blank lines are skipped; line numbers in errors
/// are 1-based and count blank lines.
///
/// # Errors
///
/// Returns [`ResultStreamError::Parse`] for the first line that does not
/// decode as `T`.
pub fn parse_lines<T: DeserializeOwned>(payload: &str) -> Result<Vec<T>, ResultStreamError> {
    payload
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| ResultStreamError::Parse {
                line: index + 1,
                source,
            })
        })
        .collect()
}
