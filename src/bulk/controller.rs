//! Bulk operation lifecycle: submit, poll, cancel.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::bulk::queries;
use crate::bulk::{
    BulkError, BulkOperation, BulkOperationStatus, CancelError, PollError, PollPolicy,
    ResultStreamReader, StatusError, SubmitError,
};
use crate::clients::{HttpResponse, RequestExecutor};
use crate::credentials::Credential;

/// Drives bulk query operations through a [`RequestExecutor`].
///
/// Shopify allows one bulk query operation per app and shop at a time and
/// only exposes the most recent one through `currentBulkOperation`. The
/// controller relies on that: [`poll`](Self::poll) watches "the current
/// operation" for a credential rather than a specific id. Running two
/// operations for the same credential concurrently is not supported.
///
/// Every request, including status polls, goes through the executor and is
/// throttled like any other GraphQL call.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use shopify_runtime::bulk::{BulkOperationController, PollPolicy};
/// use shopify_runtime::clients::RequestExecutor;
///
/// let executor = Arc::new(RequestExecutor::new(ClientConfig::default()));
/// let controller = BulkOperationController::new(executor);
///
/// let products = controller
///     .run(&credential, "{ products { edges { node { id title } } } }", &PollPolicy::default())
///     .await?;
/// ```
#[derive(Clone, Debug)]
pub struct BulkOperationController {
    executor: Arc<RequestExecutor>,
    reader: ResultStreamReader,
}

// Verify BulkOperationController is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BulkOperationController>();
};

impl BulkOperationController {
    /// Creates a controller; results are downloaded through the executor's
    /// transport.
    #[must_use]
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        let reader = ResultStreamReader::new(Arc::clone(executor.transport()));
        Self { executor, reader }
    }

    /// Replaces the result reader, e.g. to change the download timeout.
    #[must_use]
    pub fn with_reader(mut self, reader: ResultStreamReader) -> Self {
        self.reader = reader;
        self
    }

    /// Returns the executor.
    #[must_use]
    pub const fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// Returns the result reader.
    #[must_use]
    pub const fn reader(&self) -> &ResultStreamReader {
        &self.reader
    }

    /// Starts a bulk query operation for `query` and returns its id.
    ///
    /// Never retried: a second submit while the first is running would be
    /// refused by Shopify anyway.
    ///
    /// # Errors
    ///
    /// - [`SubmitError::Request`] if the mutation request failed
    /// - [`SubmitError::UserErrors`] if Shopify refused the operation
    /// - [`SubmitError::MalformedResponse`] if no operation id came back
    pub async fn submit(
        &self,
        credential: &Credential,
        query: &str,
    ) -> Result<String, SubmitError> {
        let response = self
            .executor
            .graphql(credential, queries::RUN_QUERY, Some(json!({ "query": query })))
            .await?;

        let payload = mutation_payload(&response, "bulkOperationRunQuery")
            .ok_or_else(|| SubmitError::MalformedResponse {
                reason: missing_payload_reason(&response, "bulkOperationRunQuery"),
            })?;

        let messages = user_error_messages(payload);
        if !messages.is_empty() {
            tracing::warn!(
                app = credential.app_name(),
                shop = %credential.shop(),
                errors = ?messages,
                "Bulk operation refused"
            );
            return Err(SubmitError::UserErrors { messages });
        }

        let job_id = payload
            .pointer("/bulkOperation/id")
            .and_then(Value::as_str)
            .ok_or_else(|| SubmitError::MalformedResponse {
                reason: "bulkOperation.id is missing".to_string(),
            })?;

        tracing::info!(
            app = credential.app_name(),
            shop = %credential.shop(),
            job_id,
            "Bulk operation submitted"
        );
        Ok(job_id.to_string())
    }

    /// Returns the most recent bulk operation for `credential`.
    ///
    /// # Errors
    ///
    /// - [`StatusError::Request`] if the query failed
    /// - [`StatusError::NoCurrentOperation`] if there has never been one
    /// - [`StatusError::MalformedResponse`] if it could not be decoded
    pub async fn status(&self, credential: &Credential) -> Result<BulkOperation, StatusError> {
        let response = self
            .executor
            .graphql(credential, queries::CURRENT_OPERATION, None)
            .await?;

        match response.body.pointer("/data/currentBulkOperation") {
            None => Err(StatusError::MalformedResponse {
                reason: missing_payload_reason(&response, "currentBulkOperation"),
            }),
            Some(Value::Null) => Err(StatusError::NoCurrentOperation),
            Some(operation) => BulkOperation::deserialize(operation).map_err(|e| {
                StatusError::MalformedResponse {
                    reason: e.to_string(),
                }
            }),
        }
    }

    /// Polls the current operation until it finishes or `policy` runs out.
    ///
    /// Returns the result URL on completion; `None` means the operation
    /// matched no rows. Sleeps `policy.interval()` between attempts but not
    /// after the last one. An operation that is not visible yet is treated
    /// like a running one.
    ///
    /// When the attempts run out and `policy.auto_cancel()` is set, one
    /// cancellation is requested for the last observed operation. Its outcome
    /// is only logged.
    ///
    /// Dropping the returned future stops polling at the next suspension.
    ///
    /// # Errors
    ///
    /// - [`PollError::Failed`] as soon as the operation reports `FAILED`
    /// - [`PollError::Ended`] if it was cancelled or expired
    /// - [`PollError::Timeout`] when the attempts are exhausted
    /// - [`PollError::Request`] / [`PollError::MalformedResponse`] on the
    ///   first status request that fails
    pub async fn poll(
        &self,
        credential: &Credential,
        policy: &PollPolicy,
    ) -> Result<Option<String>, PollError> {
        self.poll_job(credential, policy, None).await
    }

    // With `submitted` set, any other operation is stale and treated as not
    // visible yet, and the submitted id is the one cancelled on timeout.
    async fn poll_job(
        &self,
        credential: &Credential,
        policy: &PollPolicy,
        submitted: Option<&str>,
    ) -> Result<Option<String>, PollError> {
        let mut job_id: Option<String> = submitted.map(String::from);

        for attempt in 1..=policy.max_attempts() {
            match self.status(credential).await {
                Ok(operation) if submitted.is_some_and(|id| id != operation.id) => {
                    tracing::debug!(
                        app = credential.app_name(),
                        shop = %credential.shop(),
                        job_id = ?submitted,
                        current_id = %operation.id,
                        attempt,
                        "Current bulk operation is not the submitted one yet"
                    );
                }
                Ok(operation) => {
                    tracing::debug!(
                        app = credential.app_name(),
                        shop = %credential.shop(),
                        job_id = %operation.id,
                        status = %operation.status,
                        object_count = ?operation.object_count,
                        attempt,
                        "Polled bulk operation"
                    );

                    match operation.status {
                        BulkOperationStatus::Completed => {
                            tracing::info!(
                                app = credential.app_name(),
                                shop = %credential.shop(),
                                job_id = %operation.id,
                                object_count = ?operation.object_count,
                                attempt,
                                "Bulk operation completed"
                            );
                            return Ok(operation.url);
                        }
                        BulkOperationStatus::Failed => {
                            return Err(PollError::Failed {
                                job_id: operation.id,
                                error_code: operation.error_code,
                                partial_data_url: operation.partial_data_url,
                            });
                        }
                        status @ (BulkOperationStatus::Canceled | BulkOperationStatus::Expired) => {
                            return Err(PollError::Ended {
                                job_id: operation.id,
                                status,
                            });
                        }
                        _ => job_id = Some(operation.id),
                    }
                }
                Err(StatusError::NoCurrentOperation) => {
                    tracing::debug!(
                        app = credential.app_name(),
                        shop = %credential.shop(),
                        attempt,
                        "Bulk operation not visible yet"
                    );
                }
                Err(StatusError::Request(error)) => return Err(PollError::Request(error)),
                Err(StatusError::MalformedResponse { reason }) => {
                    return Err(PollError::MalformedResponse { reason })
                }
            }

            if attempt < policy.max_attempts() {
                tokio::time::sleep(policy.interval()).await;
            }
        }

        tracing::warn!(
            app = credential.app_name(),
            shop = %credential.shop(),
            job_id = ?job_id,
            attempts = policy.max_attempts(),
            "Bulk operation did not finish in time"
        );

        if policy.auto_cancel() {
            if let Some(id) = &job_id {
                match self.cancel(credential, id).await {
                    Ok(status) => tracing::info!(
                        app = credential.app_name(),
                        shop = %credential.shop(),
                        job_id = %id,
                        status = %status,
                        "Cancellation requested for timed out bulk operation"
                    ),
                    Err(error) => tracing::warn!(
                        app = credential.app_name(),
                        shop = %credential.shop(),
                        job_id = %id,
                        error = %error,
                        "Could not cancel timed out bulk operation"
                    ),
                }
            }
        }

        Err(PollError::Timeout {
            job_id,
            attempts: policy.max_attempts(),
        })
    }

    /// Requests cancellation of `job_id` and returns the status Shopify
    /// reports afterwards, usually `CANCELING`.
    ///
    /// Cancelling a job that is already cancelled or being cancelled is not
    /// an error. Shopify answers that with `userErrors`; in that case the
    /// job's current status is looked up and `CANCELED` / `CANCELING` is
    /// returned, so repeated calls report the same status.
    ///
    /// # Errors
    ///
    /// - [`CancelError::Request`] if the mutation request failed
    /// - [`CancelError::UserErrors`] if Shopify refused to cancel a job that
    ///   is not being cancelled
    /// - [`CancelError::MalformedResponse`] if no status came back
    pub async fn cancel(
        &self,
        credential: &Credential,
        job_id: &str,
    ) -> Result<BulkOperationStatus, CancelError> {
        let response = self
            .executor
            .graphql(credential, queries::CANCEL, Some(json!({ "id": job_id })))
            .await?;

        let payload = mutation_payload(&response, "bulkOperationCancel").ok_or_else(|| {
            CancelError::MalformedResponse {
                reason: missing_payload_reason(&response, "bulkOperationCancel"),
            }
        })?;

        let messages = user_error_messages(payload);
        if !messages.is_empty() {
            if let Some(status) = self.cancellation_state(credential, job_id, payload).await {
                tracing::debug!(
                    app = credential.app_name(),
                    shop = %credential.shop(),
                    job_id,
                    status = %status,
                    errors = ?messages,
                    "Bulk operation already cancelled"
                );
                return Ok(status);
            }
            return Err(CancelError::UserErrors { messages });
        }

        payload
            .pointer("/bulkOperation/status")
            .ok_or_else(|| CancelError::MalformedResponse {
                reason: "bulkOperation.status is missing".to_string(),
            })
            .and_then(|status| {
                BulkOperationStatus::deserialize(status).map_err(|e| {
                    CancelError::MalformedResponse {
                        reason: e.to_string(),
                    }
                })
            })
    }

    // Status of `job_id` if it is already cancelled or being cancelled.
    // Prefers the mutation payload and falls back to the current operation.
    async fn cancellation_state(
        &self,
        credential: &Credential,
        job_id: &str,
        payload: &Value,
    ) -> Option<BulkOperationStatus> {
        let reported = payload
            .pointer("/bulkOperation/status")
            .and_then(|status| BulkOperationStatus::deserialize(status).ok());

        let status = match reported {
            Some(status) => status,
            None => match self.status(credential).await {
                Ok(operation) if operation.id == job_id => operation.status,
                _ => return None,
            },
        };

        matches!(
            status,
            BulkOperationStatus::Canceled | BulkOperationStatus::Canceling
        )
        .then_some(status)
    }

    /// Submits `query`, waits for it under `policy` and reads every record.
    ///
    /// Polling only accepts the operation this call submitted; an older
    /// `currentBulkOperation` still being reported is treated as not visible
    /// yet. On timeout with `auto_cancel`, the submitted id is cancelled even
    /// if it never became visible.
    ///
    /// # Errors
    ///
    /// Returns [`BulkError`] wrapping whichever step failed.
    pub async fn run(
        &self,
        credential: &Credential,
        query: &str,
        policy: &PollPolicy,
    ) -> Result<Vec<Value>, BulkError> {
        let job_id = self.submit(credential, query).await?;
        let url = self.poll_job(credential, policy, Some(&job_id)).await?;
        Ok(self.reader.read(url.as_deref()).await?)
    }
}

fn mutation_payload<'a>(response: &'a HttpResponse, field: &str) -> Option<&'a Value> {
    response
        .body
        .get("data")
        .and_then(|data| data.get(field))
        .filter(|payload| !payload.is_null())
}

fn user_error_messages(payload: &Value) -> Vec<String> {
    payload
        .get("userErrors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|error| {
                    error
                        .get("message")
                        .and_then(Value::as_str)
                        .map_or_else(|| error.to_string(), String::from)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn missing_payload_reason(response: &HttpResponse, field: &str) -> String {
    response.body.get("errors").map_or_else(
        || format!("data.{field} is missing"),
        |errors| format!("data.{field} is missing; errors: {errors}"),
    )
}
