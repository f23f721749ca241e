//! Integration tests for the bulk operation controller.
//!
//! A scripted transport replays a fixed sequence of responses and records
//! every request, so polling cadence and cancellation can be checked exactly
//! on a paused clock.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use shopify_runtime::bulk::{
    BulkError, BulkOperationController, BulkOperationStatus, CancelError, PollError, PollPolicy,
    StatusError, SubmitError,
};
use shopify_runtime::clients::{
    RequestError, RequestExecutor, Transport, TransportError, TransportRequest, TransportResponse,
};
use shopify_runtime::credentials::Credential;
use shopify_runtime::{AccessToken, ClientConfig, ShopDomain};

const JOB_ID: &str = "gid://shopify/BulkOperation/720";
const RESULT_URL: &str = "https://storage.example.com/bulk/720.jsonl?signature=abc";

// ============================================================================
// Scripted transport
// ============================================================================

#[derive(Debug, Default)]
struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    fn with_json(bodies: Vec<Value>) -> Arc<Self> {
        let transport = Self::default();
        for body in bodies {
            transport.push_raw(200, body.to_string());
        }
        Arc::new(transport)
    }

    fn push_raw(&self, status: u16, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(TransportResponse {
                status,
                headers: std::collections::HashMap::new(),
                body: body.into(),
            });
    }

    fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The GraphQL documents sent, in order.
    fn graphql_queries(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.body.as_deref())
            .filter_map(|body| serde_json::from_str::<Value>(body).ok())
            .filter_map(|body| body["query"].as_str().map(String::from))
            .collect()
    }

    fn count_containing(&self, needle: &str) -> usize {
        self.graphql_queries()
            .iter()
            .filter(|q| q.contains(needle))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Connection {
                message: "script exhausted".to_string(),
            })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn create_test_credential() -> Credential {
    Credential::new(
        "exporter",
        ShopDomain::new("bulk-shop").unwrap(),
        AccessToken::new("shpat_bulk").unwrap(),
    )
    .unwrap()
}

fn create_controller(transport: &Arc<ScriptedTransport>) -> BulkOperationController {
    let executor = RequestExecutor::with_transport(
        ClientConfig::default(),
        Arc::clone(transport) as Arc<dyn Transport>,
    );
    BulkOperationController::new(Arc::new(executor))
}

fn status_body(status: &str, url: Option<&str>) -> Value {
    status_body_for(JOB_ID, status, url)
}

fn status_body_for(id: &str, status: &str, url: Option<&str>) -> Value {
    json!({
        "data": {
            "currentBulkOperation": {
                "id": id,
                "status": status,
                "errorCode": null,
                "createdAt": "2025-01-15T10:00:00Z",
                "completedAt": null,
                "objectCount": "12",
                "fileSize": null,
                "url": url,
                "partialDataUrl": null
            }
        }
    })
}

fn submit_body() -> Value {
    json!({
        "data": {
            "bulkOperationRunQuery": {
                "bulkOperation": {"id": JOB_ID, "status": "CREATED"},
                "userErrors": []
            }
        }
    })
}

fn cancel_refused_body(message: &str) -> Value {
    json!({
        "data": {
            "bulkOperationCancel": {
                "bulkOperation": null,
                "userErrors": [{"field": ["id"], "message": message}]
            }
        }
    })
}

fn cancel_body(status: &str) -> Value {
    json!({
        "data": {
            "bulkOperationCancel": {
                "bulkOperation": {"id": JOB_ID, "status": status},
                "userErrors": []
            }
        }
    })
}

// ============================================================================
// Submit
// ============================================================================

#[tokio::test]
async fn test_submit_returns_job_id_and_passes_query_as_variable() {
    let transport = ScriptedTransport::with_json(vec![submit_body()]);
    let controller = create_controller(&transport);

    let query = "{ products(query: \"title:\\\"Hat\\\"\") { edges { node { id } } } }";
    let job_id = controller
        .submit(&create_test_credential(), query)
        .await
        .unwrap();

    assert_eq!(job_id, JOB_ID);
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.ends_with("/graphql.json"));

    let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
    assert!(body["query"]
        .as_str()
        .unwrap()
        .contains("bulkOperationRunQuery"));
    assert_eq!(body["variables"]["query"], query);
}

#[tokio::test]
async fn test_submit_user_errors() {
    let transport = ScriptedTransport::with_json(vec![json!({
        "data": {
            "bulkOperationRunQuery": {
                "bulkOperation": null,
                "userErrors": [
                    {"field": ["query"], "message": "A bulk query operation for this app and shop is already in progress"}
                ]
            }
        }
    })]);
    let controller = create_controller(&transport);

    let result = controller.submit(&create_test_credential(), "{ shop { id } }").await;

    match result {
        Err(SubmitError::UserErrors { messages }) => {
            assert_eq!(messages.len(), 1);
            assert!(messages[0].contains("already in progress"));
        }
        other => panic!("expected UserErrors, got {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_without_payload_is_malformed() {
    let transport = ScriptedTransport::with_json(vec![json!({
        "data": null,
        "errors": [{"message": "Access denied for bulkOperationRunQuery field."}]
    })]);
    let controller = create_controller(&transport);

    let result = controller.submit(&create_test_credential(), "{ shop { id } }").await;

    match result {
        Err(SubmitError::MalformedResponse { reason }) => {
            assert!(reason.contains("Access denied"));
        }
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_throttled_is_request_error() {
    let transport = ScriptedTransport::with_json(vec![json!({
        "errors": [{"message": "Throttled", "extensions": {"code": "THROTTLED"}}]
    })]);
    let controller = create_controller(&transport);

    let result = controller.submit(&create_test_credential(), "{ shop { id } }").await;

    assert!(matches!(
        result,
        Err(SubmitError::Request(RequestError::RateLimited { .. }))
    ));
    assert_eq!(transport.requests().len(), 1);
}

// ============================================================================
// Status
// ============================================================================

#[tokio::test]
async fn test_status_decodes_operation() {
    let transport = ScriptedTransport::with_json(vec![status_body("RUNNING", None)]);
    let controller = create_controller(&transport);

    let operation = controller.status(&create_test_credential()).await.unwrap();

    assert_eq!(operation.id, JOB_ID);
    assert_eq!(operation.status, BulkOperationStatus::Running);
    assert_eq!(operation.object_count, Some(12));
    assert!(operation.url.is_none());
}

#[tokio::test]
async fn test_status_without_operation() {
    let transport =
        ScriptedTransport::with_json(vec![json!({"data": {"currentBulkOperation": null}})]);
    let controller = create_controller(&transport);

    let result = controller.status(&create_test_credential()).await;

    assert!(matches!(result, Err(StatusError::NoCurrentOperation)));
}

// ============================================================================
// Poll
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_poll_sleeps_between_attempts_only() {
    let transport = ScriptedTransport::with_json(vec![
        status_body("RUNNING", None),
        status_body("RUNNING", None),
        status_body("COMPLETED", Some(RESULT_URL)),
    ]);
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(10), 5, true);

    let started = tokio::time::Instant::now();
    let url = controller
        .poll(&create_test_credential(), &policy)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(url.as_deref(), Some(RESULT_URL));
    assert_eq!(transport.requests().len(), 3);
    // Two sleeps, not three.
    assert!(elapsed >= Duration::from_secs(20));
    assert!(elapsed < Duration::from_secs(21));
}

#[tokio::test(start_paused = true)]
async fn test_poll_timeout_cancels_exactly_once() {
    let transport = ScriptedTransport::with_json(vec![
        status_body("RUNNING", None),
        status_body("RUNNING", None),
        cancel_body("CANCELING"),
    ]);
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(1), 2, true);

    let started = tokio::time::Instant::now();
    let result = controller.poll(&create_test_credential(), &policy).await;

    match result {
        Err(PollError::Timeout { job_id, attempts }) => {
            assert_eq!(job_id.as_deref(), Some(JOB_ID));
            assert_eq!(attempts, 2);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(transport.count_containing("currentBulkOperation"), 2);
    assert_eq!(transport.count_containing("bulkOperationCancel"), 1);

    let cancel = transport.requests().pop().unwrap();
    let body: Value = serde_json::from_str(cancel.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["variables"]["id"], JOB_ID);
}

#[tokio::test(start_paused = true)]
async fn test_poll_timeout_without_auto_cancel() {
    let transport = ScriptedTransport::with_json(vec![
        status_body("CREATED", None),
        status_body("RUNNING", None),
    ]);
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(1), 2, false);

    let result = controller.poll(&create_test_credential(), &policy).await;

    assert!(matches!(result, Err(PollError::Timeout { attempts: 2, .. })));
    assert_eq!(transport.requests().len(), 2);
    assert_eq!(transport.count_containing("bulkOperationCancel"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_timeout_without_visible_job_does_not_cancel() {
    let transport = ScriptedTransport::with_json(vec![
        json!({"data": {"currentBulkOperation": null}}),
        json!({"data": {"currentBulkOperation": null}}),
    ]);
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(1), 2, true);

    let result = controller.poll(&create_test_credential(), &policy).await;

    assert!(matches!(result, Err(PollError::Timeout { job_id: None, .. })));
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failed_reports_error_code_immediately() {
    let mut failed = status_body("FAILED", None);
    failed["data"]["currentBulkOperation"]["errorCode"] = json!("ACCESS_DENIED");
    failed["data"]["currentBulkOperation"]["partialDataUrl"] = json!(RESULT_URL);
    let transport = ScriptedTransport::with_json(vec![failed]);
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(10), 5, true);

    let started = tokio::time::Instant::now();
    let result = controller.poll(&create_test_credential(), &policy).await;

    match result {
        Err(PollError::Failed {
            job_id,
            error_code,
            partial_data_url,
        }) => {
            assert_eq!(job_id, JOB_ID);
            assert_eq!(error_code.as_deref(), Some("ACCESS_DENIED"));
            assert_eq!(partial_data_url.as_deref(), Some(RESULT_URL));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_canceled_is_ended() {
    let transport = ScriptedTransport::with_json(vec![status_body("CANCELED", None)]);
    let controller = create_controller(&transport);

    let result = controller
        .poll(&create_test_credential(), &PollPolicy::default())
        .await;

    assert!(matches!(
        result,
        Err(PollError::Ended {
            status: BulkOperationStatus::Canceled,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_poll_keeps_going_until_operation_is_visible() {
    let transport = ScriptedTransport::with_json(vec![
        json!({"data": {"currentBulkOperation": null}}),
        status_body("COMPLETED", None),
    ]);
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(3), 4, true);

    let url = controller
        .poll(&create_test_credential(), &policy)
        .await
        .unwrap();

    // Completed with no rows.
    assert!(url.is_none());
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_poll_stops_on_first_request_error() {
    let transport = ScriptedTransport::with_json(vec![status_body("RUNNING", None)]);
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(1), 10, true);

    let result = controller.poll(&create_test_credential(), &policy).await;

    match result {
        Err(PollError::Request(error)) => assert!(error.is_transport()),
        other => panic!("expected Request error, got {other:?}"),
    }
    assert_eq!(transport.requests().len(), 2);
    assert_eq!(transport.count_containing("bulkOperationCancel"), 0);
}

// ============================================================================
// Cancel
// ============================================================================

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let transport =
        ScriptedTransport::with_json(vec![cancel_body("CANCELING"), cancel_body("CANCELING")]);
    let controller = create_controller(&transport);
    let credential = create_test_credential();

    let first = controller.cancel(&credential, JOB_ID).await.unwrap();
    let second = controller.cancel(&credential, JOB_ID).await.unwrap();

    assert_eq!(first, BulkOperationStatus::Canceling);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cancel_user_errors() {
    let transport = ScriptedTransport::with_json(vec![
        cancel_refused_body("Bulk operation does not exist"),
        status_body("COMPLETED", Some(RESULT_URL)),
    ]);
    let controller = create_controller(&transport);

    let result = controller
        .cancel(&create_test_credential(), "gid://shopify/BulkOperation/1")
        .await;

    assert!(matches!(
        result,
        Err(CancelError::UserErrors { ref messages }) if messages == &["Bulk operation does not exist"]
    ));
}

#[tokio::test]
async fn test_cancel_of_cancelled_job_reports_same_status_twice() {
    let message = "A bulk operation cannot be canceled when it is canceled.";
    let transport = ScriptedTransport::with_json(vec![
        cancel_refused_body(message),
        status_body("CANCELED", None),
        cancel_refused_body(message),
        status_body("CANCELED", None),
    ]);
    let controller = create_controller(&transport);
    let credential = create_test_credential();

    let first = controller.cancel(&credential, JOB_ID).await.unwrap();
    let second = controller.cancel(&credential, JOB_ID).await.unwrap();

    assert_eq!(first, BulkOperationStatus::Canceled);
    assert_eq!(first, second);
    assert_eq!(transport.count_containing("bulkOperationCancel"), 2);
}

#[tokio::test]
async fn test_cancel_refusal_with_reported_status_skips_lookup() {
    let transport = ScriptedTransport::with_json(vec![json!({
        "data": {
            "bulkOperationCancel": {
                "bulkOperation": {"id": JOB_ID, "status": "CANCELING"},
                "userErrors": [{"field": ["id"], "message": "Bulk operation is already canceling."}]
            }
        }
    })]);
    let controller = create_controller(&transport);

    let status = controller
        .cancel(&create_test_credential(), JOB_ID)
        .await
        .unwrap();

    assert_eq!(status, BulkOperationStatus::Canceling);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_cancel_of_completed_job_is_user_error() {
    let transport = ScriptedTransport::with_json(vec![
        cancel_refused_body("A bulk operation cannot be canceled when it is completed."),
        status_body("COMPLETED", Some(RESULT_URL)),
    ]);
    let controller = create_controller(&transport);

    let result = controller.cancel(&create_test_credential(), JOB_ID).await;

    assert!(matches!(result, Err(CancelError::UserErrors { .. })));
}

// ============================================================================
// Run
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_run_ignores_stale_operation() {
    let stale_url = "https://storage.example.com/bulk/1.jsonl?signature=old";
    let transport = ScriptedTransport::with_json(vec![
        submit_body(),
        status_body_for("gid://shopify/BulkOperation/1", "COMPLETED", Some(stale_url)),
        status_body("COMPLETED", Some(RESULT_URL)),
    ]);
    transport.push_raw(200, "{\"id\":\"gid://shopify/Product/9\"}\n");
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(5), 10, true);

    let records = controller
        .run(&create_test_credential(), "{ products { edges { node { id } } } }", &policy)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], "gid://shopify/Product/9");
    let requests = transport.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[3].url, RESULT_URL);
}

#[tokio::test(start_paused = true)]
async fn test_run_timeout_cancels_submitted_job_never_seen() {
    let transport = ScriptedTransport::with_json(vec![
        submit_body(),
        json!({"data": {"currentBulkOperation": null}}),
        json!({"data": {"currentBulkOperation": null}}),
        cancel_body("CANCELING"),
    ]);
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(1), 2, true);

    let result = controller
        .run(&create_test_credential(), "{ products { edges { node { id } } } }", &policy)
        .await;

    match result {
        Err(BulkError::Poll(PollError::Timeout { job_id, attempts })) => {
            assert_eq!(job_id.as_deref(), Some(JOB_ID));
            assert_eq!(attempts, 2);
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(transport.count_containing("bulkOperationCancel"), 1);
    let cancel = transport.requests().pop().unwrap();
    let body: Value = serde_json::from_str(cancel.body.as_deref().unwrap()).unwrap();
    assert_eq!(body["variables"]["id"], JOB_ID);
}

#[tokio::test(start_paused = true)]
async fn test_run_submits_polls_and_reads_results() {
    let transport = ScriptedTransport::with_json(vec![
        submit_body(),
        status_body("RUNNING", None),
        status_body("COMPLETED", Some(RESULT_URL)),
    ]);
    transport.push_raw(
        200,
        "{\"id\":\"gid://shopify/Product/1\"}\n{\"id\":\"gid://shopify/Product/2\"}\n",
    );
    let controller = create_controller(&transport);
    let policy = PollPolicy::new(Duration::from_secs(5), 10, true);

    let records = controller
        .run(
            &create_test_credential(),
            "{ products { edges { node { id } } } }",
            &policy,
        )
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["id"], "gid://shopify/Product/1");
    assert_eq!(records[1]["id"], "gid://shopify/Product/2");

    let requests = transport.requests();
    assert_eq!(requests.len(), 4);
    let download = &requests[3];
    assert_eq!(download.url, RESULT_URL);
    assert!(download.body.is_none());
    assert!(!download
        .headers
        .keys()
        .any(|name| name.eq_ignore_ascii_case("X-Shopify-Access-Token")));
}

#[tokio::test(start_paused = true)]
async fn test_run_reports_failing_step() {
    let transport = ScriptedTransport::with_json(vec![
        submit_body(),
        status_body("EXPIRED", None),
    ]);
    let controller = create_controller(&transport);

    let result = controller
        .run(
            &create_test_credential(),
            "{ products { edges { node { id } } } }",
            &PollPolicy::default(),
        )
        .await;

    assert!(matches!(
        result,
        Err(BulkError::Poll(PollError::Ended {
            status: BulkOperationStatus::Expired,
            ..
        }))
    ));
}
