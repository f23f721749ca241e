//! Throttled request execution.
//!
//! [`RequestExecutor`] is the only path by which the runtime talks to the
//! Admin API. For every call it:
//!
//! 1. Validates the request and resolves the URL and headers for the credential
//! 2. Waits on the [`ThrottleGate`] for the credential and API surface
//! 3. Sends the request through the [`Transport`]
//! 4. Feeds the response telemetry back into the gate
//! 5. Classifies the outcome and emits one `tracing` event
//!
//! Nothing is retried. A 429 or a GraphQL `THROTTLED` error means the gate
//! was too optimistic; it is reported as [`RequestError::RateLimited`] and
//! the fresh telemetry makes the next acquire wait longer.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;

use crate::clients::errors::{HttpResponseError, RequestError};
use crate::clients::http_request::{DataType, HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::clients::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::config::ClientConfig;
use crate::credentials::Credential;
use crate::throttle::{ApiSurface, CallLimitTracker, Capacity, GateKey, ThrottleGate};

/// Library version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sends Admin API requests for any number of credentials, pacing each
/// credential by the rate-limit telemetry of its previous responses.
///
/// One executor is meant to be shared (behind an `Arc`) by every task in the
/// process. Throttle state lives inside it, so two executors for the same
/// shop do not coordinate.
///
/// # Thread Safety
///
/// `RequestExecutor` is `Send + Sync`.
///
/// # Example
///
/// ```rust,ignore
/// use shopify_runtime::clients::RequestExecutor;
/// use shopify_runtime::ClientConfig;
///
/// let executor = RequestExecutor::new(ClientConfig::default());
///
/// let products = executor.get(&credential, "products", None).await?;
/// let shop = executor
///     .graphql(&credential, "query { shop { name } }", None)
///     .await?;
/// ```
#[derive(Debug)]
pub struct RequestExecutor {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    gate: ThrottleGate,
    user_agent: String,
}

// Verify RequestExecutor is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RequestExecutor>();
};

impl RequestExecutor {
    /// Creates an executor that sends through a default [`ReqwestTransport`].
    ///
    /// # Panics
    ///
    /// Panics if the underlying reqwest client cannot be created. This should
    /// only happen in extremely unusual circumstances (e.g., TLS initialization failure).
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Creates an executor that sends through `transport`.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}Shopify API Library v{SDK_VERSION} | Rust {rust_version}");

        Self {
            gate: ThrottleGate::new(*config.throttle()),
            config,
            transport,
            user_agent,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the throttle gate, e.g. to inspect the last known capacity.
    #[must_use]
    pub const fn gate(&self) -> &ThrottleGate {
        &self.gate
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Sends one request for `credential`.
    ///
    /// # Errors
    ///
    /// - [`RequestError::InvalidRequest`] if validation fails; nothing is sent
    /// - [`RequestError::Transport`] if the server could not be reached
    /// - [`RequestError::RateLimited`] on 429 or a GraphQL `THROTTLED` error
    /// - [`RequestError::Http`] for any other non-2xx response
    pub async fn perform(
        &self,
        credential: &Credential,
        request: HttpRequest,
    ) -> Result<HttpResponse, RequestError> {
        request.verify()?;

        let url = self.url_for(credential, &request.path);
        let key = GateKey::new(credential, request.surface);
        let cost = match request.surface {
            ApiSurface::Rest => 1.0,
            ApiSurface::Graphql => request
                .estimated_cost
                .unwrap_or_else(|| self.config.throttle().default_query_cost()),
        };

        let permit = self.gate.acquire(&key, cost).await;
        let started = Instant::now();
        let sent = self
            .transport
            .send(self.transport_request(credential, &request, &url))
            .await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let raw = match sent {
            Ok(raw) => raw,
            Err(error) => {
                self.gate.release(permit, None);
                tracing::warn!(
                    app = credential.app_name(),
                    shop = %credential.shop(),
                    method = %request.http_method,
                    url = %url,
                    elapsed_ms,
                    error = %error,
                    "Shopify API request did not complete"
                );
                return Err(error.into());
            }
        };

        let response = HttpResponse::from_transport(raw);
        let capacity = CallLimitTracker::parse(request.surface, &response);
        self.gate.release(permit, capacity);

        if let Some(reason) = response.deprecation_reason() {
            tracing::warn!(
                "Deprecated request to Shopify API at {}, received reason: {}",
                request.path,
                reason
            );
        }

        let outcome = Self::classify(request.surface, response, capacity);
        match &outcome {
            Ok(response) => {
                let cost = CallLimitTracker::query_cost(response);
                tracing::info!(
                    app = credential.app_name(),
                    shop = %credential.shop(),
                    method = %request.http_method,
                    url = %url,
                    status = response.code,
                    elapsed_ms,
                    available = ?capacity.map(|c| c.available()),
                    actual_cost = ?cost.actual,
                    "Shopify API request completed"
                );
            }
            Err(error) => {
                tracing::warn!(
                    app = credential.app_name(),
                    shop = %credential.shop(),
                    method = %request.http_method,
                    url = %url,
                    status = ?error.status(),
                    elapsed_ms,
                    available = ?capacity.map(|c| c.available()),
                    error = %error,
                    "Shopify API request rejected"
                );
            }
        }
        outcome
    }

    /// Sends a GET to a REST path such as `"products"` or `"/orders/1.json"`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidPath`] if the path is empty, otherwise
    /// the errors of [`perform`](Self::perform).
    pub async fn get(
        &self,
        credential: &Credential,
        path: &str,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, RequestError> {
        self.rest(credential, HttpMethod::Get, path, None, query)
            .await
    }

    /// Sends a POST with a JSON body to a REST path.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidPath`] if the path is empty, otherwise
    /// the errors of [`perform`](Self::perform).
    pub async fn post(
        &self,
        credential: &Credential,
        path: &str,
        body: Value,
    ) -> Result<HttpResponse, RequestError> {
        self.rest(credential, HttpMethod::Post, path, Some(body), None)
            .await
    }

    /// Sends a PUT with a JSON body to a REST path.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidPath`] if the path is empty, otherwise
    /// the errors of [`perform`](Self::perform).
    pub async fn put(
        &self,
        credential: &Credential,
        path: &str,
        body: Value,
    ) -> Result<HttpResponse, RequestError> {
        self.rest(credential, HttpMethod::Put, path, Some(body), None)
            .await
    }

    /// Sends a DELETE to a REST path.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidPath`] if the path is empty, otherwise
    /// the errors of [`perform`](Self::perform).
    pub async fn delete(
        &self,
        credential: &Credential,
        path: &str,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, RequestError> {
        self.rest(credential, HttpMethod::Delete, path, None, query)
            .await
    }

    /// Runs a GraphQL query or mutation at the configured default cost.
    ///
    /// GraphQL errors that are not `THROTTLED` come back inside a successful
    /// response under `body["errors"]`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`perform`](Self::perform).
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use serde_json::json;
    ///
    /// let response = executor.graphql(
    ///     &credential,
    ///     "query GetProduct($id: ID!) { product(id: $id) { title } }",
    ///     Some(json!({ "id": "gid://shopify/Product/123" })),
    /// ).await?;
    /// ```
    pub async fn graphql(
        &self,
        credential: &Credential,
        query: &str,
        variables: Option<Value>,
    ) -> Result<HttpResponse, RequestError> {
        let request = HttpRequest::graphql(graphql_body(query, variables)).build()?;
        self.perform(credential, request).await
    }

    /// Runs a GraphQL operation whose cost is known to be `estimated_cost`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidRequest`] for a negative or non-finite
    /// cost, otherwise the errors of [`perform`](Self::perform).
    pub async fn graphql_with_cost(
        &self,
        credential: &Credential,
        query: &str,
        variables: Option<Value>,
        estimated_cost: f64,
    ) -> Result<HttpResponse, RequestError> {
        let request = HttpRequest::graphql(graphql_body(query, variables))
            .estimated_cost(estimated_cost)
            .build()?;
        self.perform(credential, request).await
    }

    /// Follows `rel="next"` links from `request` and concatenates the array
    /// found under `key` in every page.
    ///
    /// # Errors
    ///
    /// Stops at the first failing page and returns its error. Returns
    /// [`RequestError::MissingCollection`] if a page has no array at `key`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let request = HttpRequest::builder(HttpMethod::Get, "products.json")
    ///     .query_param("limit", "250")
    ///     .build()?;
    /// let products = executor.collect_pages(&credential, request, "products").await?;
    /// ```
    pub async fn collect_pages(
        &self,
        credential: &Credential,
        request: HttpRequest,
        key: &str,
    ) -> Result<Vec<Value>, RequestError> {
        let mut items = Vec::new();
        let mut cursor = self.pages(credential, request);

        while let Some(page) = cursor.next_page().await {
            let mut page = page?;
            match page.body.get_mut(key).map(Value::take) {
                Some(Value::Array(collection)) => items.extend(collection),
                _ => {
                    return Err(RequestError::MissingCollection {
                        key: key.to_string(),
                    })
                }
            }
        }

        Ok(items)
    }

    /// Returns a cursor that fetches one page per
    /// [`next_page`](PageCursor::next_page) call.
    #[must_use]
    pub fn pages<'a>(&'a self, credential: &'a Credential, request: HttpRequest) -> PageCursor<'a> {
        PageCursor {
            executor: self,
            credential,
            next: Some(request.clone()),
            first: request,
        }
    }

    async fn rest(
        &self,
        credential: &Credential,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        query: Option<HashMap<String, String>>,
    ) -> Result<HttpResponse, RequestError> {
        let path = normalize_path(path)?;

        let mut builder = HttpRequest::builder(method, path);
        if let Some(body) = body {
            builder = builder.body(body).body_type(DataType::Json);
        }
        if let Some(query) = query {
            builder = builder.query(query);
        }

        self.perform(credential, builder.build()?).await
    }

    fn url_for(&self, credential: &Credential, path: &str) -> String {
        let base = self.config.api_host().map_or_else(
            || format!("https://{}", credential.shop()),
            |host| host.as_ref().to_string(),
        );
        format!(
            "{base}/admin/api/{}/{}",
            self.config.api_version(),
            path.trim_start_matches('/')
        )
    }

    fn transport_request(
        &self,
        credential: &Credential,
        request: &HttpRequest,
        url: &str,
    ) -> TransportRequest {
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), self.user_agent.clone());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert(
            "X-Shopify-Access-Token".to_string(),
            credential.access_token().as_ref().to_string(),
        );
        if let Some(body_type) = &request.body_type {
            headers.insert(
                "Content-Type".to_string(),
                body_type.as_content_type().to_string(),
            );
        }
        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                headers.insert(key.clone(), value.clone());
            }
        }

        TransportRequest {
            method: request.http_method,
            url: url.to_string(),
            headers,
            query: request.query.clone().unwrap_or_default(),
            body: request.body.as_ref().map(Value::to_string),
            timeout: self.config.request_timeout(),
        }
    }

    fn classify(
        surface: ApiSurface,
        response: HttpResponse,
        capacity: Option<Capacity>,
    ) -> Result<HttpResponse, RequestError> {
        let throttled = response.code == 429
            || (surface == ApiSurface::Graphql
                && response.is_ok()
                && CallLimitTracker::is_graphql_throttled(&response));

        if throttled {
            return Err(RequestError::RateLimited {
                code: response.code,
                retry_after: response.retry_request_after,
                capacity,
            });
        }

        if response.is_ok() {
            return Ok(response);
        }

        Err(RequestError::Http(HttpResponseError {
            code: response.code,
            message: serialize_error(&response),
            error_reference: response.request_id().map(String::from),
            body: response.body,
        }))
    }
}

/// Lazily walks the pages of a REST list endpoint.
///
/// Every fetch goes through [`RequestExecutor::perform`] and is throttled
/// like any other call. The cursor is finished after the last page or after
/// the first error.
///
/// # Example
///
/// ```rust,ignore
/// let mut cursor = executor.pages(&credential, request);
/// while let Some(page) = cursor.next_page().await {
///     let page = page?;
///     println!("{} orders", page.body["orders"].as_array().map_or(0, Vec::len));
/// }
/// ```
#[derive(Debug)]
pub struct PageCursor<'a> {
    executor: &'a RequestExecutor,
    credential: &'a Credential,
    first: HttpRequest,
    next: Option<HttpRequest>,
}

impl PageCursor<'_> {
    /// Fetches the next page, or returns `None` once the cursor is finished.
    ///
    /// If the returned future is dropped before it completes, the cursor
    /// stays on the same page.
    pub async fn next_page(&mut self) -> Option<Result<HttpResponse, RequestError>> {
        let request = self.next.clone()?;

        match self.executor.perform(self.credential, request.clone()).await {
            Ok(response) => {
                self.next = response
                    .next_page_info
                    .as_deref()
                    .map(|page_info| request.next_page(page_info));
                Some(Ok(response))
            }
            Err(error) => {
                self.next = None;
                Some(Err(error))
            }
        }
    }

    /// Rewinds to the first page.
    pub fn restart(&mut self) {
        self.next = Some(self.first.clone());
    }

    /// Returns `true` once there is nothing more to fetch.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.next.is_none()
    }
}

fn graphql_body(query: &str, variables: Option<Value>) -> Value {
    let mut body = serde_json::json!({ "query": query });
    if let Some(variables) = variables {
        body["variables"] = variables;
    }
    body
}

/// Normalizes a REST path: no leading `/`, exactly one `.json` suffix.
fn normalize_path(path: &str) -> Result<String, RequestError> {
    let path = path.trim_start_matches('/');
    let path = path.strip_suffix(".json").unwrap_or(path);

    if path.is_empty() {
        return Err(RequestError::InvalidPath {
            path: String::new(),
        });
    }

    Ok(format!("{path}.json"))
}

/// Serializes an error response to JSON (`errors`, `error`,
/// `error_description`, `error_reference`).
fn serialize_error(response: &HttpResponse) -> String {
    let mut error_body = serde_json::Map::new();

    if let Some(errors) = response.body.get("errors") {
        error_body.insert("errors".to_string(), errors.clone());
    }
    if let Some(error) = response.body.get("error") {
        error_body.insert("error".to_string(), error.clone());
        if let Some(desc) = response.body.get("error_description") {
            error_body.insert("error_description".to_string(), desc.clone());
        }
    }

    if let Some(request_id) = response.request_id() {
        error_body.insert(
            "error_reference".to_string(),
            serde_json::json!(format!(
                "If you report this error, please include this id: {request_id}."
            )),
        );
    }

    serde_json::to_string(&error_body).unwrap_or_else(|_| "{}".to_string())
}
