//! HTTP request types.
//!
//! [`HttpRequest`] describes one logical API call relative to the
//! `/admin/api/{version}/` base path. The executor turns it into a
//! [`TransportRequest`](crate::clients::TransportRequest) for a given
//! credential.

use std::collections::HashMap;
use std::fmt;

use crate::clients::errors::InvalidHttpRequestError;
use crate::throttle::ApiSurface;

/// HTTP methods supported by the Admin API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP DELETE.
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Post => write!(f, "post"),
            Self::Put => write!(f, "put"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Content type for request bodies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    /// `application/json`.
    Json,
    /// `application/graphql`.
    GraphQL,
}

impl DataType {
    /// Returns the MIME type string for this data type.
    #[must_use]
    pub const fn as_content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::GraphQL => "application/graphql",
        }
    }
}

/// A request to the Admin API.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::clients::{DataType, HttpMethod, HttpRequest};
/// use serde_json::json;
///
/// let list = HttpRequest::builder(HttpMethod::Get, "products.json")
///     .query_param("limit", "250")
///     .build()
///     .unwrap();
///
/// let query = HttpRequest::graphql(json!({ "query": "{ shop { name } }" }))
///     .estimated_cost(1.0)
///     .build()
///     .unwrap();
/// assert_eq!(query.path, "graphql.json");
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method.
    pub http_method: HttpMethod,
    /// The path relative to `/admin/api/{version}/`.
    pub path: String,
    /// The request body, if any.
    pub body: Option<serde_json::Value>,
    /// The content type of the body.
    pub body_type: Option<DataType>,
    /// Query parameters.
    pub query: Option<HashMap<String, String>>,
    /// Additional headers.
    pub extra_headers: Option<HashMap<String, String>>,
    /// Which rate-limit bucket this request draws from.
    pub surface: ApiSurface,
    /// Expected GraphQL cost in points. Ignored for REST.
    pub estimated_cost: Option<f64>,
}

impl HttpRequest {
    /// Creates a builder for a REST request.
    #[must_use]
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, path, ApiSurface::Rest)
    }

    /// Creates a builder for a GraphQL POST to `graphql.json` with `body`
    /// (`{"query": ..., "variables": ...}`).
    #[must_use]
    pub fn graphql(body: serde_json::Value) -> HttpRequestBuilder {
        HttpRequestBuilder::new(HttpMethod::Post, "graphql.json", ApiSurface::Graphql)
            .body(body)
            .body_type(DataType::Json)
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if:
    /// - `body` is `Some` but `body_type` is `None`
    /// - `http_method` is `Post` or `Put` but `body` is `None`
    /// - `estimated_cost` is negative or not finite
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        if self.body.is_some() && self.body_type.is_none() {
            return Err(InvalidHttpRequestError::MissingBodyType);
        }

        if matches!(self.http_method, HttpMethod::Post | HttpMethod::Put) && self.body.is_none() {
            return Err(InvalidHttpRequestError::MissingBody {
                method: self.http_method.to_string(),
            });
        }

        if let Some(cost) = self.estimated_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(InvalidHttpRequestError::InvalidCost { cost });
            }
        }

        Ok(())
    }

    /// Builds the follow-up request for `page_info`.
    ///
    /// Shopify rejects most filters alongside `page_info`, so only `limit`
    /// is carried over.
    #[must_use]
    pub fn next_page(&self, page_info: &str) -> Self {
        let mut query = HashMap::new();
        if let Some(limit) = self.query.as_ref().and_then(|q| q.get("limit")) {
            query.insert("limit".to_string(), limit.clone());
        }
        query.insert("page_info".to_string(), page_info.to_string());

        Self {
            query: Some(query),
            ..self.clone()
        }
    }
}

/// Builder for [`HttpRequest`].
#[derive(Debug)]
pub struct HttpRequestBuilder {
    request: HttpRequest,
}

impl HttpRequestBuilder {
    fn new(method: HttpMethod, path: impl Into<String>, surface: ApiSurface) -> Self {
        Self {
            request: HttpRequest {
                http_method: method,
                path: path.into(),
                body: None,
                body_type: None,
                query: None,
                extra_headers: None,
                surface,
                estimated_cost: None,
            },
        }
    }

    /// Sets the request body. A body type must also be set.
    #[must_use]
    pub fn body(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    /// Sets the content type of the request body.
    #[must_use]
    pub const fn body_type(mut self, body_type: DataType) -> Self {
        self.request.body_type = Some(body_type);
        self
    }

    /// Sets all query parameters at once.
    #[must_use]
    pub fn query(mut self, query: HashMap<String, String>) -> Self {
        self.request.query = Some(query);
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .query
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Adds a single extra header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Sets the expected GraphQL query cost used by the throttle gate.
    #[must_use]
    pub const fn estimated_cost(mut self, cost: f64) -> Self {
        self.request.estimated_cost = Some(cost);
        self
    }

    /// Builds the [`HttpRequest`], validating it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        self.request.verify()?;
        Ok(self.request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_method_display() {
        assert_eq!(HttpMethod::Get.to_string(), "get");
        assert_eq!(HttpMethod::Delete.to_string(), "delete");
    }

    #[test]
    fn test_builder_creates_rest_get_request() {
        let request = HttpRequest::builder(HttpMethod::Get, "products.json")
            .build()
            .unwrap();

        assert_eq!(request.http_method, HttpMethod::Get);
        assert_eq!(request.surface, ApiSurface::Rest);
        assert!(request.body.is_none());
        assert!(request.estimated_cost.is_none());
    }

    #[test]
    fn test_graphql_builder_targets_graphql_surface() {
        let request = HttpRequest::graphql(json!({"query": "{ shop { id } }"}))
            .build()
            .unwrap();

        assert_eq!(request.http_method, HttpMethod::Post);
        assert_eq!(request.path, "graphql.json");
        assert_eq!(request.surface, ApiSurface::Graphql);
        assert_eq!(request.body_type, Some(DataType::Json));
    }

    #[test]
    fn test_verify_requires_body_for_post_and_put() {
        assert!(matches!(
            HttpRequest::builder(HttpMethod::Post, "products.json").build(),
            Err(InvalidHttpRequestError::MissingBody { method }) if method == "post"
        ));
        assert!(matches!(
            HttpRequest::builder(HttpMethod::Put, "products/1.json").build(),
            Err(InvalidHttpRequestError::MissingBody { method }) if method == "put"
        ));
    }

    #[test]
    fn test_verify_requires_body_type_when_body_present() {
        let result = HttpRequest::builder(HttpMethod::Get, "test")
            .body(json!({"key": "value"}))
            .build();

        assert!(matches!(
            result,
            Err(InvalidHttpRequestError::MissingBodyType)
        ));
    }

    #[test]
    fn test_verify_rejects_negative_cost() {
        let result = HttpRequest::graphql(json!({"query": "{}"}))
            .estimated_cost(-1.0)
            .build();

        assert!(matches!(
            result,
            Err(InvalidHttpRequestError::InvalidCost { .. })
        ));
    }

    #[test]
    fn test_next_page_keeps_only_limit() {
        let request = HttpRequest::builder(HttpMethod::Get, "orders.json")
            .query_param("limit", "50")
            .query_param("status", "any")
            .build()
            .unwrap();

        let next = request.next_page("cursor-2");
        let query = next.query.unwrap();

        assert_eq!(query.get("limit").map(String::as_str), Some("50"));
        assert_eq!(query.get("page_info").map(String::as_str), Some("cursor-2"));
        assert!(!query.contains_key("status"));
        assert_eq!(next.path, "orders.json");
    }
}
