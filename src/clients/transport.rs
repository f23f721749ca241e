//! The transport seam.
//!
//! Everything that touches the network goes through [`Transport`]. The
//! default [`ReqwestTransport`] is a thin adapter over `reqwest`; tests and
//! applications with their own HTTP stack can provide another implementation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::clients::errors::TransportError;
use crate::clients::http_request::HttpMethod;

/// A fully resolved HTTP request.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// Absolute URL. Pre-signed URLs may already carry a query string.
    pub url: String,
    /// Headers to send.
    pub headers: HashMap<String, String>,
    /// Query parameters to append.
    pub query: HashMap<String, String>,
    /// Serialized body, if any.
    pub body: Option<String>,
    /// Receive timeout for this exchange.
    pub timeout: Duration,
}

impl TransportRequest {
    /// Creates a bodiless GET with no headers.
    #[must_use]
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: HashMap::new(),
            query: HashMap::new(),
            body: None,
            timeout,
        }
    }
}

/// A raw HTTP response.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: u16,
    /// Headers keyed by lowercase name.
    pub headers: HashMap<String, Vec<String>>,
    /// The undecoded body.
    pub body: String,
}

/// Performs one HTTP exchange.
///
/// Implementations must not retry and must not interpret the status code:
/// any completed exchange is `Ok`, whatever its status.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Sends `request` and returns the completed response.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a rustls-backed client.
    ///
    /// # Panics
    ///
    /// Panics if the underlying reqwest client cannot be created. This should
    /// only happen in extremely unusual circumstances (e.g., TLS initialization failure).
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }

    /// Wraps an existing client, e.g. one with custom proxy settings.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn parse_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            result
                .entry(name.as_str().to_lowercase())
                .or_default()
                .push(value.to_str().unwrap_or_default().to_string());
        }
        result
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        }
        .timeout(request.timeout);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let timeout = request.timeout;
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout { timeout }
            } else if e.is_connect() {
                TransportError::Connection {
                    message: e.to_string(),
                }
            } else {
                TransportError::Network(e)
            }
        };

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = Self::parse_headers(response.headers());
        let body = response.text().await.map_err(classify)?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_reqwest_transport_sends_headers_and_query() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("x-test", "yes"))
            .and(query_param("a", "1"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("X-Shopify-Shop-Api-Call-Limit", "1/40")
                    .set_body_string("pong"),
            )
            .mount(&mock_server)
            .await;

        let mut request =
            TransportRequest::get(format!("{}/ping", mock_server.uri()), Duration::from_secs(5));
        request.headers.insert("x-test".to_string(), "yes".to_string());
        request.query.insert("a".to_string(), "1".to_string());

        let response = ReqwestTransport::new().send(request).await.unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.body, "pong");
        assert_eq!(
            response.headers.get("x-shopify-shop-api-call-limit"),
            Some(&vec!["1/40".to_string()])
        );
    }

    #[tokio::test]
    async fn test_reqwest_transport_reports_non_2xx_as_completed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let request = TransportRequest::get(mock_server.uri(), Duration::from_secs(5));
        let response = ReqwestTransport::new().send(request).await.unwrap();

        assert_eq!(response.status, 503);
    }

    #[tokio::test]
    async fn test_reqwest_transport_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let request = TransportRequest::get(mock_server.uri(), Duration::from_millis(50));
        let result = ReqwestTransport::new().send(request).await;

        assert!(matches!(result, Err(TransportError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_reqwest_transport_connection_refused() {
        // Port 9 (discard) is not listening on test machines.
        let request = TransportRequest::get("http://127.0.0.1:9/", Duration::from_secs(2));
        let result = ReqwestTransport::new().send(request).await;

        assert!(result.is_err());
    }
}
