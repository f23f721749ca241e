//! Request execution for the Shopify Admin API.
//!
//! # Overview
//!
//! - [`RequestExecutor`]: throttled REST and GraphQL calls for any credential
//! - [`PageCursor`]: lazy walk over a paginated REST list
//! - [`HttpRequest`] / [`HttpRequestBuilder`]: one logical API call
//! - [`HttpResponse`]: decoded response plus the Shopify headers
//! - [`Transport`]: the seam to the HTTP stack, with [`ReqwestTransport`] as default
//! - [`RequestError`]: classified outcome of a failed call
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_runtime::clients::{HttpMethod, HttpRequest, RequestExecutor};
//! use shopify_runtime::ClientConfig;
//!
//! let executor = RequestExecutor::new(ClientConfig::default());
//!
//! let request = HttpRequest::builder(HttpMethod::Get, "orders.json")
//!     .query_param("limit", "250")
//!     .build()?;
//! let orders = executor.collect_pages(&credential, request, "orders").await?;
//! ```
//!
//! # Error Classification
//!
//! - **2xx**: `Ok(HttpResponse)`
//! - **429**, or a GraphQL `THROTTLED` error: [`RequestError::RateLimited`]
//! - **Other statuses**: [`RequestError::Http`] with the decoded body
//! - **No response**: [`RequestError::Transport`]
//!
//! Nothing is retried automatically.

mod errors;
mod executor;
mod http_request;
mod http_response;
mod transport;

pub use errors::{
    HttpResponseError, InvalidHttpRequestError, RequestError, TransportError,
};
pub use executor::{PageCursor, RequestExecutor, SDK_VERSION};
pub use http_request::{DataType, HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::{ApiCallLimit, HttpResponse, PaginationInfo};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
