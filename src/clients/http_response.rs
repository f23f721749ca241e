//! HTTP response types.
//!
//! [`HttpResponse`] is the decoded form of a [`TransportResponse`]: JSON body
//! plus the Shopify headers the runtime acts on (call limit, pagination,
//! `Retry-After`, request id, deprecation notice).

use std::collections::HashMap;

use crate::clients::transport::TransportResponse;

/// REST rate limit counter from the `X-Shopify-Shop-Api-Call-Limit` header.
///
/// The header format is `"<used>/<max>"`.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::clients::ApiCallLimit;
///
/// let limit = ApiCallLimit::parse("32/40").unwrap();
/// assert_eq!(limit.request_count, 32);
/// assert_eq!(limit.bucket_size, 40);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApiCallLimit {
    /// Calls used in the current bucket.
    pub request_count: u32,
    /// Calls allowed in the bucket.
    pub bucket_size: u32,
}

impl ApiCallLimit {
    /// Parses a `"<used>/<max>"` header value. Returns `None` if malformed.
    #[must_use]
    pub fn parse(header_value: &str) -> Option<Self> {
        let (used, max) = header_value.trim().split_once('/')?;
        Some(Self {
            request_count: used.trim().parse().ok()?,
            bucket_size: max.trim().parse().ok()?,
        })
    }
}

/// Cursor pagination from the `Link` header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaginationInfo {
    /// The `page_info` value for the previous page, if available.
    pub prev_page_info: Option<String>,
    /// The `page_info` value for the next page, if available.
    pub next_page_info: Option<String>,
}

impl PaginationInfo {
    /// Parses `<url>; rel="next", <url>; rel="previous"`.
    #[must_use]
    pub fn parse_link_header(header_value: &str) -> Self {
        let mut result = Self::default();

        for link in header_value.split(',') {
            let mut parts = link.split(';').map(str::trim);
            let Some(url) = parts.next() else { continue };
            let url = url.trim_start_matches('<').trim_end_matches('>');

            let rel = parts.find_map(|part| part.strip_prefix("rel=").map(|r| r.trim_matches('"')));

            if let (Some(rel), Some(page_info)) = (rel, Self::extract_page_info(url)) {
                match rel {
                    "previous" => result.prev_page_info = Some(page_info),
                    "next" => result.next_page_info = Some(page_info),
                    _ => {}
                }
            }
        }

        result
    }

    fn extract_page_info(url: &str) -> Option<String> {
        let (_, query) = url.split_once('?')?;
        query
            .split('&')
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| *key == "page_info")
            .map(|(_, value)| {
                urlencoding::decode(value).map_or_else(|_| value.to_string(), |v| v.into_owned())
            })
    }
}

/// A decoded response from the Shopify API.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, lowercased names, possibly repeated.
    pub headers: HashMap<String, Vec<String>>,
    /// The decoded JSON body.
    pub body: serde_json::Value,
    /// Page info for the previous page.
    pub prev_page_info: Option<String>,
    /// Page info for the next page.
    pub next_page_info: Option<String>,
    /// REST call limit counter.
    pub api_call_limit: Option<ApiCallLimit>,
    /// Seconds to wait before retrying, from `Retry-After`.
    pub retry_request_after: Option<f64>,
}

impl HttpResponse {
    /// Creates a response, parsing the Shopify headers.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, body: serde_json::Value) -> Self {
        let first = |name: &str| headers.get(name).and_then(|values| values.first());

        let pagination = first("link")
            .map(|link| PaginationInfo::parse_link_header(link))
            .unwrap_or_default();
        let api_call_limit =
            first("x-shopify-shop-api-call-limit").and_then(|value| ApiCallLimit::parse(value));
        let retry_request_after = first("retry-after").and_then(|value| value.trim().parse().ok());

        Self {
            code,
            body,
            prev_page_info: pagination.prev_page_info,
            next_page_info: pagination.next_page_info,
            api_call_limit,
            retry_request_after,
            headers,
        }
    }

    /// Decodes a raw transport response.
    ///
    /// An empty body becomes `{}`. A body that is not JSON is kept as
    /// `{"raw_body": "..."}` for 5xx responses and dropped otherwise.
    #[must_use]
    pub fn from_transport(raw: TransportResponse) -> Self {
        let body = if raw.body.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&raw.body).unwrap_or_else(|_| {
                if raw.status >= 500 {
                    serde_json::json!({ "raw_body": raw.body })
                } else {
                    serde_json::json!({})
                }
            })
        };
        Self::new(raw.status, raw.headers, body)
    }

    /// Returns `true` if the status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-request-id")
    }

    /// Returns the `X-Shopify-API-Deprecated-Reason` header value, if present.
    #[must_use]
    pub fn deprecation_reason(&self) -> Option<&str> {
        self.header("x-shopify-api-deprecated-reason")
    }

    /// Returns the first value of `name` (lowercase).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}
