use std::fmt;

use crate::clients::HttpResponse;

/// Which rate-limit bucket a request draws from.
///
/// Shopify accounts REST calls and GraphQL points separately, so each
/// surface gets its own throttle gate per credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiSurface {
    /// Fixed-counter leaky bucket (`X-Shopify-Shop-Api-Call-Limit`).
    Rest,
    /// Cost-based bucket (`extensions.cost.throttleStatus`).
    Graphql,
}

impl fmt::Display for ApiSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rest => f.write_str("rest"),
            Self::Graphql => f.write_str("graphql"),
        }
    }
}

/// Normalized remaining budget for one credential and surface.
///
/// `restore_rate` is `None` for the fixed-counter surface. The constructor
/// clamps values so that `0 <= available <= maximum` always holds.
///
/// # Example
///
/// ```rust
/// use shopify_runtime::throttle::Capacity;
///
/// let capacity = Capacity::new(1200.0, 1000.0, Some(50.0));
/// assert_eq!(capacity.available(), 1000.0);
/// assert!(capacity.is_cost_based());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Capacity {
    available: f64,
    maximum: f64,
    restore_rate: Option<f64>,
}

impl Capacity {
    /// Creates a capacity, clamping `available` into `[0, maximum]`.
    /// Non-finite inputs are treated as zero.
    #[must_use]
    pub fn new(available: f64, maximum: f64, restore_rate: Option<f64>) -> Self {
        let finite_or_zero = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };
        let maximum = finite_or_zero(maximum);
        Self {
            available: finite_or_zero(available).min(maximum),
            maximum,
            restore_rate: restore_rate.filter(|r| r.is_finite() && *r > 0.0),
        }
    }

    /// Remaining budget.
    #[must_use]
    pub const fn available(&self) -> f64 {
        self.available
    }

    /// Bucket size.
    #[must_use]
    pub const fn maximum(&self) -> f64 {
        self.maximum
    }

    /// Points restored per second, for the cost-based surface.
    #[must_use]
    pub const fn restore_rate(&self) -> Option<f64> {
        self.restore_rate
    }

    /// Returns `true` if the server reported a replenishment rate.
    #[must_use]
    pub const fn is_cost_based(&self) -> bool {
        self.restore_rate.is_some()
    }

    /// Capacity expected after `elapsed_secs` of replenishment at `rate`.
    #[must_use]
    pub fn replenished(&self, elapsed_secs: f64, rate: f64) -> Self {
        Self::new(
            self.available + rate * elapsed_secs.max(0.0),
            self.maximum,
            self.restore_rate,
        )
    }

    /// Returns a copy with `amount` taken out of the available budget.
    #[must_use]
    pub fn debited(&self, amount: f64) -> Self {
        Self::new(self.available - amount, self.maximum, self.restore_rate)
    }
}

/// Requested and actual GraphQL query cost, from `extensions.cost`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QueryCost {
    /// `requestedQueryCost`.
    pub requested: Option<f64>,
    /// `actualQueryCost`.
    pub actual: Option<f64>,
}

/// Parses rate-limit telemetry out of responses.
///
/// All functions are pure and never panic. `None` is the "unknown" result:
/// callers should not tighten throttling on it, only log it.
#[derive(Clone, Copy, Debug, Default)]
pub struct CallLimitTracker;

impl CallLimitTracker {
    /// Parses the telemetry for `surface`.
    #[must_use]
    pub fn parse(surface: ApiSurface, response: &HttpResponse) -> Option<Capacity> {
        match surface {
            ApiSurface::Rest => Self::parse_rest(response),
            ApiSurface::Graphql => Self::parse_graphql(response),
        }
    }

    /// Reads the `"<used>/<max>"` call limit header.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// use shopify_runtime::clients::HttpResponse;
    /// use shopify_runtime::throttle::CallLimitTracker;
    ///
    /// let mut headers = HashMap::new();
    /// headers.insert("x-shopify-shop-api-call-limit".to_string(), vec!["32/40".to_string()]);
    /// let response = HttpResponse::new(200, headers, serde_json::json!({}));
    ///
    /// let capacity = CallLimitTracker::parse_rest(&response).unwrap();
    /// assert_eq!(capacity.available(), 8.0);
    /// assert_eq!(capacity.maximum(), 40.0);
    /// ```
    #[must_use]
    pub fn parse_rest(response: &HttpResponse) -> Option<Capacity> {
        let limit = response.api_call_limit?;
        let used = f64::from(limit.request_count);
        let maximum = f64::from(limit.bucket_size);
        Some(Capacity::new(maximum - used, maximum, None))
    }

    /// Reads `extensions.cost.throttleStatus` from a GraphQL body.
    #[must_use]
    pub fn parse_graphql(response: &HttpResponse) -> Option<Capacity> {
        let status = response
            .body
            .get("extensions")?
            .get("cost")?
            .get("throttleStatus")?;

        let maximum = status.get("maximumAvailable")?.as_f64()?;
        let available = status.get("currentlyAvailable")?.as_f64()?;
        let restore_rate = status.get("restoreRate").and_then(serde_json::Value::as_f64);

        if !maximum.is_finite() || !available.is_finite() {
            return None;
        }
        Some(Capacity::new(available, maximum, restore_rate))
    }

    /// Reads `requestedQueryCost` / `actualQueryCost`.
    #[must_use]
    pub fn query_cost(response: &HttpResponse) -> QueryCost {
        let cost = response
            .body
            .get("extensions")
            .and_then(|extensions| extensions.get("cost"));
        let field = |name: &str| {
            cost.and_then(|c| c.get(name))
                .and_then(serde_json::Value::as_f64)
        };
        QueryCost {
            requested: field("requestedQueryCost"),
            actual: field("actualQueryCost"),
        }
    }

    /// Returns `true` if a GraphQL body reports a `THROTTLED` error.
    #[must_use]
    pub fn is_graphql_throttled(response: &HttpResponse) -> bool {
        response
            .body
            .get("errors")
            .and_then(serde_json::Value::as_array)
            .is_some_and(|errors| {
                errors.iter().any(|error| {
                    error
                        .pointer("/extensions/code")
                        .and_then(serde_json::Value::as_str)
                        == Some("THROTTLED")
                })
            })
    }
}
