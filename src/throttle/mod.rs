//! Adaptive client-side throttling.
//!
//! Every Shopify response reports how much of the rate limit is left:
//! REST through the `X-Shopify-Shop-Api-Call-Limit` header, GraphQL through
//! `extensions.cost.throttleStatus`. [`CallLimitTracker`] turns that into a
//! [`Capacity`], and [`ThrottleGate`] uses the latest capacity per credential
//! and surface to hold back requests that would otherwise be rejected.
//!
//! There is no central rate-limit authority. Each process paces itself from
//! the telemetry it sees.

mod capacity;
mod gate;

pub use capacity::{ApiSurface, CallLimitTracker, Capacity, QueryCost};
pub use gate::{GateKey, ThrottleGate, ThrottlePermit};
