//! Per-credential throttle gate.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::{ShopDomain, ThrottleSettings};
use crate::credentials::Credential;
use crate::throttle::{ApiSurface, Capacity};

/// Waits shorter than this are treated as no wait at all.
const EPSILON: f64 = 1e-6;

/// Identity of one rate-limit bucket: app, shop and API surface.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GateKey {
    app_name: String,
    shop: ShopDomain,
    surface: ApiSurface,
}

impl GateKey {
    /// Creates the key for `credential` on `surface`.
    #[must_use]
    pub fn new(credential: &Credential, surface: ApiSurface) -> Self {
        Self {
            app_name: credential.app_name().to_string(),
            shop: credential.shop().clone(),
            surface,
        }
    }

    /// Returns the app name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the shop domain.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        &self.shop
    }

    /// Returns the API surface.
    #[must_use]
    pub const fn surface(&self) -> ApiSurface {
        self.surface
    }
}

impl fmt::Display for GateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.app_name, self.shop, self.surface)
    }
}

/// Proof that [`ThrottleGate::acquire`] let a call through.
///
/// Hand it back to [`ThrottleGate::release`] together with whatever
/// telemetry the response carried.
#[derive(Debug)]
#[must_use = "a permit should be released with the response telemetry"]
pub struct ThrottlePermit {
    key: GateKey,
    waited: Duration,
}

impl ThrottlePermit {
    /// The bucket this permit was issued for.
    #[must_use]
    pub const fn key(&self) -> &GateKey {
        &self.key
    }

    /// How long `acquire` spent waiting for this permit, including time
    /// queued behind other callers for the same key.
    #[must_use]
    pub const fn waited(&self) -> Duration {
        self.waited
    }
}

#[derive(Debug)]
struct GateState {
    capacity: Option<Capacity>,
    observed_at: Instant,
}

#[derive(Debug)]
struct Gate {
    // FIFO: throttling order for one key equals acquire call order.
    turnstile: tokio::sync::Mutex<()>,
    state: Mutex<GateState>,
}

impl Gate {
    fn new() -> Self {
        Self {
            turnstile: tokio::sync::Mutex::new(()),
            state: Mutex::new(GateState {
                capacity: None,
                observed_at: Instant::now(),
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Paces requests per [`GateKey`] from the last observed [`Capacity`].
///
/// Each key has its own gate, created on first use and kept for the life of
/// the `ThrottleGate`. The shared map is only locked long enough to look a
/// gate up, so callers for different keys never wait on each other.
///
/// Within one key, decisions are serialized: a caller that has to wait keeps
/// the key's turnstile for the duration of the wait, and the estimate is
/// debited before the next caller is let in. Dropping an `acquire` future
/// (for example from `tokio::time::timeout`) cancels the wait and frees the
/// turnstile.
///
/// # Example
///
/// ```rust,ignore
/// use shopify_runtime::throttle::{ApiSurface, GateKey, ThrottleGate};
///
/// let gate = ThrottleGate::new(ThrottleSettings::default());
/// let key = GateKey::new(&credential, ApiSurface::Graphql);
///
/// let permit = gate.acquire(&key, 50.0).await;
/// let response = send().await;
/// gate.release(permit, CallLimitTracker::parse_graphql(&response));
/// ```
#[derive(Debug)]
pub struct ThrottleGate {
    settings: ThrottleSettings,
    gates: Mutex<HashMap<GateKey, Arc<Gate>>>,
}

// Verify ThrottleGate is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ThrottleGate>();
};

impl ThrottleGate {
    /// Creates an empty gate map.
    #[must_use]
    pub fn new(settings: ThrottleSettings) -> Self {
        Self {
            settings,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the settings this gate was built with.
    #[must_use]
    pub const fn settings(&self) -> &ThrottleSettings {
        &self.settings
    }

    /// Waits until a call for `key` costing `estimated_cost` fits the
    /// estimated capacity, then debits the estimate.
    ///
    /// For REST the cost is always one call and `estimated_cost` is ignored.
    /// A key that has never been observed is let through immediately.
    pub async fn acquire(&self, key: &GateKey, estimated_cost: f64) -> ThrottlePermit {
        let gate = self.gate(key);
        let started = Instant::now();
        let _turn = gate.turnstile.lock().await;

        loop {
            let wait = {
                let mut state = gate.lock_state();
                let now = Instant::now();

                let Some(observed) = state.capacity else {
                    tracing::debug!(
                        app = %key.app_name,
                        shop = %key.shop,
                        surface = %key.surface,
                        "No capacity observed yet, proceeding"
                    );
                    break;
                };

                let rate = self.replenish_rate(key.surface, &observed);
                let elapsed = now.saturating_duration_since(state.observed_at);
                let estimate = observed.replenished(elapsed.as_secs_f64(), rate);

                let wait_secs = self.wait_secs(key.surface, &estimate, estimated_cost, rate);
                if wait_secs <= EPSILON {
                    let debit = Self::debit(key.surface, estimated_cost);
                    state.capacity = Some(estimate.debited(debit));
                    state.observed_at = now;
                    break;
                }
                // A near-zero rate from telemetry or settings overflows Duration.
                Duration::try_from_secs_f64(wait_secs).unwrap_or(Duration::MAX)
            };

            tracing::debug!(
                app = %key.app_name,
                shop = %key.shop,
                surface = %key.surface,
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "Throttling request until capacity replenishes"
            );
            tokio::time::sleep(wait).await;
        }

        ThrottlePermit {
            key: key.clone(),
            waited: started.elapsed(),
        }
    }

    /// Records the telemetry of the response that `permit` was issued for.
    ///
    /// `Some` replaces the stored capacity. `None` keeps the current estimate.
    pub fn release(&self, permit: ThrottlePermit, observed: Option<Capacity>) {
        let gate = self.gate(&permit.key);
        let mut state = gate.lock_state();

        match observed {
            Some(capacity) => {
                state.capacity = Some(capacity);
                state.observed_at = Instant::now();
            }
            None => {
                tracing::debug!(
                    app = %permit.key.app_name,
                    shop = %permit.key.shop,
                    surface = %permit.key.surface,
                    "Response carried no rate limit telemetry, keeping previous estimate"
                );
            }
        }
    }

    /// Returns the last stored capacity for `key`, without replenishment.
    #[must_use]
    pub fn capacity(&self, key: &GateKey) -> Option<Capacity> {
        let gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates.get(key).and_then(|gate| gate.lock_state().capacity)
    }

    fn gate(&self, key: &GateKey) -> Arc<Gate> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            gates
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Gate::new())),
        )
    }

    fn replenish_rate(&self, surface: ApiSurface, capacity: &Capacity) -> f64 {
        capacity.restore_rate().unwrap_or(match surface {
            ApiSurface::Rest => self.settings.rest_leak_rate(),
            ApiSurface::Graphql => self.settings.fallback_restore_rate(),
        })
    }

    const fn debit(surface: ApiSurface, estimated_cost: f64) -> f64 {
        match surface {
            ApiSurface::Rest => 1.0,
            ApiSurface::Graphql => estimated_cost,
        }
    }

    fn wait_secs(&self, surface: ApiSurface, estimate: &Capacity, cost: f64, rate: f64) -> f64 {
        // A bucket that can never satisfy the request is not worth waiting for.
        if estimate.maximum() <= 0.0 || rate <= 0.0 {
            return 0.0;
        }

        match surface {
            ApiSurface::Rest => {
                let watermark = self
                    .settings
                    .low_watermark()
                    .min((estimate.maximum() - 1.0).max(0.0));
                if estimate.available() <= watermark + EPSILON
                    && estimate.available() < estimate.maximum()
                {
                    (watermark + 1.0 - estimate.available()) / rate
                } else {
                    0.0
                }
            }
            ApiSurface::Graphql => {
                let needed = cost.min(estimate.maximum());
                if estimate.available() + EPSILON < needed {
                    (needed - estimate.available()) / rate
                } else {
                    0.0
                }
            }
        }
    }
}
