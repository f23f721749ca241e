use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::ShopDomain;
use crate::credentials::Credential;

/// Errors returned by credential lookups and store backends.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credential is registered for this app and shop.
    #[error("No credential found for app '{app_name}' on shop '{shop}'")]
    NotFound {
        /// The app that was looked up.
        app_name: String,
        /// The shop that was looked up.
        shop: ShopDomain,
    },

    /// The backing store failed.
    #[error("Credential backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Read access to credentials.
///
/// The runtime never writes credentials, so read-only backends (for example
/// a replica database) are valid implementations.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Looks up the credential for `app_name` on `shop`.
    async fn lookup(&self, app_name: &str, shop: &ShopDomain)
        -> Result<Credential, CredentialError>;
}

/// Loads the initial cache contents, typically from a database.
#[async_trait]
pub trait Initializer: Send + Sync {
    /// Returns every credential the cache should start with.
    async fn load(&self) -> Result<Vec<Credential>, CredentialError>;
}

/// Persists a credential before it becomes visible in the cache.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Writes `credential` to the backing store.
    async fn persist(&self, credential: &Credential) -> Result<(), CredentialError>;
}

type CacheKey = (String, ShopDomain);

/// In-memory credential cache with optional write-through persistence.
///
/// Lookups take a shared read lock; inserts take the write lock only after
/// the persister has accepted the credential, so a failed write never
/// becomes visible to readers.
#[derive(Default)]
pub struct CachedCredentialStore {
    entries: RwLock<HashMap<CacheKey, Credential>>,
    persister: Option<Arc<dyn Persister>>,
}

impl std::fmt::Debug for CachedCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCredentialStore")
            .field("has_persister", &self.persister.is_some())
            .finish_non_exhaustive()
    }
}

impl CachedCredentialStore {
    /// Creates an empty, memory-only store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded by `initializer` that writes through to
    /// `persister` on every insert.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by the initializer.
    pub async fn with_strategies(
        initializer: &dyn Initializer,
        persister: Option<Arc<dyn Persister>>,
    ) -> Result<Self, CredentialError> {
        let loaded = initializer.load().await?;
        tracing::debug!(count = loaded.len(), "Loaded credentials into cache");

        let entries = loaded
            .into_iter()
            .map(|credential| (Self::key_of(&credential), credential))
            .collect();

        Ok(Self {
            entries: RwLock::new(entries),
            persister,
        })
    }

    /// Persists (if configured) and caches `credential`, replacing any
    /// previous credential for the same app and shop.
    ///
    /// # Errors
    ///
    /// Returns the persister's error; the cache is left unchanged.
    pub async fn insert(&self, credential: Credential) -> Result<(), CredentialError> {
        if let Some(persister) = &self.persister {
            persister.persist(&credential).await?;
        }
        let key = Self::key_of(&credential);
        self.entries.write().await.insert(key, credential);
        Ok(())
    }

    /// Returns the number of cached credentials.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if no credentials are cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn key_of(credential: &Credential) -> CacheKey {
        (credential.app_name().to_string(), credential.shop().clone())
    }
}

#[async_trait]
impl CredentialStore for CachedCredentialStore {
    async fn lookup(
        &self,
        app_name: &str,
        shop: &ShopDomain,
    ) -> Result<Credential, CredentialError> {
        let key = (app_name.to_string(), shop.clone());
        self.entries
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| CredentialError::NotFound {
                app_name: app_name.to_string(),
                shop: shop.clone(),
            })
    }
}
