//! Credentials and credential lookup.
//!
//! A [`Credential`] is the `(app, shop, token)` triple that authorizes
//! requests and partitions throttling state. The runtime only ever *reads*
//! credentials through the [`CredentialStore`] trait; populating the store is
//! the application's job.
//!
//! [`CachedCredentialStore`] is a read-mostly in-memory implementation with
//! pluggable [`Initializer`] and [`Persister`] strategies, for applications
//! that keep credentials in a database and want write-through caching.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopify_runtime::credentials::{CachedCredentialStore, Credential, CredentialStore};
//! use shopify_runtime::{AccessToken, ShopDomain};
//!
//! let store = CachedCredentialStore::new();
//! let shop = ShopDomain::new("my-store")?;
//! store
//!     .insert(Credential::new("exporter", shop.clone(), AccessToken::new("shpat_1")?)?)
//!     .await?;
//!
//! let credential = store.lookup("exporter", &shop).await?;
//! assert_eq!(credential.app_name(), "exporter");
//! ```

mod credential;
mod store;

pub use credential::Credential;
pub use store::{CachedCredentialStore, CredentialError, CredentialStore, Initializer, Persister};
