//! # Chartdeck Store
//!
//! Document persistence for uploaded datasets and status checks.
//!
//! [`DocumentStore`] is the entry point. It serializes records to JSON and
//! hands the bytes to a pluggable [`StoreBackend`]:
//!
//! - [`InMemoryBackend`]: ephemeral, for tests and local runs.
//! - [`RedbBackend`]: a single-file embedded database (feature `backend-redb`).
//!
//! The backend is chosen from a connection string ([`BackendConfig::from_url`]).
//! Callers depend on the async [`DatasetStore`] and [`StatusLog`] traits, so
//! handlers can be exercised against any implementation.
//!
//! ```
//! use store::{DatasetStore, DocumentStore, StoreConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = DocumentStore::open(&StoreConfig::new("memory://", "charts")).unwrap();
//! assert!(store.find_dataset("nope").await.unwrap().is_none());
//! # });
//! ```

mod backend;
mod config;
mod documents;
mod error;
mod store;

#[cfg(feature = "backend-redb")]
pub use crate::backend::RedbBackend;
pub use crate::backend::{BackendConfig, InMemoryBackend, StoreBackend};
pub use crate::config::StoreConfig;
pub use crate::documents::{StatusRecord, DATASETS, STATUS_CHECKS};
pub use crate::error::StoreError;
pub use crate::store::{DatasetStore, DocumentStore, StatusLog};
