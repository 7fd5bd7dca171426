use crate::StoreError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Trait for a document storage backend.
///
/// Documents are opaque byte blobs grouped into named collections and keyed
/// by a string id. Backends must remember insertion order per collection so
/// listings come back oldest first.
pub trait StoreBackend: Send + Sync {
    /// Insert a new document. Fails with [`StoreError::DuplicateKey`] if the
    /// key is already present; documents are never overwritten.
    fn insert(&self, collection: &str, key: &str, value: &[u8]) -> Result<(), StoreError>;
    /// Retrieve a document by exact key.
    fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Visit up to `limit` documents of a collection in insertion order.
    fn scan(
        &self,
        collection: &str,
        limit: usize,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
    /// Cheap liveness check.
    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
    /// Release underlying resources. Later calls fail with [`StoreError::Closed`].
    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Configuration for selecting and building a backend.
///
/// Parsed from a connection string:
///
/// ```
/// use store::BackendConfig;
///
/// assert_eq!(BackendConfig::from_url("memory://").unwrap(), BackendConfig::InMemory);
/// assert_eq!(
///     BackendConfig::from_url("redb:///data/chartdeck.redb").unwrap(),
///     BackendConfig::redb("/data/chartdeck.redb"),
/// );
/// assert!(BackendConfig::from_url("postgres://localhost").is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Redb file at `path`. Requires the `backend-redb` feature (on by default).
    Redb { path: String },
    /// In-process map. Nothing survives a restart.
    #[default]
    InMemory,
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    /// Parse a connection string: `memory://`, `redb://<path>` or `file://<path>`.
    pub fn from_url(url: &str) -> Result<Self, StoreError> {
        let url = url.trim();
        if url == "memory" || url == "memory://" {
            return Ok(BackendConfig::InMemory);
        }
        let path = url
            .strip_prefix("redb://")
            .or_else(|| url.strip_prefix("file://"));
        match path {
            Some(path) if !path.is_empty() => Ok(BackendConfig::redb(path)),
            Some(_) => Err(StoreError::config(format!("missing file path in '{url}'"))),
            None => Err(StoreError::config(format!(
                "unsupported connection string '{url}' (expected memory://, redb://<path> or file://<path>)"
            ))),
        }
    }

    /// Build the backend this configuration names.
    pub fn build(&self) -> Result<Box<dyn StoreBackend>, StoreError> {
        match self {
            BackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(StoreError::config("redb backend disabled at compile time"))
                }
            }
        }
    }
}

#[derive(Default)]
struct Collection {
    order: Vec<String>,
    docs: HashMap<String, Vec<u8>>,
}

/// An in-memory backend using a `RwLock` around per-collection maps.
pub struct InMemoryBackend {
    collections: RwLock<Option<HashMap<String, Collection>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(Some(HashMap::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreBackend for InMemoryBackend {
    fn insert(&self, collection: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut guard = self
            .collections
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        let collections = guard.as_mut().ok_or(StoreError::Closed)?;
        let coll = collections.entry(collection.to_string()).or_default();

        if coll.docs.contains_key(key) {
            return Err(StoreError::DuplicateKey(key.to_string()));
        }
        coll.order.push(key.to_string());
        coll.docs.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self
            .collections
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        let collections = guard.as_ref().ok_or(StoreError::Closed)?;
        Ok(collections
            .get(collection)
            .and_then(|coll| coll.docs.get(key))
            .cloned())
    }

    fn scan(
        &self,
        collection: &str,
        limit: usize,
        visitor: &mut dyn FnMut(&[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let guard = self
            .collections
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        let collections = guard.as_ref().ok_or(StoreError::Closed)?;
        let Some(coll) = collections.get(collection) else {
            return Ok(());
        };
        for key in coll.order.iter().take(limit) {
            if let Some(doc) = coll.docs.get(key) {
                visitor(doc)?;
            }
        }
        Ok(())
    }

    fn ping(&self) -> Result<(), StoreError> {
        let guard = self
            .collections
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        guard.as_ref().map(|_| ()).ok_or(StoreError::Closed)
    }

    fn close(&self) -> Result<(), StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .take();
        Ok(())
    }
}

/// The Redb backend implementation.
#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbBackend;
