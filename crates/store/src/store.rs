use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tabular::DatasetRecord;
use tracing::{debug, info};

use crate::backend::{BackendConfig, InMemoryBackend, StoreBackend};
use crate::documents::{StatusRecord, DATASETS, STATUS_CHECKS};
use crate::{StoreConfig, StoreError};

/// Persistence for uploaded datasets.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Persist a record and return the id it can be fetched under.
    async fn insert_dataset(&self, record: &DatasetRecord) -> Result<String, StoreError>;
    /// Fetch a record by exact id.
    async fn find_dataset(&self, id: &str) -> Result<Option<DatasetRecord>, StoreError>;
}

/// Append-only log of status checks.
#[async_trait]
pub trait StatusLog: Send + Sync {
    async fn append_status(&self, record: &StatusRecord) -> Result<(), StoreError>;
    /// Up to `limit` entries, oldest first.
    async fn list_status(&self, limit: usize) -> Result<Vec<StatusRecord>, StoreError>;
}

/// Document store over a [`StoreBackend`].
///
/// Records are stored as JSON documents in collections namespaced by the
/// database name (`<database>.<collection>`). Backend calls are blocking and
/// run on tokio's blocking pool.
#[derive(Clone)]
pub struct DocumentStore {
    database: String,
    backend: Arc<dyn StoreBackend>,
}

impl DocumentStore {
    /// Open the backend named by `config.url`.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let backend_config = BackendConfig::from_url(&config.url)?;
        let backend = backend_config.build()?;
        info!(database = %config.database, backend = ?backend_config, "store_opened");
        Ok(Self::with_backend(config.database.clone(), Arc::from(backend)))
    }

    pub fn with_backend(database: impl Into<String>, backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            database: database.into(),
            backend,
        }
    }

    pub fn in_memory(database: impl Into<String>) -> Self {
        Self::with_backend(database, Arc::new(InMemoryBackend::new()))
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn collection(&self, name: &str) -> String {
        format!("{}.{}", self.database, name)
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StoreBackend) -> Result<T, StoreError> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || f(backend.as_ref()))
            .await
            .map_err(|e| StoreError::backend(format!("blocking task failed: {e}")))?
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.run_blocking(|backend| backend.ping()).await
    }

    /// Release the backend. Every later operation fails with [`StoreError::Closed`].
    pub async fn close(&self) -> Result<(), StoreError> {
        self.run_blocking(|backend| backend.close()).await?;
        info!(database = %self.database, "store_closed");
        Ok(())
    }
}

#[async_trait]
impl DatasetStore for DocumentStore {
    async fn insert_dataset(&self, record: &DatasetRecord) -> Result<String, StoreError> {
        let start = Instant::now();
        let bytes = serde_json::to_vec(record)?;
        let collection = self.collection(DATASETS);
        let id = record.id.clone();

        let stored_id = self
            .run_blocking(move |backend| {
                backend.insert(&collection, &id, &bytes)?;
                Ok(id)
            })
            .await?;

        debug!(
            id = %stored_id,
            rows = record.row_count(),
            elapsed_micros = start.elapsed().as_micros(),
            "dataset_inserted"
        );
        Ok(stored_id)
    }

    async fn find_dataset(&self, id: &str) -> Result<Option<DatasetRecord>, StoreError> {
        let collection = self.collection(DATASETS);
        let id = id.to_string();
        let bytes = self
            .run_blocking(move |backend| backend.get(&collection, &id))
            .await?;
        bytes
            .map(|b| serde_json::from_slice(&b).map_err(StoreError::from))
            .transpose()
    }
}

#[async_trait]
impl StatusLog for DocumentStore {
    async fn append_status(&self, record: &StatusRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record)?;
        let collection = self.collection(STATUS_CHECKS);
        let id = record.id.clone();
        self.run_blocking(move |backend| backend.insert(&collection, &id, &bytes))
            .await
    }

    async fn list_status(&self, limit: usize) -> Result<Vec<StatusRecord>, StoreError> {
        let collection = self.collection(STATUS_CHECKS);
        self.run_blocking(move |backend| {
            let mut records: Vec<StatusRecord> = Vec::new();
            backend.scan(&collection, limit, &mut |doc: &[u8]| {
                records.push(serde_json::from_slice(doc)?);
                Ok(())
            })?;
            Ok(records)
        })
        .await
    }
}
