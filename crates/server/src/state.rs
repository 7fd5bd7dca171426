use crate::config::ServerConfig;
use crate::error::ServerResult;
use std::sync::Arc;
use store::DocumentStore;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Store handle, opened once at startup and closed on shutdown
    pub store: DocumentStore,
}

impl ServerState {
    /// Open the configured store and build the state around it.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = DocumentStore::open(&config.store_config())?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: ServerConfig, store: DocumentStore) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}
