use serde::{Deserialize, Serialize};

use crate::{BackendConfig, StoreError};

/// Where the document store lives: a connection string and a database name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection string, e.g. `memory://` or `redb:///var/lib/chartdeck.redb`.
    pub url: String,
    /// Namespace for collections inside the backend.
    pub database: String,
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.url.trim().is_empty() {
            return Err(StoreError::config("database url is empty"));
        }
        BackendConfig::from_url(&self.url)?;
        let name = self.database.trim();
        if name.is_empty() {
            return Err(StoreError::config("database name is empty"));
        }
        if name.contains(|c: char| c == '.' || c == '#') {
            return Err(StoreError::config(format!(
                "database name '{name}' must not contain '.' or '#'"
            )));
        }
        Ok(())
    }
}
