use thiserror::Error;

/// Errors raised by the document store and its backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A document with this key already exists in the collection.
    #[error("duplicate key '{0}'")]
    DuplicateKey(String),

    #[error("invalid store configuration: {0}")]
    Config(String),

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        StoreError::Config(msg.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
