use async_trait::async_trait;
use thiserror::Error;

/// Name of the physical data store shared by every media type.
pub const STORE_NAME: &str = "mediaMan";
/// Static schema tag; bump when the record layout changes.
pub const STORE_VERSION: u32 = 1;
pub const STORE_DESCRIPTION: &str = "MediaMan data store";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Data corruption: {0}")]
    Corruption(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Local key-value engine, partitioned into named stores.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, store: &str, key: &str) -> Result<Option<String>, StorageError>;
    async fn set_item(&self, store: &str, key: &str, value: &str) -> Result<(), StorageError>;
    async fn remove_item(&self, store: &str, key: &str) -> Result<(), StorageError>;
    async fn keys(&self, store: &str) -> Result<Vec<String>, StorageError>;
}
