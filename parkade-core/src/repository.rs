use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Document keys used by the service.
pub mod keys {
    pub const PARKING_DATA: &str = "parkingdata";
    pub const BOOKINGS: &str = "bookings";
    pub const PAYMENTS: &str = "payments";
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Whole-document key-value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// `None` when nothing has been stored under `key` yet.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Reads and decodes a document, falling back to `T::default()` when absent.
pub async fn load_document<T>(store: &dyn KeyValueStore, key: &str) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    match store.get(key).await? {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => Ok(T::default()),
    }
}

pub async fn save_document<T>(store: &dyn KeyValueStore, key: &str, document: &T) -> Result<(), StoreError>
where
    T: Serialize + Sync,
{
    let value = serde_json::to_value(document)?;
    store.put(key, value).await
}
