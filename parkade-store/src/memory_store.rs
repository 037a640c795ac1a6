use async_trait::async_trait;
use parkade_core::{KeyValueStore, StoreError};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
    failing_writes: RwLock<HashMap<String, u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` writes to `key` fail with `StoreError::Unavailable`.
    pub async fn fail_next_writes(&self, key: &str, count: u32) {
        self.failing_writes.write().await.insert(key.to_string(), count);
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        {
            let mut failing = self.failing_writes.write().await;
            if let Some(remaining) = failing.get_mut(key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(StoreError::Unavailable(format!("write to {} rejected", key)));
                }
            }
        }

        self.documents.write().await.insert(key.to_string(), value);
        Ok(())
    }
}
