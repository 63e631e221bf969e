use alert_core::CoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub mod repository;
pub mod sqlite;


pub use repository::{LedgerRepository, SettingsRepository, SEEN_POSTS_KEY};
pub use sqlite::SqliteStore;

/// Key-value persistence with JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), CoreError>;

    async fn remove(&self, key: &str) -> Result<(), CoreError>;

    /// Reads several keys at once; absent keys are left out of the result.
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>, CoreError> {
        let mut out = HashMap::new();
        for key in keys {
            if let Some(value) = self.get(key).await? {
                out.insert((*key).to_string(), value);
            }
        }
        Ok(out)
    }

    async fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), CoreError> {
        for (key, value) in entries {
            self.set(&key, value).await?;
        }
        Ok(())
    }
}

/// Store kept entirely in memory; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CoreError> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
