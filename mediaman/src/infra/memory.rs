use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::storage::{KeyValueStore, StorageError};

/// Ephemeral in-process store. Nothing survives the session.
#[derive(Default)]
pub struct MemoryStore {
    stores: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_stores<R>(
        &self,
        f: impl FnOnce(&mut HashMap<String, HashMap<String, String>>) -> R,
    ) -> Result<R, StorageError> {
        let mut guard = self
            .stores
            .lock()
            .map_err(|_| StorageError::Database("memory store lock poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, store: &str, key: &str) -> Result<Option<String>, StorageError> {
        self.with_stores(|s| s.get(store).and_then(|m| m.get(key)).cloned())
    }

    async fn set_item(&self, store: &str, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_stores(|s| {
            s.entry(store.to_string())
                .or_default()
                .insert(key.to_string(), value.to_string());
        })
    }

    async fn remove_item(&self, store: &str, key: &str) -> Result<(), StorageError> {
        self.with_stores(|s| {
            if let Some(m) = s.get_mut(store) {
                m.remove(key);
            }
        })
    }

    async fn keys(&self, store: &str) -> Result<Vec<String>, StorageError> {
        self.with_stores(|s| {
            s.get(store)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default()
        })
    }
}
