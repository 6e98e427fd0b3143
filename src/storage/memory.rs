//! In-memory storage backend

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::{Error, Result};

use super::StorageBackend;

/// Process-local storage, contents are lost on restart
#[derive(Default)]
pub struct MemoryStorage {
    objects: DashMap<String, Bytes>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Bytes> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        self.objects.insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
