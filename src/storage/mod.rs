//! Storage abstraction layer
//!
//! Provides a unified keyed-blob interface for the local filesystem and an
//! in-process memory backend

use async_trait::async_trait;
use bytes::Bytes;

use crate::Result;

pub mod local;
pub mod memory;

/// Storage backend trait
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read object from storage, `Error::NotFound` if the key is absent
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Write object to storage
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;

    /// Delete object from storage, a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if object exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// List objects with prefix
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Local { root_path: String },
    Memory,
}

/// Create storage backend from config
pub fn create_storage(config: StorageConfig) -> Result<Box<dyn StorageBackend>> {
    match config {
        StorageConfig::Local { root_path } => {
            let backend = local::LocalStorage::new(root_path)?;
            Ok(Box::new(backend))
        }
        StorageConfig::Memory => Ok(Box::new(memory::MemoryStorage::new())),
    }
}
