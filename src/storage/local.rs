//! Local filesystem storage backend

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs;

use uuid::Uuid;

use crate::{Error, Result};

use super::StorageBackend;

/// Local filesystem storage, one file per key
pub struct LocalStorage {
    root_path: PathBuf,
}

impl LocalStorage {
    pub fn new(root_path: impl Into<PathBuf>) -> Result<Self> {
        let root_path = root_path.into();
        std::fs::create_dir_all(&root_path)?;
        Ok(Self { root_path })
    }

    fn resolve_path(&self, key: &str) -> PathBuf {
        self.root_path.join(key)
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.resolve_path(key);
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.resolve_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so readers never see a half-written document.
        // Each write gets its own temp file; concurrent writers to one key
        // must not share it.
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::storage(format!("invalid key: {key}")))?;
        let tmp_path = path.with_file_name(format!("{}.{}.tmp", file_name, Uuid::new_v4()));
        fs::write(&tmp_path, &data).await?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve_path(key);
        Ok(fs::try_exists(&path).await?)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix_path = self.resolve_path(prefix);
        let mut results = Vec::new();

        if !fs::try_exists(&prefix_path).await? {
            return Ok(results);
        }

        let mut entries = fs::read_dir(&prefix_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "tmp") {
                continue;
            }
            if let Ok(relative) = path.strip_prefix(&self.root_path) {
                if let Some(s) = relative.to_str() {
                    results.push(s.to_string());
                }
            }
        }

        Ok(results)
    }
}
