//! Item catalog
//!
//! The document store the HTTP layer talks to. Each handler performs exactly
//! one of these operations; there is no cross-call locking, so concurrent
//! updates to the same item are last-write-wins.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;

use crate::storage::StorageBackend;
use crate::types::{Item, ItemId, ItemUpdate, NewItem};
use crate::{Error, Result};

/// Key prefix under which item documents are stored
const ITEMS_PREFIX: &str = "items";

/// Document store operations over items
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Persist a new item under a freshly generated id
    async fn create(&self, fields: NewItem) -> Result<Item>;

    /// Return up to `limit` items in store order
    async fn find(&self, limit: usize) -> Result<Vec<Item>>;

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<Item>>;

    /// Apply `update` and return the updated item, `None` if `id` is absent
    async fn find_by_id_and_update(
        &self,
        id: &ItemId,
        update: ItemUpdate,
    ) -> Result<Option<Item>>;

    /// Remove the item and return it, `None` if it was already absent
    async fn find_by_id_and_remove(&self, id: &ItemId) -> Result<Option<Item>>;
}

/// Item store persisting one JSON document per item on a storage backend
pub struct DocumentStore {
    storage: Arc<dyn StorageBackend>,
}

impl DocumentStore {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    fn item_key(id: &ItemId) -> String {
        format!("{}/{}.json", ITEMS_PREFIX, id)
    }

    /// Read one document; a key that is gone by the time it is read is `None`
    async fn load(&self, key: &str) -> Result<Option<Item>> {
        let data = match self.storage.get(key).await {
            Ok(data) => data,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let item = serde_json::from_slice(&data)?;
        Ok(Some(item))
    }

    async fn save(&self, item: &Item) -> Result<()> {
        let data = serde_json::to_vec(item)?;
        self.storage
            .put(&Self::item_key(&item.id), Bytes::from(data))
            .await
    }
}

#[async_trait]
impl ItemStore for DocumentStore {
    async fn create(&self, fields: NewItem) -> Result<Item> {
        let item = Item::new(ItemId::generate(), fields);
        self.save(&item).await?;

        tracing::debug!(id = %item.id, "Created item");
        Ok(item)
    }

    async fn find(&self, limit: usize) -> Result<Vec<Item>> {
        let keys = self.storage.list(ITEMS_PREFIX).await?;

        let mut items = Vec::with_capacity(limit.min(keys.len()));
        for key in keys.iter().filter(|k| k.ends_with(".json")) {
            if items.len() >= limit {
                break;
            }
            // A concurrent delete may remove a listed key before it is read
            if let Some(item) = self.load(key).await? {
                items.push(item);
            }
        }

        Ok(items)
    }

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<Item>> {
        self.load(&Self::item_key(id)).await
    }

    async fn find_by_id_and_update(
        &self,
        id: &ItemId,
        update: ItemUpdate,
    ) -> Result<Option<Item>> {
        let Some(mut item) = self.load(&Self::item_key(id)).await? else {
            return Ok(None);
        };

        if !update.is_empty() {
            update.apply(&mut item);
            item.revision += 1;
            item.updated_at = Utc::now();
            self.save(&item).await?;
            tracing::debug!(id = %item.id, revision = item.revision, "Updated item");
        }

        Ok(Some(item))
    }

    async fn find_by_id_and_remove(&self, id: &ItemId) -> Result<Option<Item>> {
        let key = Self::item_key(id);
        let Some(item) = self.load(&key).await? else {
            return Ok(None);
        };

        self.storage.delete(&key).await?;
        tracing::debug!(id = %item.id, "Removed item");
        Ok(Some(item))
    }
}
