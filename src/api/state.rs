//! API server state

use std::sync::Arc;

use crate::catalog::{DocumentStore, ItemStore};
use crate::storage::StorageBackend;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Item store shared by every handler
    pub store: Arc<dyn ItemStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Create state backed by a document store on `storage`
    pub fn with_storage(storage: Arc<dyn StorageBackend>) -> Self {
        Self::new(Arc::new(DocumentStore::new(storage)))
    }
}
