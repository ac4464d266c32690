//! In-memory media store for testing and development

use crate::{DeleteOutcome, MediaStore, Result, StoredMedia};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;

/// An in-memory media store
#[derive(Clone, Default)]
pub struct MemoryMediaStore {
    objects: Arc<DashMap<String, Bytes>>,
}

impl MemoryMediaStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self {
            objects: Arc::new(DashMap::new()),
        }
    }

    /// Get the number of objects stored
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Check whether an object exists
    pub fn contains(&self, public_id: &str) -> bool {
        self.objects.contains_key(public_id)
    }

    /// Fetch stored bytes
    pub fn get(&self, public_id: &str) -> Option<Bytes> {
        self.objects.get(public_id).map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, path: &Path) -> Result<StoredMedia> {
        let data = tokio::fs::read(path).await?;
        let public_id = uuid::Uuid::new_v4().simple().to_string();
        self.objects.insert(public_id.clone(), Bytes::from(data));

        Ok(StoredMedia {
            url: format!("memory://{}", public_id),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<DeleteOutcome> {
        Ok(match self.objects.remove(public_id) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}
