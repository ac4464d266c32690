//! Runtime-selected media store

use crate::{CloudinaryStore, DeleteOutcome, MediaStore, MemoryMediaStore, Result, StoredMedia};
use async_trait::async_trait;
use std::path::Path;

/// Media store chosen at startup
pub enum FlexibleMediaStore {
    /// Cloudinary REST API
    Cloudinary(CloudinaryStore),
    /// In-memory storage (development)
    Memory(MemoryMediaStore),
}

impl FlexibleMediaStore {
    /// Check if objects outlive the process
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Cloudinary(_))
    }
}

#[async_trait]
impl MediaStore for FlexibleMediaStore {
    async fn upload(&self, path: &Path) -> Result<StoredMedia> {
        match self {
            Self::Cloudinary(store) => store.upload(path).await,
            Self::Memory(store) => store.upload(path).await,
        }
    }

    async fn delete(&self, public_id: &str) -> Result<DeleteOutcome> {
        match self {
            Self::Cloudinary(store) => store.delete(public_id).await,
            Self::Memory(store) => store.delete(public_id).await,
        }
    }
}
