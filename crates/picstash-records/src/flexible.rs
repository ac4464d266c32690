//! Runtime-selected record store

use crate::{ImageRecord, ImageRecordStore, ListQuery, MemoryRecordStore, NewImageRecord, Page, PgRecordStore, Result};
use async_trait::async_trait;
use uuid::Uuid;

/// Record store chosen at startup
pub enum FlexibleRecordStore {
    /// PostgreSQL
    Postgres(PgRecordStore),
    /// In-memory storage (development)
    Memory(MemoryRecordStore),
}

impl FlexibleRecordStore {
    /// Check if records outlive the process
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Postgres(_))
    }
}

#[async_trait]
impl ImageRecordStore for FlexibleRecordStore {
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord> {
        match self {
            Self::Postgres(store) => store.create(record).await,
            Self::Memory(store) => store.create(record).await,
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ImageRecord>> {
        match self {
            Self::Postgres(store) => store.find_by_id(id).await,
            Self::Memory(store) => store.find_by_id(id).await,
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        match self {
            Self::Postgres(store) => store.delete_by_id(id).await,
            Self::Memory(store) => store.delete_by_id(id).await,
        }
    }

    async fn list(&self, query: ListQuery) -> Result<Page> {
        match self {
            Self::Postgres(store) => store.list(query).await,
            Self::Memory(store) => store.list(query).await,
        }
    }
}
