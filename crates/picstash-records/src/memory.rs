//! In-memory record store for testing and development

use crate::{ImageRecord, ImageRecordStore, ListQuery, NewImageRecord, Page, RecordError, Result, SortDirection, SortField};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

/// An in-memory record store
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<DashMap<Uuid, ImageRecord>>,
    /// Unique index on `public_id`
    public_ids: Arc<DashMap<String, Uuid>>,
}

impl MemoryRecordStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            public_ids: Arc::new(DashMap::new()),
        }
    }

    /// Get the number of records stored
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert a fully-formed record, keeping its id and timestamps
    pub fn insert(&self, record: ImageRecord) {
        self.public_ids.insert(record.public_id.clone(), record.id);
        self.records.insert(record.id, record);
    }

    fn compare(sort: SortField, a: &ImageRecord, b: &ImageRecord) -> Ordering {
        let primary = match sort {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Url => a.url.cmp(&b.url),
            SortField::PublicId => a.public_id.cmp(&b.public_id),
            SortField::UploadedBy => a.uploaded_by.cmp(&b.uploaded_by),
            SortField::Id => Ordering::Equal,
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

#[async_trait]
impl ImageRecordStore for MemoryRecordStore {
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord> {
        match self.public_ids.entry(record.public_id.clone()) {
            Entry::Occupied(_) => Err(RecordError::Duplicate(record.public_id)),
            Entry::Vacant(slot) => {
                let record = record.into_record();
                slot.insert(record.id);
                self.records.insert(record.id, record.clone());
                Ok(record)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ImageRecord>> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        match self.records.remove(&id) {
            Some((_, record)) => {
                self.public_ids.remove_if(&record.public_id, |_, owner| *owner == id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, query: ListQuery) -> Result<Page> {
        let mut items: Vec<ImageRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let total = items.len() as u64;

        items.sort_by(|a, b| {
            let ord = Self::compare(query.sort, a, b);
            match query.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });

        let items = items
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .collect();

        Ok(Page { items, total })
    }
}
