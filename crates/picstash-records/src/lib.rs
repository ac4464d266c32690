//! # Picstash Records
//!
//! Metadata storage for uploaded images.
//!
//! Each [`ImageRecord`] points at one object in the media store through its
//! `public_id` and remembers which identity uploaded it. Two backends are
//! provided behind the [`ImageRecordStore`] trait:
//! - **PostgreSQL** via sqlx, for real deployments
//! - **Memory** via DashMap, for tests and development
//!
//! Listing returns a page plus the total record count. Count and fetch are
//! two separate statements; no transaction spans them.

pub mod error;
pub mod flexible;
pub mod memory;
pub mod postgres;

pub use error::{RecordError, Result};
pub use flexible::FlexibleRecordStore;
pub use memory::MemoryRecordStore;
pub use postgres::{PgRecordStore, PgStoreConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored image metadata
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Generated record id
    pub id: Uuid,
    /// Externally resolvable URL
    pub url: String,
    /// Media store reference, required for deletion
    pub public_id: String,
    /// User id of the uploader; never changes after creation
    pub uploaded_by: String,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when creating a record
#[derive(Clone, Debug)]
pub struct NewImageRecord {
    pub url: String,
    pub public_id: String,
    pub uploaded_by: String,
}

impl NewImageRecord {
    /// Stamp the new record with an id and timestamps
    pub fn into_record(self) -> ImageRecord {
        let now = Utc::now();
        ImageRecord {
            id: Uuid::new_v4(),
            url: self.url,
            public_id: self.public_id,
            uploaded_by: self.uploaded_by,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sortable record fields
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Url,
    PublicId,
    UploadedBy,
    Id,
}

impl SortField {
    /// Parse a client-facing field name, falling back to `createdAt`
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("createdAt") | None => Self::CreatedAt,
            Some("updatedAt") => Self::UpdatedAt,
            Some("url") => Self::Url,
            Some("publicId") => Self::PublicId,
            Some("uploadedBy") => Self::UploadedBy,
            Some("id") | Some("_id") => Self::Id,
            Some(other) => {
                tracing::debug!(sort_by = %other, "Unknown sort field, using createdAt");
                Self::CreatedAt
            }
        }
    }

    /// Column name in the `images` table
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Url => "url",
            Self::PublicId => "public_id",
            Self::UploadedBy => "uploaded_by",
            Self::Id => "id",
        }
    }
}

/// Sort direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    /// `asc` selects ascending; anything else, including absence, descending
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("asc") => Self::Ascending,
            _ => Self::Descending,
        }
    }

    /// SQL keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Page request for [`ImageRecordStore::list`]
#[derive(Clone, Copy, Debug)]
pub struct ListQuery {
    pub skip: u64,
    pub limit: u64,
    pub sort: SortField,
    pub direction: SortDirection,
}

/// One page of records plus the total count
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub items: Vec<ImageRecord>,
    pub total: u64,
}

/// Trait for image record backends
#[async_trait]
pub trait ImageRecordStore: Send + Sync {
    /// Insert a new record
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord>;

    /// Look up a record by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ImageRecord>>;

    /// Remove a record; returns whether one existed
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;

    /// Fetch a sorted page and the total record count
    async fn list(&self, query: ListQuery) -> Result<Page>;
}
