//! PostgreSQL record store

use crate::{ImageRecord, ImageRecordStore, ListQuery, NewImageRecord, Page, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS images (
        id UUID PRIMARY KEY,
        url TEXT NOT NULL,
        public_id TEXT NOT NULL UNIQUE,
        uploaded_by TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS images_created_at_idx ON images (created_at)",
];

const COLUMNS: &str = "id, url, public_id, uploaded_by, created_at, updated_at";

/// Connection settings for [`PgRecordStore`]
#[derive(Clone, Debug)]
pub struct PgStoreConfig {
    /// Connection string
    pub url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

impl PgStoreConfig {
    /// Create a config with default pool sizing
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// Image records stored in PostgreSQL
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Connect and make sure the schema exists
    pub async fn connect(config: &PgStoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        info!("Connected to PostgreSQL database");

        let store = Self::from_pool(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `images` table and its index if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn list_sql(query: &ListQuery) -> String {
        let direction = query.direction.as_sql();
        format!(
            "SELECT {} FROM images ORDER BY {} {}, id {} LIMIT $1 OFFSET $2",
            COLUMNS,
            query.sort.column(),
            direction,
            direction
        )
    }
}

#[async_trait]
impl ImageRecordStore for PgRecordStore {
    #[instrument(skip(self, record), fields(public_id = %record.public_id))]
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord> {
        let record = record.into_record();

        let created = sqlx::query_as::<_, ImageRecord>(&format!(
            "INSERT INTO images ({}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COLUMNS, COLUMNS
        ))
        .bind(record.id)
        .bind(&record.url)
        .bind(&record.public_id)
        .bind(&record.uploaded_by)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ImageRecord>> {
        let record = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {} FROM images WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list(&self, query: ListQuery) -> Result<Page> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, ImageRecord>(&Self::list_sql(&query))
            .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(query.skip).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total: total.max(0) as u64,
        })
    }
}
