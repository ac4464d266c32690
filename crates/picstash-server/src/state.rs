//! Application state

use crate::config::ServerConfig;
use anyhow::{bail, Context};
use picstash_core::ImageService;
use picstash_media::{CloudinaryConfig, CloudinaryStore, FlexibleMediaStore, MemoryMediaStore};
use picstash_records::{FlexibleRecordStore, MemoryRecordStore, PgRecordStore, PgStoreConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Image pipelines over the stores chosen at startup
pub type Images = ImageService<FlexibleMediaStore, FlexibleRecordStore>;

/// Application state shared across handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Upload, listing and deletion pipelines
    pub images: Images,
}

impl AppState {
    /// Create a new application state, connecting the configured stores
    pub async fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let (media, records) = if config.use_memory_store {
            info!("Using in-memory stores (data will not persist)");
            (
                FlexibleMediaStore::Memory(MemoryMediaStore::new()),
                FlexibleRecordStore::Memory(MemoryRecordStore::new()),
            )
        } else {
            let media = Self::create_cloudinary_store(&config)?;
            info!(cloud = %media.config().cloud_name, "Cloudinary media store configured");
            let records = Self::create_pg_store(&config).await?;
            (
                FlexibleMediaStore::Cloudinary(media),
                FlexibleRecordStore::Postgres(records),
            )
        };

        if media.is_persistent() && records.is_persistent() {
            info!("✓ Storage mode: Cloudinary + PostgreSQL (persistent)");
        } else {
            warn!("⚠ Storage mode: In-memory (NOT persistent - for development only)");
        }

        Self::with_stores(config, media, records)
    }

    /// Build state around already-constructed stores
    pub fn with_stores(
        config: ServerConfig,
        media: FlexibleMediaStore,
        records: FlexibleRecordStore,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.upload_dir).with_context(|| {
            format!("creating upload directory {}", config.upload_dir.display())
        })?;

        Ok(Self {
            images: ImageService::new(Arc::new(media), Arc::new(records)),
            config,
        })
    }

    fn create_cloudinary_store(config: &ServerConfig) -> anyhow::Result<CloudinaryStore> {
        let mut cloudinary = match (
            &config.cloudinary_url,
            &config.cloudinary_cloud_name,
            &config.cloudinary_api_key,
            &config.cloudinary_api_secret,
        ) {
            (Some(url), _, _, _) => CloudinaryConfig::from_url(url)?,
            (None, Some(cloud), Some(key), Some(secret)) => CloudinaryConfig::new(cloud, key, secret),
            _ => bail!(
                "Cloudinary is not configured: set CLOUDINARY_URL or \
                 CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET"
            ),
        };

        if let Some(folder) = &config.cloudinary_folder {
            cloudinary = cloudinary.with_folder(folder);
        }
        cloudinary = cloudinary.with_timeout(Duration::from_secs(config.media_timeout_secs));

        Ok(CloudinaryStore::new(cloudinary)?)
    }

    async fn create_pg_store(config: &ServerConfig) -> anyhow::Result<PgRecordStore> {
        let Some(url) = &config.database_url else {
            bail!("DATABASE_URL is not set");
        };

        let mut pg = PgStoreConfig::new(url);
        pg.max_connections = config.db_max_connections;

        PgRecordStore::connect(&pg)
            .await
            .context("connecting to PostgreSQL")
    }
}
