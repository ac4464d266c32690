//! Upload, listing and deletion pipelines

use crate::error::{PipelineError, Result};
use crate::identity::{Identity, Role};
use crate::policy::{authorize, Requirement};
use picstash_media::{DeleteOutcome, MediaStore};
use picstash_records::{ImageRecord, ImageRecordStore, ListQuery, NewImageRecord, SortDirection, SortField};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Default page number
pub const DEFAULT_PAGE: u64 = 1;

/// Default page size; small on purpose so pagination shows up early
pub const DEFAULT_LIMIT: u64 = 2;

/// Default upper bound for a requested page size
pub const DEFAULT_MAX_LIMIT: u64 = 100;

const ADMIN_REQUIREMENTS: &[Requirement<'static>] = &[Requirement::Role(Role::Admin)];
const LIST_REQUIREMENTS: &[Requirement<'static>] = &[Requirement::Authenticated];

/// Parsed listing parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListRequest {
    pub page: u64,
    pub limit: u64,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort: SortField::default(),
            direction: SortDirection::default(),
        }
    }
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok()).filter(|v| *v > 0)
}

impl ListRequest {
    /// Parse raw query values; invalid or non-positive numbers use defaults
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        sort_by: Option<&str>,
        sort_order: Option<&str>,
        max_limit: u64,
    ) -> Self {
        Self {
            page: positive(page).unwrap_or(DEFAULT_PAGE),
            limit: positive(limit).unwrap_or(DEFAULT_LIMIT).min(max_limit.max(1)),
            sort: SortField::from_param(sort_by),
            direction: SortDirection::from_param(sort_order),
        }
    }

    /// Records to skip before the requested page
    pub fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// A listing page with pagination metadata
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_images: u64,
    pub data: Vec<ImageRecord>,
}

/// Image pipelines over an injected media store and record store
pub struct ImageService<M, R> {
    media: Arc<M>,
    records: Arc<R>,
}

impl<M, R> Clone for ImageService<M, R> {
    fn clone(&self) -> Self {
        Self {
            media: Arc::clone(&self.media),
            records: Arc::clone(&self.records),
        }
    }
}

impl<M: MediaStore, R: ImageRecordStore> ImageService<M, R> {
    /// Create a new service
    pub fn new(media: Arc<M>, records: Arc<R>) -> Self {
        Self { media, records }
    }

    /// Access the media store
    pub fn media(&self) -> &M {
        &self.media
    }

    /// Access the record store
    pub fn records(&self) -> &R {
        &self.records
    }

    /// Upload the temp file at `file` and record it under the caller's id.
    ///
    /// The temp file is removed only after both the upload and the record
    /// write succeed; on any failure it stays on disk.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn upload(&self, identity: &Identity, file: Option<&Path>) -> Result<ImageRecord> {
        authorize(Some(identity), ADMIN_REQUIREMENTS).into_result()?;

        let path = file.ok_or(PipelineError::MissingFile)?;

        let stored = self
            .media
            .upload(path)
            .await
            .map_err(PipelineError::StorageUploadFailed)?;
        debug!(public_id = %stored.public_id, "Stored in media store");

        let public_id = stored.public_id.clone();
        let record = self
            .records
            .create(NewImageRecord {
                url: stored.url,
                public_id: stored.public_id,
                uploaded_by: identity.user_id.clone(),
            })
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    public_id = %public_id,
                    "Record write failed after upload; media object is orphaned"
                );
                e
            })?;

        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(error = %e, path = %path.display(), "Failed to remove temp upload file");
        }

        info!(image_id = %record.id, "Image uploaded");
        Ok(record)
    }

    /// Fetch one page of records
    #[instrument(skip(self, identity))]
    pub async fn list(&self, identity: &Identity, request: ListRequest) -> Result<ListResult> {
        authorize(Some(identity), LIST_REQUIREMENTS).into_result()?;
        let limit = request.limit.max(1);

        let page = self
            .records
            .list(ListQuery {
                skip: request.skip(),
                limit,
                sort: request.sort,
                direction: request.direction,
            })
            .await?;

        Ok(ListResult {
            current_page: request.page,
            total_pages: page.total.div_ceil(limit),
            total_images: page.total,
            data: page.items,
        })
    }

    /// Delete an image owned by the caller.
    ///
    /// The media object is destroyed before the record. If the destroy fails
    /// the record is left alone. If the record delete fails after a
    /// successful destroy, the record points at nothing until reconciled by
    /// hand.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn delete(&self, identity: &Identity, id: &str) -> Result<()> {
        authorize(Some(identity), ADMIN_REQUIREMENTS).into_result()?;

        let image_id = Uuid::parse_str(id).map_err(|_| PipelineError::NotFound(id.to_string()))?;

        let record = self
            .records
            .find_by_id(image_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;

        authorize(
            Some(identity),
            &[Requirement::Role(Role::Admin), Requirement::Owner(&record.uploaded_by)],
        )
        .into_result()?;

        match self
            .media
            .delete(&record.public_id)
            .await
            .map_err(PipelineError::StorageDeleteFailed)?
        {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::NotFound => {
                warn!(public_id = %record.public_id, "Media object already gone, removing record");
            }
        }

        self.records.delete_by_id(image_id).await.map_err(|e| {
            error!(
                error = %e,
                image_id = %image_id,
                public_id = %record.public_id,
                "Media object destroyed but record delete failed; needs reconciliation"
            );
            e
        })?;

        info!(image_id = %image_id, "Image deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DenyReason;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use picstash_media::{MediaError, MemoryMediaStore, StoredMedia};
    use picstash_records::{MemoryRecordStore, Page, RecordError};
    use rstest::rstest;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory media store whose calls can be made to fail
    #[derive(Default)]
    struct FlakyMedia {
        inner: MemoryMediaStore,
        fail_upload: AtomicBool,
        fail_delete: AtomicBool,
    }

    #[async_trait]
    impl MediaStore for FlakyMedia {
        async fn upload(&self, path: &Path) -> picstash_media::Result<StoredMedia> {
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(MediaError::UploadFailed("remote said no".to_string()));
            }
            self.inner.upload(path).await
        }

        async fn delete(&self, public_id: &str) -> picstash_media::Result<DeleteOutcome> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(MediaError::DeleteFailed("remote said no".to_string()));
            }
            self.inner.delete(public_id).await
        }
    }

    /// Record store whose writes always fail
    struct BrokenRecords;

    #[async_trait]
    impl ImageRecordStore for BrokenRecords {
        async fn create(&self, _: NewImageRecord) -> picstash_records::Result<ImageRecord> {
            Err(RecordError::Database("connection reset".to_string()))
        }
        async fn find_by_id(&self, _: Uuid) -> picstash_records::Result<Option<ImageRecord>> {
            Ok(None)
        }
        async fn delete_by_id(&self, _: Uuid) -> picstash_records::Result<bool> {
            Err(RecordError::Database("connection reset".to_string()))
        }
        async fn list(&self, _: ListQuery) -> picstash_records::Result<Page> {
            Err(RecordError::Database("connection reset".to_string()))
        }
    }

    /// Memory record store whose deletes always fail
    #[derive(Default)]
    struct StickyRecords {
        inner: MemoryRecordStore,
    }

    #[async_trait]
    impl ImageRecordStore for StickyRecords {
        async fn create(&self, record: NewImageRecord) -> picstash_records::Result<ImageRecord> {
            self.inner.create(record).await
        }
        async fn find_by_id(&self, id: Uuid) -> picstash_records::Result<Option<ImageRecord>> {
            self.inner.find_by_id(id).await
        }
        async fn delete_by_id(&self, _: Uuid) -> picstash_records::Result<bool> {
            Err(RecordError::Database("connection reset".to_string()))
        }
        async fn list(&self, query: ListQuery) -> picstash_records::Result<Page> {
            self.inner.list(query).await
        }
    }

    fn service() -> ImageService<FlakyMedia, MemoryRecordStore> {
        ImageService::new(Arc::new(FlakyMedia::default()), Arc::new(MemoryRecordStore::new()))
    }

    fn admin(id: &str) -> Identity {
        Identity::new(id, format!("name-{}", id), Role::Admin)
    }

    fn temp_image(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join(format!("{}.png", Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"\x89PNG not really").unwrap();
        path
    }

    fn seed(records: &MemoryRecordStore, count: usize, owner: &str) -> Vec<ImageRecord> {
        let base = Utc::now() - Duration::hours(1);
        (0..count)
            .map(|i| {
                let at = base + Duration::minutes(i as i64);
                let record = ImageRecord {
                    id: Uuid::new_v4(),
                    url: format!("memory://seed-{}", i),
                    public_id: format!("seed-{}", i),
                    uploaded_by: owner.to_string(),
                    created_at: at,
                    updated_at: at,
                };
                records.insert(record.clone());
                record
            })
            .collect()
    }

    #[tokio::test]
    async fn test_upload_creates_record_and_removes_temp_file() {
        let svc = service();
        let dir = tempfile::tempdir().unwrap();
        let path = temp_image(&dir);

        let record = svc.upload(&admin("a1"), Some(path.as_path())).await.unwrap();

        assert_eq!(record.uploaded_by, "a1");
        assert_eq!(svc.records().len(), 1);
        assert!(svc.media().inner.contains(&record.public_id));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_upload_without_file() {
        let svc = service();

        let result = svc.upload(&admin("a1"), None).await;

        assert!(matches!(result, Err(PipelineError::MissingFile)));
        assert!(svc.records().is_empty());
        assert!(svc.media().inner.is_empty());
    }

    #[tokio::test]
    async fn test_upload_requires_admin() {
        let svc = service();
        let dir = tempfile::tempdir().unwrap();
        let path = temp_image(&dir);

        let result = svc
            .upload(&Identity::new("u1", "bob", Role::User), Some(path.as_path()))
            .await;

        assert!(matches!(
            result,
            Err(PipelineError::Denied(DenyReason::RoleRequired(Role::Admin)))
        ));
        assert!(svc.media().inner.is_empty());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_temp_file() {
        let svc = service();
        svc.media().fail_upload.store(true, Ordering::SeqCst);
        let dir = tempfile::tempdir().unwrap();
        let path = temp_image(&dir);

        let result = svc.upload(&admin("a1"), Some(path.as_path())).await;

        assert!(matches!(result, Err(PipelineError::StorageUploadFailed(_))));
        assert!(svc.records().is_empty());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_temp_file() {
        let svc = ImageService::new(Arc::new(MemoryMediaStore::new()), Arc::new(BrokenRecords));
        let dir = tempfile::tempdir().unwrap();
        let path = temp_image(&dir);

        let result = svc.upload(&admin("a1"), Some(path.as_path())).await;

        assert!(matches!(result, Err(PipelineError::Persistence(_))));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_list_first_page_of_five() {
        let svc = service();
        let seeded = seed(svc.records(), 5, "a1");
        let request = ListRequest::parse(Some("1"), Some("2"), None, None, DEFAULT_MAX_LIMIT);

        let result = svc.list(&Identity::new("u1", "bob", Role::User), request).await.unwrap();

        assert_eq!(result.current_page, 1);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.total_images, 5);
        let ids: Vec<_> = result.data.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![seeded[4].id, seeded[3].id]);
    }

    #[rstest]
    #[case(0, 2, 0)]
    #[case(1, 2, 1)]
    #[case(4, 2, 2)]
    #[case(5, 2, 3)]
    #[case(7, 3, 3)]
    #[case(7, 100, 1)]
    #[tokio::test]
    async fn test_list_page_math(#[case] count: usize, #[case] limit: u64, #[case] pages: u64) {
        let svc = service();
        seed(svc.records(), count, "a1");
        let request = ListRequest {
            limit,
            ..ListRequest::default()
        };

        let result = svc.list(&admin("a1"), request).await.unwrap();

        assert_eq!(result.total_pages, pages);
        assert_eq!(result.total_images, count as u64);
        assert!(result.data.len() as u64 <= limit);
    }

    #[rstest]
    #[case(None, None, 1, 2)]
    #[case(Some("3"), Some("10"), 3, 10)]
    #[case(Some("0"), Some("0"), 1, 2)]
    #[case(Some("-4"), Some("abc"), 1, 2)]
    #[case(Some(" 2 "), Some("1000"), 2, 100)]
    fn test_list_request_parse(
        #[case] page: Option<&str>,
        #[case] limit: Option<&str>,
        #[case] expected_page: u64,
        #[case] expected_limit: u64,
    ) {
        let request = ListRequest::parse(page, limit, None, None, DEFAULT_MAX_LIMIT);
        assert_eq!(request.page, expected_page);
        assert_eq!(request.limit, expected_limit);
    }

    #[test]
    fn test_list_request_skip() {
        let request = ListRequest::parse(Some("3"), Some("4"), Some("url"), Some("asc"), 50);
        assert_eq!(request.skip(), 8);
        assert_eq!(request.sort, SortField::Url);
        assert_eq!(request.direction, SortDirection::Ascending);
    }

    #[tokio::test]
    async fn test_list_json_shape() {
        let svc = service();
        seed(svc.records(), 1, "a1");

        let result = svc.list(&admin("a1"), ListRequest::default()).await.unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["currentPage"], 1);
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["totalImages"], 1);
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_by_owner() {
        let svc = service();
        let dir = tempfile::tempdir().unwrap();
        let record = svc.upload(&admin("a1"), Some(temp_image(&dir).as_path())).await.unwrap();

        svc.delete(&admin("a1"), &record.id.to_string()).await.unwrap();

        assert!(svc.records().find_by_id(record.id).await.unwrap().is_none());
        assert!(!svc.media().inner.contains(&record.public_id));
    }

    #[tokio::test]
    async fn test_delete_by_other_admin_is_forbidden() {
        let svc = service();
        let dir = tempfile::tempdir().unwrap();
        let record = svc.upload(&admin("a1"), Some(temp_image(&dir).as_path())).await.unwrap();

        let result = svc.delete(&admin("a2"), &record.id.to_string()).await;

        assert!(matches!(result, Err(PipelineError::Denied(DenyReason::NotOwner))));
        assert!(svc.records().find_by_id(record.id).await.unwrap().is_some());
        assert!(svc.media().inner.contains(&record.public_id));
    }

    #[tokio::test]
    async fn test_delete_keeps_record_when_media_delete_fails() {
        let svc = service();
        let dir = tempfile::tempdir().unwrap();
        let record = svc.upload(&admin("a1"), Some(temp_image(&dir).as_path())).await.unwrap();
        svc.media().fail_delete.store(true, Ordering::SeqCst);

        let result = svc.delete(&admin("a1"), &record.id.to_string()).await;

        assert!(matches!(result, Err(PipelineError::StorageDeleteFailed(_))));
        assert_eq!(svc.records().find_by_id(record.id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_record_delete_failure_after_media_destroy() {
        let svc = ImageService::new(Arc::new(FlakyMedia::default()), Arc::new(StickyRecords::default()));
        let dir = tempfile::tempdir().unwrap();
        let record = svc.upload(&admin("a1"), Some(temp_image(&dir).as_path())).await.unwrap();

        let result = svc.delete(&admin("a1"), &record.id.to_string()).await;

        assert!(matches!(result, Err(PipelineError::Persistence(_))));
        // The media object is gone while the record remains
        assert!(!svc.media().inner.contains(&record.public_id));
        assert_eq!(svc.records().inner.find_by_id(record.id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_delete_proceeds_when_media_object_missing() {
        let svc = service();
        let seeded = seed(svc.records(), 1, "a1");

        svc.delete(&admin("a1"), &seeded[0].id.to_string()).await.unwrap();

        assert!(svc.records().is_empty());
    }

    #[rstest]
    #[case("not-a-uuid")]
    #[case("68a6e43e7c31c38ca6bfa0e1")]
    #[tokio::test]
    async fn test_delete_unknown_id(#[case] id: &str) {
        let svc = service();
        let result = svc.delete(&admin("a1"), id).await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let svc = service();
        let result = svc.delete(&admin("a1"), &Uuid::new_v4().to_string()).await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }
}
