//! Remote object-store store
//!
//! Serves items from a bucket under an optional key prefix. Listings drain
//! every page of the bucket listing and are cached like the local store.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::backend::ContentStore;
use super::cache::{paginate, validate_page, CacheStats, SnapshotCache};
use super::errors::StoreError;
use super::format::ContentFormat;
use super::types::{guess_content_type, summarize_read, FileMetadata, Preview};
use crate::s3::{full_key, normalize_prefix, relative_key, ObjectClient, ObjectError, ObjectInfo};

/// Store backed by a bucket
pub struct RemoteStore<F: ContentFormat> {
    client: Arc<dyn ObjectClient>,
    /// Normalized prefix, empty or ending with exactly one `/`
    prefix: String,
    cache: SnapshotCache,
    _format: PhantomData<F>,
}

impl<F: ContentFormat> RemoteStore<F> {
    /// Bind a store to the client's bucket and verify the bucket is reachable
    pub async fn open(client: Arc<dyn ObjectClient>, prefix: &str) -> Result<Self, StoreError> {
        let prefix = normalize_prefix(prefix);

        client
            .head_bucket()
            .await
            .map_err(|e| reachability_error(client.bucket(), e))?;

        info!(
            bucket = client.bucket(),
            prefix = %prefix,
            kind = ?F::KIND,
            "Remote store opened"
        );

        Ok(Self {
            client,
            prefix,
            cache: SnapshotCache::new(),
            _format: PhantomData,
        })
    }

    /// Normalized key prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Snapshot, rescanning when empty, stale or forced
    async fn snapshot(&mut self, force: bool) -> Result<&[FileMetadata], StoreError> {
        let client = Arc::clone(&self.client);
        let prefix = self.prefix.clone();
        self.cache
            .get_or_scan(force, move || async move {
                scan::<F>(client.as_ref(), &prefix).await
            })
            .await
    }
}

#[async_trait]
impl<F: ContentFormat> ContentStore for RemoteStore<F> {
    type Content = F::Content;

    fn location(&self) -> String {
        self.client.object_uri(&self.prefix)
    }

    async fn get_contents(&self, id: &str) -> Result<F::Content, StoreError> {
        let key = full_key(&self.prefix, id);
        let bytes = self.client.get_object(&key).await.map_err(|e| match e {
            ObjectError::NotFound(_) => StoreError::NotFound(format!("File not found: {}", id)),
            ObjectError::Forbidden(_) => StoreError::PermissionDenied(format!(
                "Permission denied when accessing file: {}",
                id
            )),
            other => StoreError::Backend(other),
        })?;

        debug!(id = id, key = %key, size = bytes.len(), "Fetched remote object");
        F::decode(id, bytes)
    }

    async fn save(&mut self, id: &str, content: F::Content) -> Result<(), StoreError> {
        let key = full_key(&self.prefix, id);
        let content_type = guess_content_type(id, F::KIND.remote_fallback_type());
        let body = F::encode(id, content)?;

        self.client
            .put_object(&key, body, &content_type)
            .await
            .map_err(|e| match e {
                ObjectError::Forbidden(_) => StoreError::PermissionDenied(format!(
                    "Permission denied when writing file: {}",
                    id
                )),
                other => StoreError::Backend(other),
            })?;

        self.cache.invalidate();
        Ok(())
    }

    async fn list(&mut self, num_files: i64, page: i64) -> Result<Vec<FileMetadata>, StoreError> {
        let (num_files, page) = validate_page(num_files, page)?;
        let files = self.snapshot(false).await?;
        Ok(paginate(files, num_files, page))
    }

    async fn file_count(&mut self) -> Result<usize, StoreError> {
        Ok(self.snapshot(false).await?.len())
    }

    async fn refresh(&mut self) -> Result<usize, StoreError> {
        let count = self.snapshot(true).await?.len();
        self.cache.log_metrics();
        Ok(count)
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Classify a failure to reach the bucket or list it
fn reachability_error(bucket: &str, err: ObjectError) -> StoreError {
    if err.is_not_found() {
        StoreError::NotFound(format!("Bucket not found: {}", bucket))
    } else if err.is_forbidden() {
        StoreError::PermissionDenied(format!("Access denied to bucket: {}", bucket))
    } else {
        StoreError::Connectivity(format!("Bucket {}: {}", bucket, err))
    }
}

/// List the prefix and build the ordered snapshot
async fn scan<F: ContentFormat>(
    client: &dyn ObjectClient,
    prefix: &str,
) -> Result<Vec<FileMetadata>, StoreError> {
    let objects = client
        .list_objects(prefix)
        .await
        .map_err(|e| reachability_error(client.bucket(), e))?;

    let mut files = Vec::new();
    for object in objects
        .into_iter()
        .filter(|o| !o.is_directory() && F::KIND.matches_key(&o.key))
    {
        let (preview, source_filename) = if F::KIND.has_preview() {
            let (preview, source_filename) = document_summary(client, &object).await;
            (Some(preview), source_filename)
        } else {
            (None, None)
        };

        let id = relative_key(prefix, &object.key).to_string();
        files.push(FileMetadata {
            display_name: client.object_uri(&object.key),
            path: id.clone(),
            content_type: guess_content_type(&id, F::KIND.remote_fallback_type()),
            id,
            size_bytes: object.size,
            created_at: object.last_modified,
            modified_at: object.last_modified,
            preview,
            source_filename,
            backend_key: Some(object.key),
        });
    }

    F::KIND.remote_order().sort(&mut files);
    debug!(
        bucket = client.bucket(),
        prefix = prefix,
        count = files.len(),
        "Scanned remote store"
    );
    Ok(files)
}

/// Fetch one document and extract its preview; failures give an empty preview
async fn document_summary(
    client: &dyn ObjectClient,
    object: &ObjectInfo,
) -> (Preview, Option<String>) {
    match summarize_read(client.get_object(&object.key).await) {
        Ok(summary) => (summary.preview, summary.source_filename),
        Err(e) => {
            debug!(key = %object.key, error = %e, "No preview for document");
            (Preview::new(), None)
        }
    }
}
