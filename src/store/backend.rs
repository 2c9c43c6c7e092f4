//! Content store contract shared by every backend

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::cache::CacheStats;
use super::errors::StoreError;
use super::types::FileMetadata;

/// Paginated, cached access to one storage location
///
/// Reads take `&self`; anything that may touch the listing snapshot takes
/// `&mut self`, so a store is driven by one caller at a time.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Payload type (raw bytes or a parsed JSON document)
    type Content: Send + Sync + 'static;

    /// Where this store points, for logs and messages
    fn location(&self) -> String;

    /// Retrieve one item by identifier
    async fn get_contents(&self, id: &str) -> Result<Self::Content, StoreError>;

    /// Write an item under `id`, replacing existing content
    ///
    /// Invalidates the listing snapshot on success.
    async fn save(&mut self, id: &str, content: Self::Content) -> Result<(), StoreError>;

    /// One page of the snapshot, refreshing it first when stale
    async fn list(&mut self, num_files: i64, page: i64) -> Result<Vec<FileMetadata>, StoreError>;

    /// Number of items in the snapshot, refreshing it first when stale
    async fn file_count(&mut self) -> Result<usize, StoreError>;

    /// Rescan regardless of snapshot age and return the item count
    async fn refresh(&mut self) -> Result<usize, StoreError>;

    /// Snapshot cache counters
    fn cache_stats(&self) -> CacheStats;
}

/// Serialize `document` and save it in a JSON store
///
/// Values that cannot be represented as JSON fail with `Serialize` before
/// anything is written.
pub async fn save_document<S, T>(store: &mut S, id: &str, document: &T) -> Result<(), StoreError>
where
    S: ContentStore<Content = Value> + ?Sized,
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(document).map_err(|e| StoreError::Serialize(e.to_string()))?;
    store.save(id, value).await
}
