//! Listing snapshot cache
//!
//! Holds one full scan of a store together with the instant it was taken.
//! Listing and counting calls reuse the snapshot until it is older than the
//! freshness window; writes drop it entirely.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::errors::StoreError;
use super::types::FileMetadata;

/// Maximum age of a snapshot before the next listing rescans (5 minutes)
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(300);

/// State of the cache at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Never populated, or invalidated by a write
    Empty,
    /// Within the freshness window
    Fresh,
    /// Older than the freshness window
    Stale,
    /// Caller asked for a rescan
    Forced,
}

impl Freshness {
    /// Whether a full scan is required
    pub fn needs_scan(self) -> bool {
        self != Freshness::Fresh
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls served from the snapshot
    pub hits: u64,
    /// Calls that required a scan
    pub misses: u64,
    /// Scans that completed successfully
    pub scans: u64,
}

/// Snapshot of a store's items with its refresh time
#[derive(Debug)]
pub struct SnapshotCache {
    /// Ordered records from the last scan
    snapshot: Option<Vec<FileMetadata>>,
    /// When the snapshot was taken
    refreshed_at: Option<Instant>,
    /// Freshness window
    ttl: Duration,
    stats: CacheStats,
}

impl SnapshotCache {
    /// Create an empty cache with the default freshness window
    pub fn new() -> Self {
        Self::with_ttl(FRESHNESS_WINDOW)
    }

    /// Create an empty cache with a custom freshness window
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            snapshot: None,
            refreshed_at: None,
            ttl,
            stats: CacheStats::default(),
        }
    }

    /// Decide whether the snapshot can serve a call made at `now`
    pub fn freshness(&self, now: Instant, force: bool) -> Freshness {
        let refreshed_at = match (&self.snapshot, self.refreshed_at) {
            (Some(_), Some(at)) => at,
            _ => return Freshness::Empty,
        };

        if force {
            Freshness::Forced
        } else if now.saturating_duration_since(refreshed_at) > self.ttl {
            Freshness::Stale
        } else {
            Freshness::Fresh
        }
    }

    /// Replace the snapshot with the result of a scan taken at `now`
    pub fn replace(&mut self, files: Vec<FileMetadata>, now: Instant) {
        debug!(entries = files.len(), "Cached listing snapshot");
        self.snapshot = Some(files);
        self.refreshed_at = Some(now);
    }

    /// Drop the snapshot
    ///
    /// Call this after every successful write.
    pub fn invalidate(&mut self) {
        self.snapshot = None;
        self.refreshed_at = None;
        debug!("Invalidated listing snapshot");
    }

    /// Current snapshot (empty when never populated)
    pub fn snapshot(&self) -> &[FileMetadata] {
        self.snapshot.as_deref().unwrap_or(&[])
    }

    /// Return the snapshot, scanning first when it is empty, stale or forced
    ///
    /// A failed scan leaves the previous state untouched.
    pub async fn get_or_scan<F, Fut>(
        &mut self,
        force: bool,
        scan: F,
    ) -> Result<&[FileMetadata], StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<FileMetadata>, StoreError>>,
    {
        let now = Instant::now();
        let freshness = self.freshness(now, force);

        if freshness.needs_scan() {
            self.stats.misses += 1;
            debug!(reason = ?freshness, "Snapshot cache MISS, scanning backend");
            let files = scan().await?;
            self.stats.scans += 1;
            self.replace(files, now);
        } else {
            self.stats.hits += 1;
            trace!(entries = self.snapshot().len(), "Snapshot cache HIT");
        }

        Ok(self.snapshot())
    }

    /// Get cache counters
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Log current cache metrics
    pub fn log_metrics(&self) {
        let CacheStats {
            hits,
            misses,
            scans,
        } = self.stats;
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        debug!(
            hits = hits,
            misses = misses,
            scans = scans,
            hit_rate = format!("{:.1}%", hit_rate),
            entries = self.snapshot().len(),
            "Cache metrics"
        );
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Check pagination arguments
///
/// # Returns
/// `(num_files, page)` as unsigned values
pub fn validate_page(num_files: i64, page: i64) -> Result<(usize, usize), StoreError> {
    if num_files <= 0 {
        return Err(StoreError::InvalidArgument(
            "num_files must be a positive integer".to_string(),
        ));
    }
    if page < 0 {
        return Err(StoreError::InvalidArgument(
            "page must be a non-negative integer".to_string(),
        ));
    }

    let num_files = usize::try_from(num_files)
        .map_err(|_| StoreError::InvalidArgument("num_files is too large".to_string()))?;
    let page = usize::try_from(page)
        .map_err(|_| StoreError::InvalidArgument("page is too large".to_string()))?;
    Ok((num_files, page))
}

/// Slice one page out of a snapshot
///
/// Pages past the end are empty; the last page may be short.
pub fn paginate(files: &[FileMetadata], num_files: usize, page: usize) -> Vec<FileMetadata> {
    let start = match page.checked_mul(num_files) {
        Some(start) if start < files.len() => start,
        _ => return Vec::new(),
    };
    let end = start.saturating_add(num_files).min(files.len());
    files[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn records(n: usize) -> Vec<FileMetadata> {
        (0..n)
            .map(|i| FileMetadata {
                id: format!("{:03}.wav", i),
                display_name: format!("{:03}.wav", i),
                path: format!("{:03}.wav", i),
                size_bytes: i as u64,
                created_at: Utc::now(),
                modified_at: Utc::now(),
                content_type: "audio/wav".to_string(),
                preview: None,
                source_filename: None,
                backend_key: None,
            })
            .collect()
    }

    #[test]
    fn test_freshness_lifecycle() {
        let mut cache = SnapshotCache::new();
        let t0 = Instant::now();

        assert_eq!(cache.freshness(t0, false), Freshness::Empty);

        cache.replace(records(2), t0);
        assert_eq!(cache.freshness(t0, false), Freshness::Fresh);
        assert_eq!(cache.freshness(t0 + FRESHNESS_WINDOW, false), Freshness::Fresh);
        assert_eq!(
            cache.freshness(t0 + FRESHNESS_WINDOW + Duration::from_secs(1), false),
            Freshness::Stale
        );
        assert_eq!(cache.freshness(t0, true), Freshness::Forced);

        cache.invalidate();
        assert_eq!(cache.freshness(t0, false), Freshness::Empty);
        assert!(cache.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_scan_counts_scans() {
        let mut cache = SnapshotCache::new();

        let files = cache.get_or_scan(false, || async { Ok(records(3)) }).await.unwrap();
        assert_eq!(files.len(), 3);

        // Second call inside the window must not scan
        let files = cache
            .get_or_scan(false, || async {
                Err(StoreError::Connectivity("unexpected scan".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(files.len(), 3);

        let files = cache.get_or_scan(true, || async { Ok(records(1)) }).await.unwrap();
        assert_eq!(files.len(), 1);

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                scans: 2
            }
        );
    }

    #[tokio::test]
    async fn test_failed_scan_keeps_cache_empty() {
        let mut cache = SnapshotCache::new();
        let err = cache
            .get_or_scan(false, || async {
                Err(StoreError::Connectivity("bucket unreachable".to_string()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Connectivity(_)));
        assert_eq!(cache.freshness(Instant::now(), false), Freshness::Empty);
        assert_eq!(cache.stats().scans, 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_rescans_every_call() {
        let mut cache = SnapshotCache::with_ttl(Duration::ZERO);
        cache.get_or_scan(false, || async { Ok(records(1)) }).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.get_or_scan(false, || async { Ok(records(2)) }).await.unwrap();
        assert_eq!(cache.stats().scans, 2);
        assert_eq!(cache.snapshot().len(), 2);
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(10, 0).unwrap(), (10, 0));
        assert!(matches!(validate_page(0, 0), Err(StoreError::InvalidArgument(_))));
        assert!(matches!(validate_page(-3, 0), Err(StoreError::InvalidArgument(_))));
        assert!(matches!(validate_page(5, -1), Err(StoreError::InvalidArgument(_))));
    }

    #[test]
    fn test_paginate_reassembles_snapshot() {
        let files = records(7);
        for page_size in 1..=8 {
            let mut collected = Vec::new();
            let mut page = 0;
            loop {
                let chunk = paginate(&files, page_size, page);
                if chunk.is_empty() {
                    break;
                }
                assert!(chunk.len() <= page_size);
                collected.extend(chunk);
                page += 1;
            }
            assert_eq!(collected, files, "page_size {}", page_size);
        }
    }

    #[test]
    fn test_paginate_out_of_range() {
        let files = records(4);
        assert!(paginate(&files, 2, 2).is_empty());
        assert!(paginate(&files, 4, 1).is_empty());
        assert!(paginate(&files, usize::MAX, 2).is_empty());
        assert_eq!(paginate(&files, 3, 1).len(), 1);
        assert!(paginate(&[], 5, 0).is_empty());
    }
}
