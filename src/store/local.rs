//! Local filesystem store
//!
//! Serves items from a directory tree. A listing walks the whole tree once and
//! is cached; reads and writes go straight to disk.

use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::backend::ContentStore;
use super::cache::{paginate, validate_page, CacheStats, SnapshotCache};
use super::errors::StoreError;
use super::format::ContentFormat;
use super::types::{guess_content_type, summarize_read, FileMetadata};

/// Store rooted at a local directory
pub struct LocalStore<F: ContentFormat> {
    /// Absolute root directory
    root: PathBuf,
    /// Lowercase allowed extensions, each with a leading dot
    extensions: Vec<String>,
    cache: SnapshotCache,
    _format: PhantomData<F>,
}

impl<F: ContentFormat> LocalStore<F> {
    /// Open a store with the default extension allow-list
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_extensions(root, F::KIND.local_extensions())
    }

    /// Open a store with a custom extension allow-list
    ///
    /// Extensions are matched case-insensitively; a missing leading dot is
    /// added.
    pub fn with_extensions(
        root: impl AsRef<Path>,
        extensions: Vec<String>,
    ) -> Result<Self, StoreError> {
        let root = root.as_ref();
        let label = root.display().to_string();

        if !root.exists() {
            if !F::KIND.creates_missing_root() {
                return Err(StoreError::NotFound(format!(
                    "Root directory does not exist: {}",
                    label
                )));
            }
            fs::create_dir_all(root).map_err(|e| StoreError::from_io(&label, e))?;
            info!(root = %label, "Created missing store root");
        }
        if !root.is_dir() {
            return Err(StoreError::NotADirectory(label));
        }

        let root = fs::canonicalize(root).map_err(|e| StoreError::from_io(&label, e))?;
        let extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();

        info!(root = %root.display(), kind = ?F::KIND, "Local store opened");

        Ok(Self {
            root,
            extensions,
            cache: SnapshotCache::new(),
            _format: PhantomData,
        })
    }

    /// Absolute root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot, rescanning when empty, stale or forced
    async fn snapshot(&mut self, force: bool) -> Result<&[FileMetadata], StoreError> {
        let root = self.root.clone();
        let extensions = self.extensions.clone();
        self.cache
            .get_or_scan(force, move || scan::<F>(root, extensions))
            .await
    }
}

#[async_trait]
impl<F: ContentFormat> ContentStore for LocalStore<F> {
    type Content = F::Content;

    fn location(&self) -> String {
        self.root.display().to_string()
    }

    async fn get_contents(&self, id: &str) -> Result<F::Content, StoreError> {
        let path = self.root.join(validate_id(id)?);

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| StoreError::from_io(id, e))?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound(format!("File not found: {}", id)));
        }
        if !F::KIND.matches_local(id, &self.extensions) {
            return Err(StoreError::InvalidArgument(format!(
                "File type not allowed: {}",
                id
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| StoreError::from_io(id, e))?;
        debug!(id = id, size = bytes.len(), "Read local file");
        F::decode(id, bytes)
    }

    async fn save(&mut self, id: &str, content: F::Content) -> Result<(), StoreError> {
        let path = self.root.join(validate_id(id)?);
        let bytes = F::encode(id, content)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::from_io(id, e))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| StoreError::from_io(id, e))?;

        info!(id = id, size = bytes.len(), "Saved local file");
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

/// Check an identifier and turn it into a root-relative path
///
/// Rejects empty identifiers, absolute paths and `..` components so an
/// identifier can never leave the root.
pub(crate) fn validate_id(id: &str) -> Result<PathBuf, StoreError> {
    if id.is_empty() {
        return Err(StoreError::InvalidArgument(
            "Identifier cannot be empty".to_string(),
        ));
    }

    let path = Path::new(id);
    if path.is_absolute() {
        return Err(StoreError::InvalidArgument(format!(
            "Identifier cannot be absolute: {}",
            id
        )));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => normalized.push(name),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(StoreError::InvalidArgument(format!(
                    "Identifier cannot contain '..': {}",
                    id
                )))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StoreError::InvalidArgument(format!(
                    "Identifier cannot contain a root or prefix: {}",
                    id
                )))
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(StoreError::InvalidArgument(format!(
            "Identifier resolves to the root: {}",
            id
        )));
    }
    Ok(normalized)
}

/// Walk the tree on the blocking pool
async fn scan<F: ContentFormat>(
    root: PathBuf,
    extensions: Vec<String>,
) -> Result<Vec<FileMetadata>, StoreError> {
    let label = root.display().to_string();
    tokio::task::spawn_blocking(move || scan_blocking::<F>(&root, &extensions))
        .await
        .map_err(|e| StoreError::Io {
            id: label,
            source: io::Error::other(e),
        })?
}

fn scan_blocking<F: ContentFormat>(
    root: &Path,
    extensions: &[String],
) -> Result<Vec<FileMetadata>, StoreError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            // The root itself must be readable; unreadable subtrees are skipped
            Err(e) if dir.as_path() == root => {
                return Err(StoreError::from_io(&root.display().to_string(), e))
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                pending.push(path);
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if !F::KIND.matches_local(&name, extensions) {
                continue;
            }

            match describe_file::<F>(root, &path) {
                Ok(Some(record)) => files.push(record),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable file"),
            }
        }
    }

    F::KIND.local_order().sort(&mut files);
    debug!(root = %root.display(), count = files.len(), "Scanned local store");
    Ok(files)
}

/// Build the record for one file, or None when it is not a regular file
fn describe_file<F: ContentFormat>(
    root: &Path,
    path: &Path,
) -> io::Result<Option<FileMetadata>> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Ok(None);
    }

    let relative = path.strip_prefix(root).unwrap_or(path);
    let id = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.clone());

    let modified_at: DateTime<Utc> = metadata.modified()?.into();
    let created_at = metadata
        .created()
        .map(DateTime::<Utc>::from)
        .unwrap_or(modified_at);

    let (preview, source_filename) = if F::KIND.has_preview() {
        match summarize_read(fs::read(path)) {
            Ok(summary) => (Some(summary.preview), summary.source_filename),
            Err(e) => {
                debug!(id = %id, error = %e, "No preview for document");
                (Some(Default::default()), None)
            }
        }
    } else {
        (None, None)
    };

    Ok(Some(FileMetadata {
        content_type: guess_content_type(&id, F::KIND.local_fallback_type()),
        display_name,
        path: id.clone(),
        id,
        size_bytes: metadata.len(),
        created_at,
        modified_at,
        preview,
        source_filename,
        backend_key: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::format::{Audio, Json};
    use serde_json::json;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, data: &[u8]) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, data).unwrap();
        path
    }

    fn set_mtime(path: &Path, secs_ago: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
            .unwrap();
    }

    fn ids(files: &[FileMetadata]) -> Vec<&str> {
        files.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_open_rejects_missing_and_file_roots() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("nope");
        assert!(matches!(
            LocalStore::<Audio>::open(&missing),
            Err(StoreError::NotFound(_))
        ));

        let file = write(dir.path(), "plain.txt", b"x");
        assert!(matches!(
            LocalStore::<Audio>::open(&file),
            Err(StoreError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_json_store_creates_missing_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("processed_files");
        let store = LocalStore::<Json>::open(&root).unwrap();
        assert!(root.is_dir());
        assert!(store.root().is_absolute());
    }

    #[tokio::test]
    async fn test_audio_listing_filters_and_sorts_by_name() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.wav", b"bb");
        write(dir.path(), "sub/a.MP3", b"a");
        write(dir.path(), "notes.txt", b"skip");
        write(dir.path(), "c.flac", b"ccc");
        write(dir.path(), ".mp3", b"dotfile");

        let mut store = LocalStore::<Audio>::open(dir.path()).unwrap();
        let files = store.list(10, 0).await.unwrap();

        assert_eq!(ids(&files), vec!["sub/a.MP3", "b.wav", "c.flac"]);
        assert_eq!(files[0].display_name, "a.MP3");
        assert_eq!(files[0].path, "sub/a.MP3");
        assert_eq!(files[0].content_type, "audio/mpeg");
        assert_eq!(files[2].size_bytes, 3);
        assert!(files.iter().all(|f| f.preview.is_none()));
        assert_eq!(store.file_count().await.unwrap(), 3);

        // Upper-case extensions are retrievable by the listed id
        assert_eq!(store.get_contents("sub/a.MP3").await.unwrap(), b"a");
        assert!(matches!(
            store.get_contents(".mp3").await,
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_get_contents_checks_extension_and_existence() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "clip.wav", b"RIFF");
        write(dir.path(), "notes.txt", b"text");
        fs::create_dir_all(dir.path().join("folder.wav")).unwrap();

        let store = LocalStore::<Audio>::open(dir.path()).unwrap();
        assert_eq!(store.get_contents("clip.wav").await.unwrap(), b"RIFF");
        assert!(matches!(
            store.get_contents("notes.txt").await,
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.get_contents("missing.wav").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.get_contents("folder.wav").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.get_contents("../escape.wav").await,
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_extensions() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.opus", b"x");
        write(dir.path(), "b.wav", b"x");

        let mut store =
            LocalStore::<Audio>::with_extensions(dir.path(), vec!["OPUS".to_string()]).unwrap();
        assert_eq!(ids(&store.list(5, 0).await.unwrap()), vec!["a.opus"]);
        assert!(store.get_contents("a.opus").await.is_ok());
    }

    #[tokio::test]
    async fn test_save_round_trip_and_invalidation() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::<Audio>::open(dir.path()).unwrap();

        assert_eq!(store.file_count().await.unwrap(), 0);
        store
            .save("team/2024/call.wav", b"audio-bytes".to_vec())
            .await
            .unwrap();

        // The next count must rescan and see the new file
        assert_eq!(store.file_count().await.unwrap(), 1);
        assert_eq!(
            store.get_contents("team/2024/call.wav").await.unwrap(),
            b"audio-bytes"
        );
        assert_eq!(store.cache_stats().scans, 2);
    }

    #[tokio::test]
    async fn test_no_second_scan_within_window() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.wav", b"x");
        let mut store = LocalStore::<Audio>::open(dir.path()).unwrap();

        assert_eq!(store.file_count().await.unwrap(), 1);
        // Written behind the store's back: invisible until the window expires
        write(dir.path(), "b.wav", b"x");
        assert_eq!(store.list(10, 0).await.unwrap().len(), 1);
        assert_eq!(store.cache_stats().scans, 1);

        assert_eq!(store.refresh().await.unwrap(), 2);
        assert_eq!(store.cache_stats().scans, 2);
    }

    #[tokio::test]
    async fn test_pagination() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            write(dir.path(), &format!("{}.wav", i), b"x");
        }
        let mut store = LocalStore::<Audio>::open(dir.path()).unwrap();

        assert_eq!(ids(&store.list(2, 0).await.unwrap()), vec!["0.wav", "1.wav"]);
        assert_eq!(ids(&store.list(2, 2).await.unwrap()), vec!["4.wav"]);
        assert!(store.list(2, 3).await.unwrap().is_empty());
        assert!(matches!(
            store.list(0, 0).await,
            Err(StoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.list(2, -1).await,
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_json_listing_newest_first_with_preview() {
        let dir = TempDir::new().unwrap();
        let old = write(
            dir.path(),
            "old.json",
            br#"{"transcription": "old", "detailed_transcription": [], "model_name": "whisper[base]", "filename": "old.mp3"}"#,
        );
        let new = write(dir.path(), "nested/new.JSON", br#"{"transcription": "new"}"#);
        let broken = write(dir.path(), "broken.json", b"{oops");
        set_mtime(&old, 300);
        set_mtime(&broken, 200);
        set_mtime(&new, 100);

        let mut store = LocalStore::<Json>::open(dir.path()).unwrap();
        let files = store.list(10, 0).await.unwrap();

        assert_eq!(ids(&files), vec!["nested/new.JSON", "broken.json", "old.json"]);
        assert_eq!(files[0].content_type, "application/json");

        let preview = files[2].preview.as_ref().unwrap();
        assert_eq!(preview.get("transcription"), Some(&json!("old")));
        assert_eq!(preview.get("model_name"), Some(&json!("whisper[base]")));
        assert!(!preview.contains_key("detailed_transcription"));
        assert_eq!(files[2].source_filename.as_deref(), Some("old.mp3"));

        // Broken documents still list, with an empty preview
        assert!(files[1].preview.as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_round_trip_and_decode_error() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalStore::<Json>::open(dir.path()).unwrap();

        let doc = json!({"transcription": "hello", "action_items": [{"Assignee": "Ana", "Task": "Ship"}]});
        store.save("abc.json", doc.clone()).await.unwrap();
        assert_eq!(store.get_contents("abc.json").await.unwrap(), doc);

        let text = fs::read_to_string(dir.path().join("abc.json")).unwrap();
        assert!(text.contains("\n  \"transcription\""));

        write(dir.path(), "bad.json", b"not json");
        let err = store.get_contents("bad.json").await.unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id("a/b.wav").unwrap(), PathBuf::from("a/b.wav"));
        assert_eq!(validate_id("./a.wav").unwrap(), PathBuf::from("a.wav"));
        for bad in ["", "/etc/passwd", "../a.wav", "a/../../b.wav", "."] {
            assert!(
                matches!(validate_id(bad), Err(StoreError::InvalidArgument(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
