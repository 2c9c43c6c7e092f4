//! Store types: metadata records, content kinds and JSON previews

use std::cmp::Ordering;
use std::fmt::Display;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default audio extensions recognized on the local filesystem
pub const LOCAL_AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".wav", ".ogg", ".flac", ".m4a", ".aac"];

/// Audio extensions recognized in a bucket (the remote catalog also carries `.wma`)
pub const REMOTE_AUDIO_EXTENSIONS: &[&str] =
    &[".mp3", ".wav", ".ogg", ".flac", ".aac", ".m4a", ".wma"];

/// Extension of result documents
pub const JSON_EXTENSION: &str = ".json";

/// Number of leading document keys considered for a preview
const PREVIEW_KEYS: usize = 3;

/// Top-level scalar fields of a JSON document
pub type Preview = Map<String, Value>;

/// Metadata for one discoverable content item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileMetadata {
    /// Identifier accepted by `get_contents` and `save`
    pub id: String,
    /// Human-facing label (file name, or `s3://bucket/key`)
    pub display_name: String,
    /// Root-relative path or prefix-relative key
    pub path: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// Creation time (last-modified for remote items)
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
    /// MIME content type
    pub content_type: String,
    /// Leading scalar fields, JSON stores only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Preview>,
    /// `filename` field of a result document, JSON stores only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_filename: Option<String>,
    /// Full object key, remote stores only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_key: Option<String>,
}

impl FileMetadata {
    /// Base name of the item's path
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Ordering of a store's snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// File name ascending
    NameAscending,
    /// Modification time descending (most recent first)
    NewestFirst,
}

impl SortOrder {
    /// Sort records in place; ties fall back to `id` so the order is total
    pub fn sort(self, files: &mut [FileMetadata]) {
        files.sort_by(|a, b| {
            let primary = match self {
                SortOrder::NameAscending => a.file_name().cmp(b.file_name()),
                SortOrder::NewestFirst => b.modified_at.cmp(&a.modified_at),
            };
            match primary {
                Ordering::Equal => a.id.cmp(&b.id),
                other => other,
            }
        });
    }
}

/// What a store holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Binary audio recordings
    Audio,
    /// Structured JSON documents
    Json,
}

impl ContentKind {
    /// Default allow-list for local scans
    pub fn local_extensions(self) -> Vec<String> {
        match self {
            ContentKind::Audio => LOCAL_AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            ContentKind::Json => vec![JSON_EXTENSION.to_string()],
        }
    }

    /// Whether a bucket key qualifies as an item of this kind
    pub fn matches_key(self, key: &str) -> bool {
        let key = key.to_lowercase();
        match self {
            ContentKind::Audio => REMOTE_AUDIO_EXTENSIONS.iter().any(|ext| key.ends_with(ext)),
            ContentKind::Json => key.ends_with(JSON_EXTENSION),
        }
    }

    /// Whether a local file name qualifies under the `allowed` list
    ///
    /// Audio matches on the file extension; documents on the `.json` suffix.
    pub fn matches_local(self, name: &str, allowed: &[String]) -> bool {
        match self {
            ContentKind::Audio => has_extension(name, allowed),
            ContentKind::Json => has_suffix(name, allowed),
        }
    }

    /// Ordering of local listings
    pub fn local_order(self) -> SortOrder {
        match self {
            ContentKind::Audio => SortOrder::NameAscending,
            ContentKind::Json => SortOrder::NewestFirst,
        }
    }

    /// Ordering of remote listings
    pub fn remote_order(self) -> SortOrder {
        SortOrder::NewestFirst
    }

    /// Content type used when the extension says nothing, for local items
    pub fn local_fallback_type(self) -> &'static str {
        match self {
            ContentKind::Audio => "application/octet-stream",
            ContentKind::Json => "application/json",
        }
    }

    /// Content type used when the extension says nothing, for remote items
    pub fn remote_fallback_type(self) -> &'static str {
        match self {
            ContentKind::Audio => "audio/mpeg",
            ContentKind::Json => "application/json",
        }
    }

    /// Whether a missing local root is created rather than rejected
    ///
    /// Result documents are written by the running process itself.
    pub fn creates_missing_root(self) -> bool {
        matches!(self, ContentKind::Json)
    }

    /// Whether listings carry a document preview
    pub fn has_preview(self) -> bool {
        matches!(self, ContentKind::Json)
    }
}

/// Infer a MIME type from an identifier's extension
pub fn guess_content_type(id: &str, fallback: &str) -> String {
    mime_guess::from_path(id)
        .first()
        .map_or_else(|| fallback.to_string(), |mime| mime.to_string())
}

/// Whether the extension of `name` is one of `extensions` (case-insensitive)
///
/// Uses the real path extension, so a bare dotfile such as `.mp3` has none.
pub fn has_extension(name: &str, extensions: &[String]) -> bool {
    let Some(ext) = Path::new(name).extension() else {
        return false;
    };
    let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
    extensions.iter().any(|allowed| allowed.to_lowercase() == ext)
}

/// Whether `name` ends with one of `suffixes` (case-insensitive)
pub fn has_suffix(name: &str, suffixes: &[String]) -> bool {
    let name = name.to_lowercase();
    suffixes.iter().any(|suffix| name.ends_with(&suffix.to_lowercase()))
}

/// Why a preview could not be extracted
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("content could not be read: {0}")]
    Unreadable(String),

    #[error("content is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("document is not a JSON object")]
    NotAnObject,
}

/// Fields extracted from a document while scanning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentSummary {
    pub preview: Preview,
    pub source_filename: Option<String>,
}

/// Parse a document and pull out its preview and `filename` field
///
/// The first three keys in document order are considered; nested objects and
/// arrays among them are skipped.
pub fn summarize_document(bytes: &[u8]) -> Result<DocumentSummary, PreviewError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Object(document) = value else {
        return Err(PreviewError::NotAnObject);
    };

    let preview = document
        .iter()
        .take(PREVIEW_KEYS)
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let source_filename = document
        .get("filename")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(DocumentSummary {
        preview,
        source_filename,
    })
}

/// Summarize a document from the outcome of reading it
///
/// A failed read is reported as `PreviewError::Unreadable`.
pub fn summarize_read<E: Display>(
    read: Result<Vec<u8>, E>,
) -> Result<DocumentSummary, PreviewError> {
    let bytes = read.map_err(|e| PreviewError::Unreadable(e.to_string()))?;
    summarize_document(&bytes)
}
