//! Paginated, cached content stores over local directories and buckets

pub mod backend;
pub mod cache;
pub mod errors;
pub mod format;
pub mod local;
pub mod remote;
pub mod select;
pub mod types;

pub use backend::{save_document, ContentStore};
pub use cache::{CacheStats, SnapshotCache};
pub use errors::StoreError;
pub use format::{Audio, ContentFormat, Json};
pub use local::LocalStore;
pub use remote::RemoteStore;
pub use select::{open_audio_store, open_json_store, open_store, AudioStore, JsonStore};
pub use types::{ContentKind, FileMetadata, Preview, SortOrder};
