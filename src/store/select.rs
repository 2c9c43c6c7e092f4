//! Store selection from configuration

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::backend::ContentStore;
use super::errors::StoreError;
use super::format::{Audio, ContentFormat, Json};
use super::local::LocalStore;
use super::remote::RemoteStore;
use crate::config::StorageConfig;
use crate::s3::S3Client;

/// Store of audio recordings
pub type AudioStore = Box<dyn ContentStore<Content = Vec<u8>>>;

/// Store of result documents
pub type JsonStore = Box<dyn ContentStore<Content = Value>>;

/// Build the store a configuration names
pub async fn open_store<F: ContentFormat>(
    config: &StorageConfig,
) -> Result<Box<dyn ContentStore<Content = F::Content>>, StoreError> {
    let store: Box<dyn ContentStore<Content = F::Content>> = match config {
        StorageConfig::Local { root } => Box::new(LocalStore::<F>::open(root)?),
        StorageConfig::S3(settings) => {
            let client = S3Client::connect(settings).await;
            Box::new(RemoteStore::<F>::open(Arc::new(client), &settings.prefix).await?)
        }
    };

    info!(kind = ?F::KIND, location = %store.location(), "Store ready");
    Ok(store)
}

/// Build the audio store
pub async fn open_audio_store(config: &StorageConfig) -> Result<AudioStore, StoreError> {
    open_store::<Audio>(config).await
}

/// Build the result-document store
pub async fn open_json_store(config: &StorageConfig) -> Result<JsonStore, StoreError> {
    open_store::<Json>(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_selection() {
        let dir = TempDir::new().unwrap();
        let audio_root = dir.path().join("audio_files");
        let results_root = dir.path().join("processed_files");

        let err = open_audio_store(&StorageConfig::Local {
            root: audio_root.clone(),
        })
        .await
        .err()
        .unwrap();
        assert!(matches!(err, StoreError::NotFound(_)));

        std::fs::create_dir(&audio_root).unwrap();
        let mut audio = open_audio_store(&StorageConfig::Local { root: audio_root })
            .await
            .unwrap();
        audio.save("a.wav", b"x".to_vec()).await.unwrap();
        assert_eq!(audio.file_count().await.unwrap(), 1);

        let mut results = open_json_store(&StorageConfig::Local {
            root: results_root.clone(),
        })
        .await
        .unwrap();
        assert!(results_root.is_dir());
        assert_eq!(results.file_count().await.unwrap(), 0);
    }
}
