//! In-memory object client for tests
//!
//! Behaves like a single bucket and records every request so tests can assert
//! which keys were asked for and how many listing pages were drained.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::client::ObjectClient;
use super::errors::ObjectError;
use super::types::{ObjectInfo, ObjectPage};

#[derive(Clone)]
struct MemoryObject {
    data: Vec<u8>,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// In-memory bucket
pub struct MemoryObjectClient {
    bucket: String,
    page_size: usize,
    head_error: Option<ObjectError>,
    list_error: Option<ObjectError>,
    objects: Mutex<BTreeMap<String, MemoryObject>>,
    denied: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryObjectClient {
    /// Create an empty bucket
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            page_size: 1000,
            head_error: None,
            list_error: None,
            objects: Mutex::new(BTreeMap::new()),
            denied: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Limit how many keys a listing page returns
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make `head_bucket` fail with the given error
    pub fn with_head_error(mut self, error: ObjectError) -> Self {
        self.head_error = Some(error);
        self
    }

    /// Make every listing page fail with the given error
    pub fn with_list_error(mut self, error: ObjectError) -> Self {
        self.list_error = Some(error);
        self
    }

    /// Store an object directly, bypassing request logging
    pub fn insert(&self, key: &str, data: &[u8], last_modified: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MemoryObject {
                data: data.to_vec(),
                content_type: "application/octet-stream".to_string(),
                last_modified,
            },
        );
    }

    /// Deny reads and writes of a key with AccessDenied
    pub fn deny(&self, key: &str) {
        self.denied.lock().unwrap().insert(key.to_string());
    }

    /// Requests seen so far, formatted as "OP target"
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of listing pages requested
    pub fn list_calls(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.starts_with("LIST "))
            .count()
    }

    /// Content type recorded by the last upload of a key
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|o| o.content_type.clone())
    }

    /// Raw bytes stored under a key
    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|o| o.data.clone())
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push(request);
    }

    fn check_access(&self, key: &str) -> Result<(), ObjectError> {
        if self.denied.lock().unwrap().contains(key) {
            return Err(ObjectError::from_response(
                Some("AccessDenied"),
                Some(403),
                "Access Denied",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_bucket(&self) -> Result<(), ObjectError> {
        self.record(format!("HEAD {}", self.bucket));
        match &self.head_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, ObjectError> {
        self.record(format!("LIST {}", prefix));
        if let Some(error) = &self.list_error {
            return Err(error.clone());
        }

        let objects = self.objects.lock().unwrap();
        let start = continuation_token.unwrap_or_else(|| prefix.to_string());
        let mut matching = objects
            .range(start..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.data.len() as u64,
                last_modified: object.last_modified,
            });

        let page: Vec<ObjectInfo> = matching.by_ref().take(self.page_size).collect();
        let next_continuation_token = matching.next().map(|next| next.key);

        Ok(ObjectPage {
            objects: page,
            next_continuation_token,
        })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, ObjectError> {
        self.record(format!("GET {}", key));
        self.check_access(key)?;

        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| {
                ObjectError::from_response(
                    Some("NoSuchKey"),
                    Some(404),
                    "The specified key does not exist.",
                )
            })
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectError> {
        self.record(format!("PUT {}", key));
        self.check_access(key)?;

        self.objects.lock().unwrap().insert(
            key.to_string(),
            MemoryObject {
                data: body,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_objects_drains_all_pages() {
        let client = MemoryObjectClient::new("bucket").with_page_size(2);
        for i in 0..5 {
            client.insert(&format!("p/{}.wav", i), b"x", Utc::now());
        }
        client.insert("other/skip.wav", b"x", Utc::now());

        let objects = client.list_objects("p/").await.unwrap();
        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["p/0.wav", "p/1.wav", "p/2.wav", "p/3.wav", "p/4.wav"]);
        assert_eq!(client.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let client = MemoryObjectClient::new("bucket");
        let err = client.get_object("nope.wav").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(client.object_uri("a/b.wav"), "s3://bucket/a/b.wav");
    }
}
