//! Payload formats
//!
//! A format fixes what a store holds and how it crosses the byte boundary:
//! audio passes through untouched, JSON documents are parsed on read and
//! pretty-printed on write.

use serde_json::Value;

use super::errors::StoreError;
use super::types::ContentKind;

/// Encoding of a store's payload
pub trait ContentFormat: Send + Sync + 'static {
    /// In-memory representation handed to and returned from the store
    type Content: Send + Sync + 'static;

    /// Kind used for extension matching, ordering and fallbacks
    const KIND: ContentKind;

    /// Turn stored bytes back into content
    fn decode(id: &str, bytes: Vec<u8>) -> Result<Self::Content, StoreError>;

    /// Turn content into the bytes to store
    fn encode(id: &str, content: Self::Content) -> Result<Vec<u8>, StoreError>;
}

/// Binary audio payloads
#[derive(Debug, Clone, Copy)]
pub struct Audio;

impl ContentFormat for Audio {
    type Content = Vec<u8>;
    const KIND: ContentKind = ContentKind::Audio;

    fn decode(_id: &str, bytes: Vec<u8>) -> Result<Vec<u8>, StoreError> {
        Ok(bytes)
    }

    fn encode(_id: &str, content: Vec<u8>) -> Result<Vec<u8>, StoreError> {
        Ok(content)
    }
}

/// JSON documents
#[derive(Debug, Clone, Copy)]
pub struct Json;

impl ContentFormat for Json {
    type Content = Value;
    const KIND: ContentKind = ContentKind::Json;

    fn decode(id: &str, bytes: Vec<u8>) -> Result<Value, StoreError> {
        let text = String::from_utf8(bytes).map_err(|e| StoreError::decode(id, e))?;
        serde_json::from_str(&text).map_err(|e| StoreError::decode(id, e))
    }

    fn encode(_id: &str, content: Value) -> Result<Vec<u8>, StoreError> {
        // serde_json's pretty printer indents with two spaces
        serde_json::to_vec_pretty(&content).map_err(|e| StoreError::Serialize(e.to_string()))
    }
}
