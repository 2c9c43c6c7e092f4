//! S3 object client
//!
//! Provides the narrow set of bucket operations the remote stores need, behind
//! the `ObjectClient` trait so tests can substitute an in-memory bucket.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::errors::ObjectError;
use super::types::{ObjectInfo, ObjectPage};
use crate::config::S3Settings;

/// Maximum number of keys requested per listing page
const MAX_KEYS_PER_PAGE: i32 = 1000;

/// Bucket operations used by the remote stores
///
/// One client is bound to exactly one bucket.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Bucket this client operates on
    fn bucket(&self) -> &str;

    /// Synthetic URI naming an object, used as a display name
    fn object_uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket(), key)
    }

    /// Verify the bucket exists and is reachable
    async fn head_bucket(&self) -> Result<(), ObjectError>;

    /// Fetch one page of keys under `prefix`
    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, ObjectError>;

    /// Download an object's full content
    async fn get_object(&self, key: &str) -> Result<Vec<u8>, ObjectError>;

    /// Upload an object, replacing any existing content
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectError>;

    /// List every object under `prefix`, draining pages sequentially
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, ObjectError> {
        let mut all_objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            debug!(
                bucket = self.bucket(),
                prefix = prefix,
                start = ?continuation_token,
                "Listing objects"
            );

            let page = self.list_page(prefix, continuation_token.take()).await?;
            all_objects.extend(page.objects);

            // Check for more pages
            match page.next_continuation_token {
                Some(next) => continuation_token = Some(next),
                None => break,
            }
        }

        debug!(count = all_objects.len(), "Listed objects");
        Ok(all_objects)
    }
}

/// S3 client bound to one bucket
#[derive(Clone)]
pub struct S3Client {
    /// AWS SDK client
    client: aws_sdk_s3::Client,
    /// Bucket name
    bucket: String,
}

impl S3Client {
    /// Build a client from settings using the standard AWS provider chain
    ///
    /// Region and profile fall back to the environment when unset. A custom
    /// endpoint switches to path-style addressing for S3-compatible stores.
    pub async fn connect(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if settings.endpoint_url.is_some() {
            builder = builder.force_path_style(true);
        }

        info!(
            bucket = %settings.bucket,
            region = ?sdk_config.region(),
            profile = ?settings.profile,
            "S3 client ready"
        );

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: settings.bucket.clone(),
        }
    }
}

/// Translate an SDK failure into an ObjectError
fn object_error<E>(err: SdkError<E, HttpResponse>) -> ObjectError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    if matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    ) {
        return ObjectError::Network(message);
    }

    let status = err.raw_response().map(|response| response.status().as_u16());
    ObjectError::from_response(err.code(), status, &message)
}

#[async_trait]
impl ObjectClient for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn head_bucket(&self) -> Result<(), ObjectError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(object_error)?;
        Ok(())
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, ObjectError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(MAX_KEYS_PER_PAGE)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(object_error)?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                let last_modified = object
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
                    .unwrap_or_else(Utc::now);
                Some(ObjectInfo {
                    key,
                    size: u64::try_from(object.size().unwrap_or(0)).unwrap_or(0),
                    last_modified,
                })
            })
            .collect();

        Ok(ObjectPage {
            objects,
            next_continuation_token: output.next_continuation_token().map(str::to_string),
        })
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, ObjectError> {
        debug!(bucket = %self.bucket, key = key, "Downloading object");

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(object_error)?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectError::Network(format!("Failed to read object body: {}", e)))?;

        let bytes = data.into_bytes().to_vec();
        debug!(key = key, size = bytes.len(), "Downloaded object");
        Ok(bytes)
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectError> {
        info!(
            bucket = %self.bucket,
            key = key,
            size = body.len(),
            content_type = content_type,
            "Uploading object"
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(object_error)?;

        Ok(())
    }
}
