//! `ObjectStore` backed by the AWS SDK, pointed at any S3-compatible endpoint
//! (Cloudflare R2, MinIO, AWS S3).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::{Client, config::Region, error::DisplayErrorContext, primitives::ByteStream};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::StoreConfig;
use crate::services::object_store::{
    ListPage, MAX_LIST_PAGE, ObjectInfo, ObjectStore, PutObject, StoreError, StoreResult,
};

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from explicit credentials; the SDK's ambient credential
    /// chain is not consulted.
    pub async fn new(config: &StoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            config.secret_access_key.expose(),
            None,
            None,
            "imghost",
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        // R2 and MinIO expect path-style addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }

    fn content_md5(data: &[u8]) -> String {
        B64.encode(md5::compute(data).0)
    }
}

fn backend_error<E: std::error::Error>(err: E) -> StoreError {
    StoreError::Backend(DisplayErrorContext(&err).to_string())
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    dt.to_millis()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, object: PutObject) -> StoreResult<()> {
        if object.key.is_empty() {
            return Err(StoreError::InvalidKey(object.key));
        }
        let checksum = Self::content_md5(&object.body);
        let size = object.body.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object.key)
            .content_type(&object.content_type)
            .set_cache_control(object.cache_control)
            .content_md5(checksum)
            .body(ByteStream::from(object.body))
            .send()
            .await
            .map_err(backend_error)?;

        debug!("put {} ({} bytes) into {}", object.key, size, self.bucket);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(backend_error)?;

        debug!("deleted {} from {}", key, self.bucket);
        Ok(())
    }

    async fn list_objects(
        &self,
        max_keys: usize,
        continuation_token: Option<&str>,
    ) -> StoreResult<ListPage> {
        let max_keys = max_keys.clamp(1, MAX_LIST_PAGE);
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(max_keys as i32)
            .set_continuation_token(continuation_token.map(str::to_string))
            .send()
            .await
            .map_err(backend_error)?;

        let objects = response
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?;
                Some(ObjectInfo {
                    key: key.to_string(),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    last_modified: obj.last_modified().and_then(to_chrono),
                    content_type: None,
                })
            })
            .collect();

        let next_continuation_token = if response.is_truncated() == Some(true) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListPage {
            objects,
            next_continuation_token,
        })
    }
}
