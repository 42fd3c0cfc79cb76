//! ImageService: upload, list and delete images in the configured bucket.
//!
//! Uploads are validated (size, MIME allow-list), optionally re-encoded to
//! WebP, named, and written in one `put_object` call. No state is kept
//! between requests; the bucket is the source of truth.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::UploadDefaults;
use crate::models::object::StoredObject;
use crate::services::{
    naming,
    normalizer::{self, mime_for_key},
    object_store::{
        IMMUTABLE_CACHE_CONTROL, MAX_LIST_PAGE, ObjectInfo, ObjectStore, PutObject, StoreError,
    },
};

pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

pub const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file provided")]
    MissingFile,
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Invalid quality `{0}`: expected an integer between 1 and 100")]
    InvalidQuality(String),
    #[error("Missing object key")]
    MissingKey,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Options chosen by the uploader; `None` falls back to configured defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadOptions {
    pub compress: Option<bool>,
    pub quality: Option<u8>,
    pub use_hash_name: Option<bool>,
}

/// One inbound file.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Bytes,
    pub mime_type: String,
    pub filename: String,
    pub options: UploadOptions,
}

#[derive(Clone)]
pub struct ImageService {
    store: Arc<dyn ObjectStore>,
    public_url: String,
    defaults: UploadDefaults,
}

impl ImageService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        public_url: impl Into<String>,
        defaults: UploadDefaults,
    ) -> Self {
        Self {
            store,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            defaults,
        }
    }

    pub fn defaults(&self) -> &UploadDefaults {
        &self.defaults
    }

    pub fn public_url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    fn describe(&self, info: ObjectInfo) -> StoredObject {
        let mime_type = info
            .content_type
            .unwrap_or_else(|| mime_for_key(&info.key).to_string());
        StoredObject {
            url: self.public_url_for(&info.key),
            size: info.size,
            mime_type,
            uploaded_at: info.last_modified.unwrap_or(DateTime::UNIX_EPOCH),
            key: info.key,
        }
    }

    /// Validate, normalize, name and store one upload.
    ///
    /// Validation failures never reach the store.
    pub async fn upload(&self, request: UploadRequest) -> Result<StoredObject, UploadError> {
        let size = request.bytes.len();
        if size > self.defaults.max_file_size {
            return Err(UploadError::TooLarge {
                size,
                limit: self.defaults.max_file_size,
            });
        }
        if !ALLOWED_MIME_TYPES.contains(&request.mime_type.as_str()) {
            return Err(UploadError::UnsupportedType(request.mime_type));
        }

        let compress = request
            .options
            .compress
            .unwrap_or(self.defaults.enable_webp_compression);
        let quality = request.options.quality.unwrap_or(self.defaults.quality);
        let use_hash_name = request
            .options
            .use_hash_name
            .unwrap_or(self.defaults.use_hash_name);

        let normalized = {
            let bytes = request.bytes.clone();
            let mime_type = request.mime_type.clone();
            // Decode and encode are CPU bound; keep them off the async workers.
            tokio::task::spawn_blocking(move || {
                normalizer::normalize(bytes, &mime_type, compress, quality)
            })
            .await
            .unwrap_or_else(|e| {
                normalizer::passthrough(request.bytes, &request.mime_type, Some(e.to_string()))
            })
        };
        if let Some(reason) = &normalized.failure {
            warn!(
                "WebP conversion of {} failed, storing original: {}",
                request.filename, reason
            );
        }

        let uploaded_at = Utc::now();
        let key = naming::generate_key(
            &request.filename,
            normalized.extension,
            use_hash_name,
            uploaded_at.timestamp_millis(),
        );
        let stored_size = normalized.bytes.len() as u64;

        self.store
            .put_object(PutObject {
                key: key.clone(),
                body: normalized.bytes,
                content_type: normalized.mime_type.clone(),
                cache_control: Some(IMMUTABLE_CACHE_CONTROL.to_string()),
            })
            .await?;

        info!(
            "stored {} as {} ({} -> {} bytes, compressed: {})",
            request.filename, key, size, stored_size, normalized.was_compressed
        );

        Ok(StoredObject {
            url: self.public_url_for(&key),
            key,
            size: stored_size,
            mime_type: normalized.mime_type,
            uploaded_at,
        })
    }

    /// Return `[offset, offset + limit)` of the bucket listing in store order.
    ///
    /// Follows continuation tokens, so offsets past the first store page are
    /// reachable.
    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<StoredObject>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.min(MAX_LIST_PAGE);
        let wanted = offset.saturating_add(limit);

        let mut collected: Vec<ObjectInfo> = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let remaining = (wanted - collected.len()).min(MAX_LIST_PAGE);
            let page = self.store.list_objects(remaining, token.as_deref()).await?;
            let empty = page.objects.is_empty();
            collected.extend(page.objects);

            match page.next_continuation_token {
                Some(next) if !empty && collected.len() < wanted => token = Some(next),
                _ => break,
            }
        }

        Ok(collected
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|info| self.describe(info))
            .collect())
    }

    /// Delete one object. Missing keys are not an error.
    pub async fn delete(&self, key: &str) -> Result<(), UploadError> {
        if key.trim().is_empty() {
            return Err(UploadError::MissingKey);
        }
        self.store.delete_object(key).await?;
        info!("deleted {}", key);
        Ok(())
    }

    /// Delete each key independently. Failures are logged and skipped;
    /// returns how many deletes succeeded.
    pub async fn delete_many(&self, keys: &[String]) -> usize {
        let mut deleted = 0;
        for key in keys {
            match self.delete(key).await {
                Ok(()) => deleted += 1,
                Err(err) => warn!("failed to delete {}: {}", key, err),
            }
        }
        deleted
    }

    /// Cheapest possible round trip to the bucket.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.list_objects(1, None).await.map(|_| ())
    }
}
