//! Object store abstraction used by the image service.
//!
//! The bucket is treated as a flat key/blob namespace: put, delete and a
//! paginated listing are the only operations the service needs.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Largest page a single ListObjectsV2 call returns.
pub const MAX_LIST_PAGE: usize = 1000;

/// Long-lived caching for uploaded objects; keys are never rewritten.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store error: {0}")]
    Backend(String),
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single object write.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    pub cache_control: Option<String>,
}

/// Information about a stored object from a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    /// Only some backends report this in listings.
    pub content_type: Option<String>,
}

/// One page of a listing plus the cursor for the next one.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    pub next_continuation_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write (or overwrite) an object.
    async fn put_object(&self, object: PutObject) -> StoreResult<()>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete_object(&self, key: &str) -> StoreResult<()>;

    /// Fetch one page of at most `max_keys` objects in store order.
    async fn list_objects(
        &self,
        max_keys: usize,
        continuation_token: Option<&str>,
    ) -> StoreResult<ListPage>;
}
