//! Represents an image stored in the bucket, as returned to API clients.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single stored image.
///
/// The bucket is the only owner of the bytes; this is a transient view built
/// from an upload result or a listing entry.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Object key within the bucket.
    pub key: String,

    /// Public URL (`<public base>/<key>`).
    pub url: String,

    /// Size in bytes of what was stored.
    pub size: u64,

    /// Content type (MIME type) of what was stored.
    pub mime_type: String,

    /// Upload time, or last-modified time for listed objects.
    pub uploaded_at: DateTime<Utc>,
}
