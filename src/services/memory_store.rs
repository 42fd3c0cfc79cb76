//! In-memory `ObjectStore` for tests. Keeps insertion order like a bucket
//! listing would keep key order, and pages with an index cursor.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use crate::services::object_store::{
    ListPage, ObjectInfo, ObjectStore, PutObject, StoreError, StoreResult,
};

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<(ObjectInfo, PutObject)>>,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
    page_size: Option<usize>,
    fail_keys: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap every listing page, regardless of what the caller asks for.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Make deletes of these keys fail.
    pub fn failing_on(mut self, keys: &[&str]) -> Self {
        self.fail_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn seed(&self, keys: &[&str]) {
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.push((
                ObjectInfo {
                    key: key.to_string(),
                    size: 3,
                    last_modified: Some(Utc::now()),
                    content_type: None,
                },
                PutObject {
                    key: key.to_string(),
                    body: bytes::Bytes::from_static(b"abc"),
                    content_type: "application/octet-stream".into(),
                    cache_control: None,
                },
            ));
        }
    }

    pub fn get(&self, key: &str) -> Option<PutObject> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(info, _)| info.key == key)
            .map(|(_, put)| put.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(info, _)| info.key.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, object: PutObject) -> StoreResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let info = ObjectInfo {
            key: object.key.clone(),
            size: object.body.len() as u64,
            last_modified: Some(Utc::now()),
            content_type: Some(object.content_type.clone()),
        };
        let mut objects = self.objects.lock().unwrap();
        objects.retain(|(existing, _)| existing.key != object.key);
        objects.push((info, object));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_keys.iter().any(|k| k == key) {
            return Err(StoreError::Backend(format!("refusing to delete {}", key)));
        }
        self.objects
            .lock()
            .unwrap()
            .retain(|(existing, _)| existing.key != key);
        Ok(())
    }

    async fn list_objects(
        &self,
        max_keys: usize,
        continuation_token: Option<&str>,
    ) -> StoreResult<ListPage> {
        let start = match continuation_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::Backend(format!("bad token {}", token)))?,
            None => 0,
        };
        let page = self.page_size.map_or(max_keys, |cap| cap.min(max_keys));
        let objects = self.objects.lock().unwrap();
        let end = (start + page).min(objects.len());
        let slice = objects
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|(info, _)| info.clone())
            .collect();

        Ok(ListPage {
            objects: slice,
            next_continuation_token: (end < objects.len()).then(|| end.to_string()),
        })
    }
}
