//! In-memory object store

use super::{ObjectStore, StoreError, StoreResult, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;

/// BTreeMap-based object store
///
/// Intended for tests and embedding. Keeps a count of `get` calls so tests can
/// assert how many probes a request performed, and can be switched into an
/// unavailable state to simulate an outage.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    get_calls: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryObjectStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object; the etag is derived from the content
    pub async fn put(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        let key = key.into();
        let body = body.into();
        let object = StoredObject {
            etag: content_etag(&body),
            size: body.len() as u64,
            key: key.clone(),
            body,
        };
        self.objects.write().await.insert(key, object);
    }

    /// Remove an object, returning whether it existed
    pub async fn remove(&self, key: &str) -> bool {
        self.objects.write().await.remove(key).is_some()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Returns `true` if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Number of `get` calls made so far
    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::Relaxed)
    }

    /// Make every subsequent read fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> StoreResult<Option<StoredObject>> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<String>> {
        self.check_available()?;
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// Quoted etag computed from object content
fn content_etag(body: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("\"{:016x}\"", hasher.finish())
}
