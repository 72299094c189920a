//! Object fetcher for retrieving candidate keys from the object store

use crate::error::{GateError, Result};
use crate::models::{CandidateKey, ContentEncoding, ObjectRecord};
use crate::store::ObjectStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// ObjectFetcher is responsible for reading one candidate key from the store
///
/// It never writes to the store and never retries. Store failures surface as
/// [`GateError::StoreUnavailable`] so an outage is not mistaken for an absent
/// object.
#[derive(Clone)]
pub struct ObjectFetcher {
    store: Arc<dyn ObjectStore>,
}

impl ObjectFetcher {
    /// Create a new ObjectFetcher over a store
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        ObjectFetcher { store }
    }

    /// Fetch one candidate
    ///
    /// # Returns
    /// * `Ok(Some(ObjectRecord))` if the key exists
    /// * `Ok(None)` if the store authoritatively reports the key as absent
    /// * `Err(GateError::StoreUnavailable)` if the store could not answer
    pub async fn fetch(&self, candidate: &CandidateKey) -> Result<Option<ObjectRecord>> {
        debug!(
            "Probing key={} priority={} expect_compressed={}",
            candidate.key, candidate.priority, candidate.expect_compressed
        );

        let object = self.store.get(&candidate.key).await.map_err(|e| {
            warn!("Store read failed for key={}: {}", candidate.key, e);
            GateError::StoreUnavailable(e.to_string())
        })?;

        let Some(object) = object else {
            debug!("Miss for key={}", candidate.key);
            return Ok(None);
        };

        let content_encoding = if candidate.expect_compressed {
            ContentEncoding::Gzip
        } else {
            ContentEncoding::None
        };

        debug!(
            "Hit for key={}: size={}, etag={}, encoding={:?}",
            object.key, object.size, object.etag, content_encoding
        );

        Ok(Some(ObjectRecord {
            logical_key: candidate.logical_key().to_string(),
            key: object.key,
            etag: object.etag,
            size_bytes: object.size,
            content_encoding,
            body: object.body,
        }))
    }

    /// Access the underlying store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryObjectStore;

    #[tokio::test]
    async fn test_fetch_compressed_candidate() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("world/textures.json.gz", &b"\x1f\x8b"[..]).await;
        let fetcher = ObjectFetcher::new(store);

        let record = fetcher
            .fetch(&CandidateKey::new("world/textures.json.gz", true, 0))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.key, "world/textures.json.gz");
        assert_eq!(record.logical_key, "world/textures.json");
        assert_eq!(record.content_encoding, ContentEncoding::Gzip);
        assert_eq!(record.size_bytes, 2);
    }

    #[tokio::test]
    async fn test_fetch_plain_candidate() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("index.html", "<html></html>").await;
        let fetcher = ObjectFetcher::new(store);

        let record = fetcher
            .fetch(&CandidateKey::new("index.html", false, 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.content_encoding, ContentEncoding::None);
        assert_eq!(record.logical_key, "index.html");
    }

    #[tokio::test]
    async fn test_fetch_miss() {
        let fetcher = ObjectFetcher::new(Arc::new(InMemoryObjectStore::new()));
        let result = fetcher.fetch(&CandidateKey::new("nope", false, 0)).await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_fetch_store_failure_is_not_a_miss() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("index.html", "x").await;
        store.set_unavailable(true);
        let fetcher = ObjectFetcher::new(store);

        let result = fetcher.fetch(&CandidateKey::new("index.html", false, 0)).await;
        assert!(matches!(result, Err(GateError::StoreUnavailable(_))));
    }
}
