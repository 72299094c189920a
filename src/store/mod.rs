//! Object store abstraction
//!
//! The negotiation engine only needs two read operations from a backing store:
//! get-by-key and a bounded prefix listing. Everything else about storage
//! (uploads, replication, bucket provisioning) lives outside this crate.
//!
//! Two backends are provided:
//!
//! - [`InMemoryObjectStore`]: process-local map for tests and embedding
//! - [`FsObjectStore`]: a directory whose relative file paths are the keys

pub mod filesystem;
pub mod memory;

pub use filesystem::FsObjectStore;
pub use memory::InMemoryObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures of the store itself, as opposed to an authoritative miss
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store IO error on key {key}: {message}")]
    Io { key: String, message: String },
}

impl StoreError {
    pub fn io(key: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Io {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// An object as returned by the store, before negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    /// Quoted entity tag
    pub etag: String,
    pub size: u64,
    pub body: Bytes,
}

/// Read-only view of a key/value object store
///
/// - `get` returns `Ok(None)` only when the key authoritatively does not exist
/// - `get` returns `Err` when the store could not answer
/// - implementations must never mutate contents as a side effect of reads
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object by exact key
    async fn get(&self, key: &str) -> StoreResult<Option<StoredObject>>;

    /// List keys starting with `prefix`, in ascending order, at most `limit`
    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<String>>;
}
