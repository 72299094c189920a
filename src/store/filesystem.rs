//! Directory-backed object store
//!
//! Keys are `/`-separated paths relative to the root directory. This mirrors
//! how the renderer writes its output tree to local disk before it is synced
//! to a bucket.

use super::{ObjectStore, StoreError, StoreResult, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::{debug, warn};

/// Object store reading files below a root directory
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        FsObjectStore {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of this store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a key, or `None` if the key cannot name a file below root
    fn path_for(&self, key: &str) -> Option<PathBuf> {
        if key.is_empty() {
            return None;
        }

        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return None;
            }
            path.push(segment);
        }
        Some(path)
    }

    /// Children of a directory that can still produce keys under `prefix`
    async fn read_children(
        &self,
        dir: &ListEntry,
        prefix: &str,
    ) -> std::io::Result<Vec<ListEntry>> {
        let mut entries = fs::read_dir(&dir.path).await?;
        let mut children = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let is_dir = entry.file_type().await?.is_dir();
            let key = if is_dir {
                format!("{}{}/", dir.key, name)
            } else {
                format!("{}{}", dir.key, name)
            };

            let wanted = if is_dir {
                key.starts_with(prefix) || prefix.starts_with(&key)
            } else {
                key.starts_with(prefix)
            };
            if wanted {
                children.push(ListEntry {
                    path: entry.path(),
                    key,
                    is_dir,
                });
            }
        }

        Ok(children)
    }
}

/// Pending node of a listing walk. Directory keys end with `/`.
struct ListEntry {
    path: PathBuf,
    key: String,
    is_dir: bool,
}

/// Whether an IO error means the key simply does not exist
fn is_absent(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// Quoted etag from file size and modification time
fn file_etag(metadata: &std::fs::Metadata) -> String {
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok());

    match modified {
        Some(mtime) => format!(
            "\"{:x}-{:x}{:08x}\"",
            metadata.len(),
            mtime.as_secs(),
            mtime.subsec_nanos()
        ),
        None => format!("\"{:x}\"", metadata.len()),
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> StoreResult<Option<StoredObject>> {
        let Some(path) = self.path_for(key) else {
            debug!("Rejected key that does not map below store root: key={}", key);
            return Ok(None);
        };

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if is_absent(&e) => return Ok(None),
            Err(e) => {
                warn!("Failed to stat key={}: {}", key, e);
                return Err(StoreError::io(key, e.to_string()));
            }
        };

        if !metadata.is_file() {
            return Ok(None);
        }

        let body = match fs::read(&path).await {
            Ok(body) => body,
            // Removed between stat and read
            Err(e) if is_absent(&e) => return Ok(None),
            Err(e) => {
                warn!("Failed to read key={}: {}", key, e);
                return Err(StoreError::io(key, e.to_string()));
            }
        };

        Ok(Some(StoredObject {
            key: key.to_string(),
            etag: file_etag(&metadata),
            size: body.len() as u64,
            body: Bytes::from(body),
        }))
    }

    async fn list(&self, prefix: &str, limit: usize) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        if limit == 0 {
            return Ok(keys);
        }

        // Depth-first in key order: entries are popped smallest key first, so
        // the walk can stop as soon as `limit` keys are collected
        let mut pending = vec![ListEntry {
            path: self.root.clone(),
            key: String::new(),
            is_dir: true,
        }];

        while let Some(entry) = pending.pop() {
            if !entry.is_dir {
                keys.push(entry.key);
                if keys.len() == limit {
                    break;
                }
                continue;
            }

            let mut children = match self.read_children(&entry, prefix).await {
                Ok(children) => children,
                Err(e) if is_absent(&e) => continue,
                Err(e) => return Err(StoreError::io(entry.key, e.to_string())),
            };
            children.sort_by(|a, b| a.key.cmp(&b.key));
            pending.extend(children.into_iter().rev());
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, key: &str, body: &[u8]) {
        let path = root.join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[tokio::test]
    async fn test_get_existing_and_missing() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "world/tiles/0/x0/z0.prbm.gz", b"tile");
        let store = FsObjectStore::new(dir.path());

        let object = store.get("world/tiles/0/x0/z0.prbm.gz").await.unwrap().unwrap();
        assert_eq!(object.body, Bytes::from_static(b"tile"));
        assert_eq!(object.size, 4);
        assert!(object.etag.starts_with("\"4-"));

        assert!(store.get("world/tiles/0/x0/z0.prbm").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_is_not_an_object() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "world/settings.json.gz", b"{}");
        let store = FsObjectStore::new(dir.path());

        assert!(store.get("world").await.unwrap().is_none());
        assert!(store.get("world/settings.json.gz/child").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_traversal_keys_are_absent() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "inner/secret.txt", b"x");
        let store = FsObjectStore::new(dir.path().join("inner"));

        assert!(store.get("../inner/secret.txt").await.unwrap().is_none());
        assert!(store.get("./secret.txt").await.unwrap().is_none());
        assert!(store.get("a//b").await.unwrap().is_none());
        assert!(store.get("").await.unwrap().is_none());
        assert!(store.get("secret.txt").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_prefix_and_limit() {
        let dir = TempDir::new().unwrap();
        for key in [
            "index.html",
            "world/settings.json.gz",
            "world/tiles/0/x0/z0.prbm.gz",
            "world/tiles/0/x0/z1.prbm.gz",
            "nether/settings.json.gz",
        ] {
            write(dir.path(), key, b"x");
        }
        let store = FsObjectStore::new(dir.path());

        assert_eq!(
            store.list("world/", 10).await.unwrap(),
            vec![
                "world/settings.json.gz",
                "world/tiles/0/x0/z0.prbm.gz",
                "world/tiles/0/x0/z1.prbm.gz",
            ]
        );
        assert_eq!(
            store.list("world/tiles/0/x0/z1", 10).await.unwrap(),
            vec!["world/tiles/0/x0/z1.prbm.gz"]
        );
        assert_eq!(store.list("", 2).await.unwrap().len(), 2);
        assert_eq!(store.list("", 100).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_list_follows_key_order_across_directories() {
        let dir = TempDir::new().unwrap();
        for key in ["a/x", "a.txt", "a-b", "b"] {
            write(dir.path(), key, b"x");
        }
        let store = FsObjectStore::new(dir.path());

        assert_eq!(
            store.list("", 10).await.unwrap(),
            vec!["a-b", "a.txt", "a/x", "b"]
        );
        assert_eq!(store.list("a", 2).await.unwrap(), vec!["a-b", "a.txt"]);
        assert!(store.list("", 0).await.unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_stops_before_unread_directories() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        for key in ["a/one", "a/two", "z/three"] {
            write(dir.path(), key, b"x");
        }
        let locked = dir.path().join("z");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        let store = FsObjectStore::new(dir.path());

        // Reading `z` would fail for an unprivileged user, so the walk must end first
        let keys = store.list("", 2).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(keys.unwrap(), vec!["a/one", "a/two"]);
    }

    #[tokio::test]
    async fn test_missing_root_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path().join("does-not-exist"));
        assert!(store.list("", 10).await.unwrap().is_empty());
        assert!(store.get("index.html").await.unwrap().is_none());
    }
}
