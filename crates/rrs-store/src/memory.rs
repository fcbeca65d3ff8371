use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use crate::error::{StoreError, StoreResult};
use crate::path;
use crate::traits::{DirEntry, EntryKind, ObjectMeta, ObjectReader, ObjectStore};

#[derive(Clone, Debug)]
enum Node {
    Object(Bytes),
    Directory,
}

/// In-memory, `BTreeMap`-based object store.
///
/// Intended for tests and embedding. Nodes are keyed by normalised path
/// behind a `RwLock`; the root directory always exists implicitly. Uploads
/// are buffered in full before they become visible.
pub struct InMemoryObjectStore {
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of objects currently stored (directories excluded).
    pub fn object_count(&self) -> usize {
        self.nodes
            .read()
            .expect("lock poisoned")
            .values()
            .filter(|n| matches!(n, Node::Object(_)))
            .count()
    }

    /// Number of directories currently stored (root excluded).
    pub fn dir_count(&self) -> usize {
        self.nodes
            .read()
            .expect("lock poisoned")
            .values()
            .filter(|n| matches!(n, Node::Directory))
            .count()
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.nodes.read().expect("lock poisoned").is_empty()
    }

    /// Returns `true` if `path` names an existing directory.
    pub fn is_dir(&self, path: &str) -> bool {
        let Ok(key) = path::normalize(path) else {
            return false;
        };
        key.is_empty()
            || matches!(
                self.nodes.read().expect("lock poisoned").get(&key),
                Some(Node::Directory)
            )
    }

    /// Insert every missing ancestor of `key` as a directory.
    fn ensure_parents(nodes: &mut BTreeMap<String, Node>, key: &str) -> StoreResult<()> {
        let mut current = path::parent(key);
        while let Some(dir) = current {
            if dir.is_empty() {
                break;
            }
            match nodes.get(dir) {
                Some(Node::Directory) => break,
                Some(Node::Object(_)) => return Err(StoreError::NotADirectory(dir.to_string())),
                None => {
                    nodes.insert(dir.to_string(), Node::Directory);
                }
            }
            current = path::parent(dir);
        }
        Ok(())
    }

    fn lookup(&self, key: &str) -> StoreResult<Bytes> {
        let nodes = self.nodes.read().expect("lock poisoned");
        match nodes.get(key) {
            Some(Node::Object(data)) => Ok(data.clone()),
            Some(Node::Directory) => Err(StoreError::IsADirectory(key.to_string())),
            None if key.is_empty() => Err(StoreError::IsADirectory(key.to_string())),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn stat(&self, path: &str) -> StoreResult<ObjectMeta> {
        let key = path::normalize(path)?;
        let data = self.lookup(&key)?;
        Ok(ObjectMeta {
            path: key,
            size: data.len() as u64,
        })
    }

    async fn open(&self, path: &str) -> StoreResult<(ObjectMeta, ObjectReader)> {
        let key = path::normalize(path)?;
        let data = self.lookup(&key)?;
        let meta = ObjectMeta {
            path: key,
            size: data.len() as u64,
        };
        Ok((meta, Box::pin(Cursor::new(data))))
    }

    async fn put(&self, path: &str, mut data: ObjectReader) -> StoreResult<u64> {
        let key = path::normalize(path)?;
        if key.is_empty() {
            return Err(StoreError::IsADirectory(key));
        }
        let mut buf = Vec::new();
        data.read_to_end(&mut buf).await?;
        let size = buf.len() as u64;

        let mut nodes = self.nodes.write().expect("lock poisoned");
        if let Some(Node::Directory) = nodes.get(&key) {
            return Err(StoreError::IsADirectory(key));
        }
        Self::ensure_parents(&mut nodes, &key)?;
        nodes.insert(key, Node::Object(Bytes::from(buf)));
        Ok(size)
    }

    async fn remove(&self, path: &str) -> StoreResult<()> {
        let key = path::normalize(path)?;
        let mut nodes = self.nodes.write().expect("lock poisoned");
        match nodes.get(&key) {
            Some(Node::Object(_)) => {
                nodes.remove(&key);
                Ok(())
            }
            Some(Node::Directory) => Err(StoreError::IsADirectory(key)),
            None => Err(StoreError::NotFound(key)),
        }
    }

    async fn mkdir(&self, path: &str) -> StoreResult<()> {
        let key = path::normalize(path)?;
        if key.is_empty() {
            return Ok(());
        }
        let mut nodes = self.nodes.write().expect("lock poisoned");
        match nodes.get(&key) {
            Some(Node::Directory) => Ok(()),
            Some(Node::Object(_)) => Err(StoreError::NotADirectory(key)),
            None => {
                Self::ensure_parents(&mut nodes, &key)?;
                nodes.insert(key, Node::Directory);
                Ok(())
            }
        }
    }

    async fn list(&self, dir: &str) -> StoreResult<Vec<DirEntry>> {
        let key = path::normalize(dir)?;
        let nodes = self.nodes.read().expect("lock poisoned");
        if !key.is_empty() {
            match nodes.get(&key) {
                Some(Node::Directory) => {}
                Some(Node::Object(_)) => return Err(StoreError::NotADirectory(key)),
                None => return Err(StoreError::NotFound(key)),
            }
        }

        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        // BTreeMap order is byte order of the full path; children sharing a
        // prefix sort by name.
        let entries = nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| !k[prefix.len()..].contains('/'))
            .map(|(k, node)| match node {
                Node::Object(data) => DirEntry {
                    path: k.clone(),
                    kind: EntryKind::Object,
                    size: data.len() as u64,
                },
                Node::Directory => DirEntry {
                    path: k.clone(),
                    kind: EntryKind::Directory,
                    size: 0,
                },
            })
            .collect();
        Ok(entries)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.object_count())
            .field("dir_count", &self.dir_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &'static [u8]) -> ObjectReader {
        Box::pin(Cursor::new(data))
    }

    async fn read_all(store: &InMemoryObjectStore, path: &str) -> Vec<u8> {
        let (_, mut r) = store.open(path).await.unwrap();
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).await.unwrap();
        buf
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_and_open() {
        let store = InMemoryObjectStore::new();
        let n = store.put("repo/keys/k1", reader(b"secret")).await.unwrap();
        assert_eq!(n, 6);
        assert_eq!(read_all(&store, "repo/keys/k1").await, b"secret");
        assert_eq!(store.stat("repo/keys/k1").await.unwrap().size, 6);
    }

    #[tokio::test]
    async fn put_creates_parents() {
        let store = InMemoryObjectStore::new();
        store.put("a/b/c", reader(b"x")).await.unwrap();
        assert!(store.is_dir("a"));
        assert!(store.is_dir("a/b"));
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn put_overwrites() {
        let store = InMemoryObjectStore::new();
        store.put("config", reader(b"one")).await.unwrap();
        store.put("config", reader(b"second")).await.unwrap();
        assert_eq!(read_all(&store, "./config").await, b"second");
        assert_eq!(store.object_count(), 1);
    }

    #[tokio::test]
    async fn stat_missing_is_not_found() {
        let store = InMemoryObjectStore::new();
        let err = store.stat("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn stat_directory_is_rejected() {
        let store = InMemoryObjectStore::new();
        store.mkdir("data").await.unwrap();
        assert!(matches!(
            store.stat("data").await,
            Err(StoreError::IsADirectory(_))
        ));
    }

    #[tokio::test]
    async fn remove_object() {
        let store = InMemoryObjectStore::new();
        store.put("locks/l1", reader(b"")).await.unwrap();
        store.remove("locks/l1").await.unwrap();
        assert!(store.stat("locks/l1").await.unwrap_err().is_not_found());
        assert!(store.remove("locks/l1").await.unwrap_err().is_not_found());
    }

    // -----------------------------------------------------------------------
    // Directories
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn mkdir_is_idempotent() {
        let store = InMemoryObjectStore::new();
        store.mkdir("repo/data/00").await.unwrap();
        store.mkdir("repo/data/00").await.unwrap();
        store.mkdir(".").await.unwrap();
        assert_eq!(store.dir_count(), 3);
    }

    #[tokio::test]
    async fn mkdir_over_object_fails() {
        let store = InMemoryObjectStore::new();
        store.put("config", reader(b"c")).await.unwrap();
        assert!(matches!(
            store.mkdir("config").await,
            Err(StoreError::NotADirectory(_))
        ));
    }

    #[tokio::test]
    async fn list_returns_sorted_direct_children() {
        let store = InMemoryObjectStore::new();
        store.put("snapshots/b", reader(b"2")).await.unwrap();
        store.put("snapshots/a", reader(b"1")).await.unwrap();
        store.put("snapshots/c/nested", reader(b"3")).await.unwrap();
        store.put("snapshotsx", reader(b"4")).await.unwrap();

        let entries = store.list("snapshots").await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(entries[2].is_dir());
        assert_eq!(entries[0].path, "snapshots/a");
    }

    #[tokio::test]
    async fn list_root() {
        let store = InMemoryObjectStore::new();
        store.mkdir("data").await.unwrap();
        store.put("config", reader(b"c")).await.unwrap();
        let names: Vec<String> = store
            .list(".")
            .await
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["config", "data"]);
    }

    #[tokio::test]
    async fn list_missing_dir_is_not_found() {
        let store = InMemoryObjectStore::new();
        assert!(store.list("index").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn parent_traversal_rejected() {
        let store = InMemoryObjectStore::new();
        assert!(matches!(
            store.put("../escape", reader(b"x")).await,
            Err(StoreError::InvalidPath { .. })
        ));
    }
}
