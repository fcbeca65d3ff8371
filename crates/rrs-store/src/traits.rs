use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::StoreResult;
use crate::path;

/// A byte stream flowing into or out of the store.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata for a stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Normalised path of the object.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
}

/// Kind of a directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Object,
    Directory,
}

/// A single child returned by [`ObjectStore::list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// Normalised path of the entry, including its parent directory.
    pub path: String,
    pub kind: EntryKind,
    /// Size in bytes for objects, zero for directories.
    pub size: u64,
}

impl DirEntry {
    /// The entry's final path component.
    pub fn name(&self) -> &str {
        path::base_name(&self.path)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Hierarchical object store.
///
/// All implementations must satisfy these invariants:
/// - `mkdir` is idempotent: creating an existing directory succeeds, and
///   missing parents are created.
/// - `put` creates missing parent directories and replaces any existing
///   object at the path.
/// - `list` returns direct children only, sorted by name.
/// - Implementations are safe for concurrent use; no further coordination
///   (single writer, read-after-write) is promised.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Look up an object's size without reading it.
    ///
    /// Returns `NotFound` if nothing exists at the path and `IsADirectory`
    /// if the path names a directory.
    async fn stat(&self, path: &str) -> StoreResult<ObjectMeta>;

    /// Open an object for streaming reads.
    async fn open(&self, path: &str) -> StoreResult<(ObjectMeta, ObjectReader)>;

    /// Stream `data` into an object at `path`, returning the bytes written.
    ///
    /// The object becomes visible under `path` only once the stream has been
    /// fully consumed.
    async fn put(&self, path: &str, data: ObjectReader) -> StoreResult<u64>;

    /// Remove an object. Returns `NotFound` if it does not exist.
    async fn remove(&self, path: &str) -> StoreResult<()>;

    /// Create a directory and any missing parents.
    async fn mkdir(&self, path: &str) -> StoreResult<()>;

    /// List the direct children of a directory, sorted by name.
    ///
    /// Returns `NotFound` if the directory does not exist.
    async fn list(&self, dir: &str) -> StoreResult<Vec<DirEntry>>;
}
