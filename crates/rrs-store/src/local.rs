//! Filesystem-backed object store.
//!
//! [`LocalObjectStore`] maps store paths onto a directory tree. Uploads are
//! streamed into a hidden sibling file and renamed into place once the
//! stream completes, so a dropped or failed upload never leaves a
//! truncated object under its final name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::error::{StoreError, StoreResult};
use crate::path;
use crate::traits::{DirEntry, EntryKind, ObjectMeta, ObjectReader, ObjectStore};

/// Marker embedded in the names of in-flight upload files.
const PARTIAL_MARKER: &str = ".rrs-partial.";

static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

/// An [`ObjectStore`] backed by the local filesystem.
///
/// All paths are mapped under the configured `base_dir`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    base_dir: PathBuf,
}

impl LocalObjectStore {
    /// Create a new store rooted at `base_dir`, creating it if needed.
    pub async fn new(base_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        debug!(base_dir = %base_dir.display(), "LocalObjectStore initialised");
        Ok(Self { base_dir })
    }

    /// Return the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Return the filesystem path for a normalised store key.
    fn key_to_path(&self, key: &str) -> PathBuf {
        let mut p = self.base_dir.clone();
        for part in key.split('/').filter(|s| !s.is_empty()) {
            p.push(part);
        }
        p
    }

    fn partial_path(&self, target: &Path) -> PathBuf {
        let seq = PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!(
            ".{name}{PARTIAL_MARKER}{}.{seq}",
            std::process::id()
        ))
    }
}

/// Map an I/O error on `key` into the store taxonomy.
fn map_io(key: &str, e: std::io::Error) -> StoreError {
    match e.kind() {
        ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
        _ => StoreError::Io(e),
    }
}

/// Removes an unfinished upload file unless disarmed.
struct PartialGuard {
    path: Option<PathBuf>,
}

impl PartialGuard {
    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for PartialGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "failed to remove partial upload");
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[instrument(skip(self), fields(path = %path))]
    async fn stat(&self, path: &str) -> StoreResult<ObjectMeta> {
        let key = path::normalize(path)?;
        let meta = fs::metadata(self.key_to_path(&key))
            .await
            .map_err(|e| map_io(&key, e))?;
        if meta.is_dir() {
            return Err(StoreError::IsADirectory(key));
        }
        Ok(ObjectMeta {
            path: key,
            size: meta.len(),
        })
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn open(&self, path: &str) -> StoreResult<(ObjectMeta, ObjectReader)> {
        let key = path::normalize(path)?;
        let file = fs::File::open(self.key_to_path(&key))
            .await
            .map_err(|e| map_io(&key, e))?;
        let meta = file.metadata().await?;
        if meta.is_dir() {
            return Err(StoreError::IsADirectory(key));
        }
        debug!(size = meta.len(), "opened object");
        let size = meta.len();
        Ok((ObjectMeta { path: key, size }, Box::pin(file)))
    }

    #[instrument(skip(self, data), fields(path = %path))]
    async fn put(&self, path: &str, mut data: ObjectReader) -> StoreResult<u64> {
        let key = path::normalize(path)?;
        if key.is_empty() {
            return Err(StoreError::IsADirectory(key));
        }
        let target = self.key_to_path(&key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = self.partial_path(&target);
        let mut guard = PartialGuard {
            path: Some(partial.clone()),
        };
        let mut file = fs::File::create(&partial).await?;
        let written = tokio::io::copy(&mut data, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&partial, &target).await?;
        guard.disarm();
        debug!(bytes = written, "stored object");
        Ok(written)
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn remove(&self, path: &str) -> StoreResult<()> {
        let key = path::normalize(path)?;
        let target = self.key_to_path(&key);
        let meta = fs::metadata(&target).await.map_err(|e| map_io(&key, e))?;
        if meta.is_dir() {
            return Err(StoreError::IsADirectory(key));
        }
        fs::remove_file(&target)
            .await
            .map_err(|e| map_io(&key, e))?;
        debug!("removed object");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn mkdir(&self, path: &str) -> StoreResult<()> {
        let key = path::normalize(path)?;
        let target = self.key_to_path(&key);
        match fs::create_dir_all(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::NotADirectory(key))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(dir = %dir))]
    async fn list(&self, dir: &str) -> StoreResult<Vec<DirEntry>> {
        let key = path::normalize(dir)?;
        let target = self.key_to_path(&key);
        let meta = fs::metadata(&target).await.map_err(|e| map_io(&key, e))?;
        if !meta.is_dir() {
            return Err(StoreError::NotADirectory(key));
        }
        let mut read_dir = fs::read_dir(&target).await.map_err(|e| map_io(&key, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.contains(PARTIAL_MARKER) {
                continue;
            }
            let meta = entry.metadata().await?;
            let (kind, size) = if meta.is_dir() {
                (EntryKind::Directory, 0)
            } else {
                (EntryKind::Object, meta.len())
            };
            entries.push(DirEntry {
                path: path::child(&key, &name),
                kind,
                size,
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(count = entries.len(), "listed directory");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;
    use tokio::io::{AsyncRead, AsyncReadExt};

    async fn test_store() -> (LocalObjectStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = LocalObjectStore::new(tmp.path()).await.unwrap();
        (store, tmp)
    }

    fn reader(data: &'static [u8]) -> ObjectReader {
        Box::pin(Cursor::new(data))
    }

    #[tokio::test]
    async fn put_and_open() {
        let (store, tmp) = test_store().await;
        let n = store.put("data/ab/abcdef", reader(b"hello")).await.unwrap();
        assert_eq!(n, 5);
        assert!(tmp.path().join("data/ab/abcdef").is_file());

        let (meta, mut r) = store.open("data/ab/abcdef").await.unwrap();
        assert_eq!(meta.size, 5);
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"hello");
    }

    #[tokio::test]
    async fn put_leaves_no_partial_files() {
        let (store, _tmp) = test_store().await;
        store.put("keys/k", reader(b"key")).await.unwrap();
        store.put("keys/k", reader(b"key2")).await.unwrap();
        let entries = store.list("keys").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "k");
        assert_eq!(entries[0].size, 4);
    }

    /// Reader that fails on every poll.
    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::other("connection reset")))
        }
    }

    fn interrupted(data: &'static [u8]) -> ObjectReader {
        Box::pin(Cursor::new(data).chain(Broken))
    }

    #[tokio::test]
    async fn failed_upload_leaves_nothing_behind() {
        let (store, tmp) = test_store().await;
        store.mkdir("snapshots").await.unwrap();

        let err = store
            .put("snapshots/s1", interrupted(b"partial"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.stat("snapshots/s1").await.unwrap_err().is_not_found());

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join("snapshots"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(leftovers.is_empty(), "{leftovers:?}");
    }

    #[tokio::test]
    async fn failed_overwrite_keeps_previous_object() {
        let (store, tmp) = test_store().await;
        store.put("keys/k", reader(b"old")).await.unwrap();
        assert!(store.put("keys/k", interrupted(b"new")).await.is_err());

        let names: Vec<_> = std::fs::read_dir(tmp.path().join("keys"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["k"]);
        assert!(!names.iter().any(|n| n.contains(PARTIAL_MARKER)));
        assert_eq!(store.stat("keys/k").await.unwrap().size, 3);
    }

    #[tokio::test]
    async fn list_skips_in_flight_uploads() {
        let (store, tmp) = test_store().await;
        store.mkdir("index").await.unwrap();
        std::fs::write(tmp.path().join("index/.x.rrs-partial.1.0"), b"zz").unwrap();
        std::fs::write(tmp.path().join("index/i1"), b"i").unwrap();
        let names: Vec<String> = store
            .list("index")
            .await
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["i1"]);
    }

    #[tokio::test]
    async fn stat_and_remove() {
        let (store, _tmp) = test_store().await;
        store.put("locks/l", reader(b"lock")).await.unwrap();
        assert_eq!(store.stat("locks/l").await.unwrap().size, 4);
        store.remove("locks/l").await.unwrap();
        assert!(store.stat("locks/l").await.unwrap_err().is_not_found());
        assert!(store.remove("locks/l").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn stat_directory_is_rejected() {
        let (store, _tmp) = test_store().await;
        store.mkdir("snapshots").await.unwrap();
        assert!(matches!(
            store.stat("snapshots").await,
            Err(StoreError::IsADirectory(_))
        ));
        assert!(matches!(
            store.remove("snapshots").await,
            Err(StoreError::IsADirectory(_))
        ));
    }

    #[tokio::test]
    async fn mkdir_is_idempotent() {
        let (store, tmp) = test_store().await;
        store.mkdir("repo/data/ff").await.unwrap();
        store.mkdir("repo/data/ff").await.unwrap();
        assert!(tmp.path().join("repo/data/ff").is_dir());
    }

    #[tokio::test]
    async fn list_is_sorted() {
        let (store, _tmp) = test_store().await;
        for name in ["c", "a", "b"] {
            store.mkdir(&format!("data/{name}")).await.unwrap();
        }
        let entries = store.list("./data").await.unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["data/a", "data/b", "data/c"]);
        assert!(entries.iter().all(|e| e.is_dir()));
    }

    #[tokio::test]
    async fn list_missing_is_not_found() {
        let (store, _tmp) = test_store().await;
        assert!(store.list("nothing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn open_missing_is_not_found() {
        let (store, _tmp) = test_store().await;
        assert!(matches!(
            store.open("config").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
