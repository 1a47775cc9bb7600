// ── Reactive snapshot store ──
//
// Rows live behind a `watch` channel: every write replaces the snapshot and
// wakes subscribers. Writers are serialized by `write_lock`. A store opened
// with a path mirrors every snapshot to a JSON file, written before the new
// snapshot is published, so a failed disk write leaves readers untouched.

use std::future::{Future, ready};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, trace, warn};

use super::{Keyed, LocalStore, SnapshotStream, StoreError};

/// Bounds every cached row type meets.
pub trait CachedRow: Keyed + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T: Keyed + Clone + Serialize + DeserializeOwned + Send + Sync + 'static> CachedRow for T {}

/// `None` until the first write, so a fresh store yields no snapshot at all
/// (which is different from a store holding zero rows).
pub struct MemoryStore<T> {
    rows: watch::Sender<Option<Arc<Vec<T>>>>,
    writes: AtomicU64,
    file: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl<T: CachedRow> MemoryStore<T> {
    pub fn new() -> Self {
        Self::from_parts(None, None)
    }

    /// A store that already holds `items` (possibly none).
    pub fn with_items(items: Vec<T>) -> Self {
        Self::from_parts(Some(items), None)
    }

    /// A store mirrored to `path`.
    ///
    /// Rows already on disk become the first snapshot. A missing file is a
    /// fresh store; an unreadable one is logged and treated as missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let rows = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<T>>(&bytes) {
                Ok(rows) => Some(rows),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable cache file");
                    None
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(unavailable(&path, &e)),
        };
        debug!(path = %path.display(), cached = rows.as_ref().map(Vec::len), "opened store");
        Ok(Self::from_parts(rows, Some(path)))
    }

    fn from_parts(rows: Option<Vec<T>>, file: Option<PathBuf>) -> Self {
        let (rows, _) = watch::channel(rows.map(Arc::new));
        Self {
            rows,
            writes: AtomicU64::new(0),
            file,
            write_lock: Mutex::new(()),
        }
    }

    /// Current rows, or `None` if never written.
    pub fn snapshot(&self) -> Option<Vec<T>> {
        self.rows.borrow().as_deref().cloned()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// The mirror file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    async fn upsert(&self, items: Vec<T>) -> Result<(), StoreError> {
        if let Some(bad) = items.iter().position(|item| item.key().is_empty()) {
            return Err(StoreError::Constraint(format!("row {bad} has an empty key")));
        }

        let _guard = self.write_lock.lock().await;
        let mut merged = self.snapshot().unwrap_or_default();
        for item in items {
            match merged.iter_mut().find(|row| row.key() == item.key()) {
                Some(row) => *row = item,
                None => merged.push(item),
            }
        }

        if let Some(path) = &self.file {
            write_file(path, &merged).await?;
        }

        trace!(rows = merged.len(), "store snapshot replaced");
        self.rows.send_replace(Some(Arc::new(merged)));
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl<T: CachedRow> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CachedRow> LocalStore<T> for MemoryStore<T> {
    fn read(&self) -> SnapshotStream<T> {
        WatchStream::new(self.rows.subscribe())
            .filter_map(|rows| ready(rows.map(|rows| Vec::clone(&rows))))
            .boxed()
    }

    fn write_all(&self, items: Vec<T>) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.upsert(items)
    }

    fn insert(&self, item: T) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.upsert(vec![item])
    }
}

/// Replace `path` with `rows` via a sibling temp file and a rename.
async fn write_file<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    let json = serde_json::to_vec(rows)
        .map_err(|e| StoreError::Unavailable(format!("cannot encode rows: {e}")))?;
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| unavailable(dir, &e))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| unavailable(&tmp, &e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| unavailable(path, &e))
}

fn unavailable(path: &Path, err: &std::io::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {err}", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tokio_test::{assert_pending, task};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Item(String, u32);

    fn item(key: &str, n: u32) -> Item {
        Item(key.to_owned(), n)
    }

    impl Keyed for Item {
        fn key(&self) -> &str {
            &self.0
        }
    }

    #[tokio::test]
    async fn fresh_store_yields_nothing_until_written() {
        let store = MemoryStore::<Item>::new();
        let mut rows = store.read();
        {
            let mut next = task::spawn(rows.next());
            assert_pending!(next.poll());
        }

        store.write_all(vec![item("a", 1)]).await.unwrap();
        assert_eq!(rows.next().await.unwrap(), vec![item("a", 1)]);
    }

    #[tokio::test]
    async fn seeded_store_yields_immediately() {
        let store = MemoryStore::with_items(Vec::<Item>::new());
        let first = store.read().next().await.unwrap();
        assert!(first.is_empty());
    }

    #[tokio::test]
    async fn writes_upsert_by_key_in_order() {
        let store = MemoryStore::with_items(vec![item("a", 1), item("b", 1)]);
        store.write_all(vec![item("b", 2), item("c", 1)]).await.unwrap();
        store.insert(item("a", 3)).await.unwrap();

        assert_eq!(
            store.snapshot().unwrap(),
            vec![item("a", 3), item("b", 2), item("c", 1)]
        );
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn empty_key_rejects_the_whole_batch() {
        let store = MemoryStore::with_items(vec![item("a", 1)]);
        let err = store.write_all(vec![item("b", 1), item("", 1)]).await.unwrap_err();

        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.snapshot().unwrap(), vec![item("a", 1)]);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn file_backed_rows_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("items.json");

        let store = MemoryStore::<Item>::open(&path).await.unwrap();
        assert!(store.snapshot().is_none());
        store.write_all(vec![item("a", 1), item("b", 2)]).await.unwrap();
        store.insert(item("a", 5)).await.unwrap();
        drop(store);

        let reopened = MemoryStore::<Item>::open(&path).await.unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.snapshot().unwrap(), vec![item("a", 5), item("b", 2)]);
        assert_eq!(
            reopened.read().next().await.unwrap(),
            vec![item("a", 5), item("b", 2)]
        );
    }

    #[tokio::test]
    async fn unreadable_file_opens_as_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, "not json").unwrap();

        let store = MemoryStore::<Item>::open(&path).await.unwrap();
        assert!(store.snapshot().is_none());

        store.insert(item("a", 1)).await.unwrap();
        let on_disk: Vec<Item> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk, vec![item("a", 1)]);
    }

    #[tokio::test]
    async fn failed_disk_write_leaves_snapshot_alone() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("cache");
        let store = MemoryStore::<Item>::open(parent.join("items.json")).await.unwrap();

        // A regular file where the cache directory should be.
        std::fs::write(&parent, "").unwrap();
        let err = store.insert(item("a", 1)).await.unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.snapshot().is_none());
        assert_eq!(store.write_count(), 0);
    }
}
