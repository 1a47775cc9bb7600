// ── Local store contract ──
//
// The cache is a black box to the reconciler: a live snapshot stream, an
// atomic "insert/replace all", and a single-row insert. `MemoryStore` is the
// implementation the CLI and tests use, optionally mirrored to a JSON file.

mod memory;

use std::future::Future;

use futures_util::stream::BoxStream;
use thiserror::Error;

use islet_api::{Community, Feed, Notice, Timeline};

pub use memory::{CachedRow, MemoryStore};

/// Live snapshots of a store. Lazy, cancellable by dropping, not restartable.
pub type SnapshotStream<T> = BoxStream<'static, Vec<T>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("local store unavailable: {0}")]
    Unavailable(String),

    #[error("write interrupted: {0}")]
    Interrupted(String),
}

/// Primary key of a cached row. Rows with equal keys replace each other.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Community {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Timeline {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Feed {
    fn key(&self) -> &str {
        &self.id
    }
}

/// There is only ever one site notice.
impl Keyed for Notice {
    fn key(&self) -> &str {
        "site-notice"
    }
}

pub trait LocalStore<T>: Send + Sync + 'static {
    /// Subscribe to the stored rows. Yields the current rows (if the store
    /// has ever been written) and again after every write.
    fn read(&self) -> SnapshotStream<T>;

    /// Insert or replace every row in one atomic write.
    fn write_all(&self, items: Vec<T>) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert or replace a single row.
    fn insert(&self, item: T) -> impl Future<Output = Result<(), StoreError>> + Send;
}
