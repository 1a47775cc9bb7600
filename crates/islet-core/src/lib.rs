// islet-core: cache-then-network data layer between islet-api and consumers.

pub mod config;
pub mod error;
pub mod reconcile;
pub mod repository;
pub mod resource;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ClientConfig, TlsVerification};
pub use error::CoreError;
pub use reconcile::{ObserveOptions, Reconcilable, observe};
pub use repository::{Repository, Stores};
pub use resource::{LoadingStatus, Origin, Resource};
pub use store::{CachedRow, Keyed, LocalStore, MemoryStore, SnapshotStream, StoreError};

// Entity types come from the api crate; re-exported for consumers.
pub use islet_api::{
    ClassifiedMessage, Comment, Community, Feed, Forum, Notice, Post, PostDraft, PostOutcome,
    Release, SearchHit, SearchResult, Timeline,
};
