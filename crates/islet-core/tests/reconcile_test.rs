#![allow(clippy::unwrap_used)]
// Reconciler behavior against an in-memory store and canned replies.

use std::future::{Future, ready};
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::Notify;

use islet_api::{Community, RawResponse};
use islet_core::store::SnapshotStream;
use islet_core::{
    LoadingStatus, LocalStore, MemoryStore, ObserveOptions, Origin, Resource, StoreError, observe,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn community(id: &str, name: &str) -> Community {
    Community {
        id: id.into(),
        sort: String::new(),
        name: name.into(),
        status: String::new(),
        forums: Vec::new(),
    }
}

/// A forum-list reply whose communities are `items` (after the sentinel).
fn forum_list(items: &[(&str, &str)]) -> RawResponse {
    let mut entries = vec![json!({ "id": "-1", "name": "timelines", "forums": [] })];
    entries.extend(items.iter().map(|(id, name)| json!({ "id": id, "name": name })));
    let body = json!({ "errcode": 0, "forumListV1": entries });
    RawResponse::new(200, body.to_string())
}

fn reply(raw: RawResponse) -> impl FnOnce() -> std::future::Ready<Result<RawResponse, islet_api::Error>> {
    move || ready(Ok(raw))
}

/// Drain envelopes up to and including the first remote one.
async fn until_remote<T>(stream: impl Stream<Item = Resource<T>>) -> Vec<Resource<T>> {
    let mut stream = pin!(stream);
    let mut seen = Vec::new();
    let drain = async {
        while let Some(envelope) = stream.next().await {
            let done = envelope.origin == Origin::Remote && envelope.status.is_terminal();
            seen.push(envelope);
            if done {
                break;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), drain).await.unwrap();
    seen
}

/// Store whose writes always fail.
#[derive(Default)]
struct BrokenStore {
    inner: MemoryStore<Community>,
    attempts: AtomicUsize,
}

impl LocalStore<Community> for BrokenStore {
    fn read(&self) -> SnapshotStream<Community> {
        self.inner.read()
    }

    fn write_all(
        &self,
        _items: Vec<Community>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        ready(Err(StoreError::Unavailable("disk full".into())))
    }

    fn insert(&self, _item: Community) -> impl Future<Output = Result<(), StoreError>> + Send {
        ready(Err(StoreError::Unavailable("disk full".into())))
    }
}

/// Store whose writes wait for `release` before touching the rows.
#[derive(Default)]
struct GatedStore {
    inner: MemoryStore<Community>,
    write_started: Notify,
    release: Notify,
    write_done: Notify,
}

impl LocalStore<Community> for GatedStore {
    fn read(&self) -> SnapshotStream<Community> {
        self.inner.read()
    }

    fn write_all(
        &self,
        items: Vec<Community>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            self.write_started.notify_one();
            self.release.notified().await;
            let result = self.inner.write_all(items).await;
            self.write_done.notify_one();
            result
        }
    }

    fn insert(&self, item: Community) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.inner.insert(item)
    }
}

/// Sets its flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

// ── Scenarios ───────────────────────────────────────────────────────

#[tokio::test]
async fn remote_error_on_empty_cache() {
    let store = Arc::new(MemoryStore::<Community>::new());
    let raw = RawResponse::new(200, r#"{"errcode":1,"errmsg":"no such board"}"#);

    let seen = until_remote(observe(Arc::clone(&store), reply(raw), ObserveOptions::default())).await;

    assert_eq!(seen, vec![Resource::error("no such board", Origin::Remote)]);
    assert!(store.snapshot().is_none());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn empty_cache_is_reported_as_no_data_first() {
    let store = Arc::new(MemoryStore::<Community>::with_items(Vec::new()));
    let raw = RawResponse::new(200, r#"{"errcode":1,"errmsg":"no such board"}"#);

    let seen = until_remote(observe(store, reply(raw), ObserveOptions::default())).await;

    let statuses: Vec<_> = seen.iter().map(|r| (r.status, r.origin)).collect();
    assert_eq!(
        statuses,
        vec![
            (LoadingStatus::NoData, Origin::Local),
            (LoadingStatus::Error, Origin::Remote),
        ]
    );
}

#[tokio::test]
async fn new_remote_rows_are_written_once_then_forwarded() {
    let cached = vec![community("1", "A")];
    let store = Arc::new(MemoryStore::with_items(cached.clone()));
    let remote = vec![community("1", "A"), community("2", "B")];

    let seen = until_remote(observe(
        Arc::clone(&store),
        reply(forum_list(&[("1", "A"), ("2", "B")])),
        ObserveOptions::default(),
    ))
    .await;

    assert_eq!(
        seen,
        vec![
            Resource::from_local(cached),
            Resource {
                origin: Origin::Remote,
                ..Resource::from_local(remote.clone())
            },
        ]
    );
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.snapshot().unwrap(), remote);
}

#[tokio::test]
async fn equal_remote_list_is_not_written() {
    let cached = vec![community("1", "A")];
    let store = Arc::new(MemoryStore::with_items(cached.clone()));

    let seen = until_remote(observe(
        Arc::clone(&store),
        reply(forum_list(&[("1", "A")])),
        ObserveOptions::default(),
    ))
    .await;

    let last = seen.last().unwrap();
    assert_eq!(last.status, LoadingStatus::Success);
    assert_eq!(last.data.as_deref(), Some(cached.as_slice()));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn forced_refresh_writes_even_when_equal() {
    let store = Arc::new(MemoryStore::with_items(vec![community("1", "A")]));
    let options = ObserveOptions {
        force_refresh: true,
        ..ObserveOptions::default()
    };

    until_remote(observe(Arc::clone(&store), reply(forum_list(&[("1", "A")])), options)).await;

    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn empty_remote_list_leaves_cache_alone() {
    let cached = vec![community("1", "A")];
    let store = Arc::new(MemoryStore::with_items(cached.clone()));
    let options = ObserveOptions {
        force_refresh: true,
        ..ObserveOptions::default()
    };

    let seen = until_remote(observe(Arc::clone(&store), reply(forum_list(&[])), options)).await;

    let last = seen.last().unwrap();
    assert_eq!(last.status, LoadingStatus::Success);
    assert_eq!(last.data, Some(Vec::new()));
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.snapshot().unwrap(), cached);
}

#[tokio::test]
async fn store_failure_is_a_distinct_error() {
    let store = Arc::new(BrokenStore::default());

    let seen = until_remote(observe(
        Arc::clone(&store),
        reply(forum_list(&[("1", "A")])),
        ObserveOptions::default(),
    ))
    .await;

    assert_eq!(
        seen,
        vec![Resource::error(
            "failed to update local cache: local store unavailable: disk full",
            Origin::Remote
        )]
    );
    assert_eq!(store.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn error_context_prefixes_remote_errors() {
    let store = Arc::new(MemoryStore::<Community>::new());
    let options = ObserveOptions {
        error_context: Some("Unable to load the community list...\n".into()),
        ..ObserveOptions::default()
    };
    let raw = RawResponse::new(200, r#"{"errcode":1,"errmsg":"no such board"}"#);

    let seen = until_remote(observe(store, reply(raw), options)).await;

    assert_eq!(
        seen[0].message.as_deref(),
        Some("Unable to load the community list...\nno such board")
    );
}

#[tokio::test]
async fn transport_failure_becomes_error_envelope() {
    let store = Arc::new(MemoryStore::<Community>::new());
    let fetch = || ready(Err(islet_api::Error::Timeout { timeout_secs: 30 }));

    let seen = until_remote(observe(store, fetch, ObserveOptions::default())).await;

    assert_eq!(seen[0].status, LoadingStatus::Error);
    assert_eq!(seen[0].message.as_deref(), Some("Request timed out after 30s"));
}

#[tokio::test]
async fn html_reply_surfaces_reduced_text() {
    let store = Arc::new(MemoryStore::<Community>::new());
    let raw = RawResponse::new(
        200,
        r#"<html><body><div class="system-message">Banned<a class="jump">x</a></div></body></html>"#,
    );

    let seen = until_remote(observe(store, reply(raw), ObserveOptions::default())).await;

    assert_eq!(seen, vec![Resource::error("Banned", Origin::Remote)]);
}

#[tokio::test]
async fn undecodable_success_keeps_cache() {
    let store = Arc::new(MemoryStore::with_items(vec![community("1", "A")]));
    let raw = RawResponse::new(200, r#"{"errcode":0}"#);

    let seen = until_remote(observe(Arc::clone(&store), reply(raw), ObserveOptions::default())).await;

    let last = seen.last().unwrap();
    assert_eq!(last.status, LoadingStatus::Error);
    assert_eq!(last.message.as_deref(), Some("missing field `forumListV1`"));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn loading_is_announced_first_when_asked() {
    let store = Arc::new(MemoryStore::<Community>::new());
    let options = ObserveOptions {
        announce_loading: true,
        ..ObserveOptions::default()
    };

    let seen = until_remote(observe(store, reply(RawResponse::without_body(204)), options)).await;

    let statuses: Vec<_> = seen.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![LoadingStatus::Loading, LoadingStatus::NoData]);
}

#[tokio::test]
async fn later_local_writes_keep_flowing() {
    let store = Arc::new(MemoryStore::<Community>::new());
    let raw = RawResponse::new(200, r#"{"errcode":1,"errmsg":"down"}"#);
    let mut stream = Box::pin(observe(Arc::clone(&store), reply(raw), ObserveOptions::default()));

    let first = stream.next().await.unwrap();
    assert_eq!(first.status, LoadingStatus::Error);

    store.insert(community("7", "pinned")).await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next, Resource::from_local(vec![community("7", "pinned")]));
}

#[tokio::test]
async fn failed_reply_without_body_is_an_error_not_no_data() {
    let store = Arc::new(MemoryStore::<Community>::with_items(Vec::new()));

    let seen = until_remote(observe(
        store,
        reply(RawResponse::without_body(503)),
        ObserveOptions::default(),
    ))
    .await;

    let statuses: Vec<_> = seen.iter().map(|r| (r.status, r.origin)).collect();
    assert_eq!(
        statuses,
        vec![
            (LoadingStatus::NoData, Origin::Local),
            (LoadingStatus::Error, Origin::Remote),
        ]
    );
    assert_eq!(seen[1].message.as_deref(), Some("Service Unavailable"));
}

#[tokio::test]
async fn identical_local_writes_are_each_forwarded() {
    let store = Arc::new(MemoryStore::<Community>::with_items(Vec::new()));
    let raw = RawResponse::new(200, r#"{"errcode":1,"errmsg":"down"}"#);
    let mut stream = Box::pin(observe(Arc::clone(&store), reply(raw), ObserveOptions::default()));

    assert_eq!(stream.next().await.unwrap().status, LoadingStatus::NoData);
    assert_eq!(stream.next().await.unwrap().status, LoadingStatus::Error);

    for _ in 0..2 {
        store.insert(community("7", "pinned")).await.unwrap();
        let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next, Resource::from_local(vec![community("7", "pinned")]));
    }
}

#[tokio::test]
async fn echo_of_own_write_is_skipped_once() {
    let store = Arc::new(MemoryStore::with_items(vec![community("1", "A")]));
    let mut stream = Box::pin(observe(
        Arc::clone(&store),
        reply(forum_list(&[("1", "A"), ("2", "B")])),
        ObserveOptions::default(),
    ));

    assert_eq!(stream.next().await.unwrap().origin, Origin::Local);
    assert_eq!(stream.next().await.unwrap().origin, Origin::Remote);
    assert_eq!(store.write_count(), 1);

    let quiet = tokio::time::timeout(Duration::from_millis(100), stream.next()).await;
    assert!(quiet.is_err(), "the write's own echo was forwarded");

    store.insert(community("3", "C")).await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        next,
        Resource::from_local(vec![community("1", "A"), community("2", "B"), community("3", "C")])
    );
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn dropping_the_stream_cancels_a_pending_fetch() {
    let store = Arc::new(MemoryStore::with_items(vec![community("1", "A")]));
    let started = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicBool::new(false));

    let fetch = {
        let started = Arc::clone(&started);
        let guard = DropFlag(Arc::clone(&dropped));
        move || async move {
            let _guard = guard;
            started.store(true, Ordering::SeqCst);
            std::future::pending::<Result<RawResponse, islet_api::Error>>().await
        }
    };

    let mut stream = Box::pin(observe(store, fetch, ObserveOptions::default()));
    assert_eq!(stream.next().await.unwrap().origin, Origin::Local);

    // Nothing else arrives while the fetch hangs.
    let idle = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
    assert!(idle.is_err());
    assert!(started.load(Ordering::SeqCst));
    assert!(!dropped.load(Ordering::SeqCst));

    drop(stream);
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn started_write_completes_after_the_stream_is_dropped() {
    let store = Arc::new(GatedStore::default());
    let mut stream = Box::pin(observe(
        Arc::clone(&store),
        reply(forum_list(&[("1", "A")])),
        ObserveOptions::default(),
    ));

    tokio::select! {
        envelope = stream.next() => panic!("emitted before the write finished: {envelope:?}"),
        () = store.write_started.notified() => {}
    }
    drop(stream);

    store.release.notify_one();
    tokio::time::timeout(Duration::from_secs(5), store.write_done.notified())
        .await
        .unwrap();

    assert_eq!(store.inner.write_count(), 1);
    assert_eq!(store.inner.snapshot().unwrap(), vec![community("1", "A")]);
}
