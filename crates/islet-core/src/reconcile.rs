// ── Cache-then-network reconciliation ──
//
// One local subscription and one remote fetch per `observe` call, merged
// into a single stream of `Resource`s. The remote branch runs
// classify -> decode -> compare -> persist -> emit strictly in order; the
// local branch forwards whatever the store yields, except the single echo of
// a write this call made itself.

use std::future::Future;
use std::sync::Arc;

use async_stream::stream;
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use islet_api::{
    ClassifiedMessage, Community, Decode, DecodeError, EntityKind, Feed, Notice, RawResponse,
    Timeline, classify_payload,
};

use crate::resource::{Origin, Resource};
use crate::store::{LocalStore, StoreError};

/// An entity the reconciler can cache.
pub trait Reconcilable: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    fn decode(body: &str) -> Result<Vec<Self>, DecodeError>;

    /// Whether two payloads are the same for caching purposes.
    fn compare_equals(a: &[Self], b: &[Self]) -> bool;

    fn persist<S: LocalStore<Self>>(
        store: &S,
        items: Vec<Self>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        store.write_all(items)
    }
}

impl Reconcilable for Community {
    const KIND: EntityKind = EntityKind::Communities;

    fn decode(body: &str) -> Result<Vec<Self>, DecodeError> {
        Vec::<Self>::decode(body)
    }

    fn compare_equals(a: &[Self], b: &[Self]) -> bool {
        a == b
    }
}

impl Reconcilable for Timeline {
    const KIND: EntityKind = EntityKind::Timelines;

    fn decode(body: &str) -> Result<Vec<Self>, DecodeError> {
        Vec::<Self>::decode(body)
    }

    fn compare_equals(a: &[Self], b: &[Self]) -> bool {
        a == b
    }
}

impl Reconcilable for Feed {
    const KIND: EntityKind = EntityKind::Feeds;

    fn decode(body: &str) -> Result<Vec<Self>, DecodeError> {
        Vec::<Self>::decode(body)
    }

    fn compare_equals(a: &[Self], b: &[Self]) -> bool {
        a == b
    }
}

impl Reconcilable for Notice {
    const KIND: EntityKind = EntityKind::Notice;

    fn decode(body: &str) -> Result<Vec<Self>, DecodeError> {
        <Self as Decode>::decode(body).map(|notice| vec![notice])
    }

    /// Only what the user sees counts; a re-fetched notice with a new
    /// timestamp is the same notice.
    fn compare_equals(a: &[Self], b: &[Self]) -> bool {
        a.len() == b.len()
            && a.iter().zip(b).all(|(x, y)| {
                x.content == y.content && x.enable == y.enable && x.read == y.read
            })
    }
}

/// Per-call knobs.
#[derive(Debug, Clone, Default)]
pub struct ObserveOptions {
    /// Persist a non-empty remote result even when it equals the cache.
    pub force_refresh: bool,
    /// Prefix for remote error messages.
    pub error_context: Option<String>,
    /// Emit a `Loading` envelope before anything else.
    pub announce_loading: bool,
}

/// Race the local store against one remote fetch.
///
/// The stream ends only when the store's snapshot stream ends; after the
/// remote terminal envelope nothing else goes to the network. Dropping the
/// stream cancels an in-flight fetch; a persist that has started runs to
/// completion on its own task.
pub fn observe<T, S, F, Fut>(
    store: Arc<S>,
    remote_fetch: F,
    options: ObserveOptions,
) -> impl Stream<Item = Resource<Vec<T>>> + Send
where
    T: Reconcilable,
    S: LocalStore<T>,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<RawResponse, islet_api::Error>> + Send + 'static,
{
    stream! {
        debug!(kind = %T::KIND, force = options.force_refresh, "observe");
        if options.announce_loading {
            yield Resource::loading();
        }

        let mut local = store.read();
        let remote = fetch_remote::<T, _>(remote_fetch());
        tokio::pin!(remote);

        let mut observed: Option<Vec<T>> = None;
        let mut echo: Option<Vec<T>> = None;
        let mut local_open = true;
        let mut remote_pending = true;

        loop {
            let step = tokio::select! {
                biased;
                snapshot = local.next(), if local_open => Step::Local(snapshot),
                outcome = &mut remote, if remote_pending => Step::Remote(outcome),
                else => break,
            };

            match step {
                Step::Local(None) => local_open = false,
                Step::Local(Some(snapshot)) => {
                    // The first snapshot after our own write is its echo; the
                    // remote envelope already carried those rows.
                    if echo
                        .take()
                        .is_some_and(|written| T::compare_equals(&written, &snapshot))
                    {
                        debug!(kind = %T::KIND, "skipping echo of own write");
                        observed = Some(snapshot);
                        continue;
                    }
                    let envelope = if snapshot.is_empty() {
                        Resource::no_data(Origin::Local)
                    } else {
                        Resource::from_local(snapshot.clone())
                    };
                    observed = Some(snapshot);
                    yield envelope;
                }
                Step::Remote(outcome) => {
                    remote_pending = false;
                    let settled = settle(&store, outcome, observed.as_deref(), &options).await;
                    if let Some(written) = settled.written {
                        observed = Some(written.clone());
                        echo = Some(written);
                    }
                    yield settled.envelope;
                }
            }
        }
    }
}

enum Step<T> {
    Local(Option<Vec<T>>),
    Remote(Fetched<T>),
}

/// Outcome of the remote branch up to decoding.
struct Fetched<T> {
    classified: ClassifiedMessage,
    data: Option<Vec<T>>,
}

async fn fetch_remote<T, Fut>(fetch: Fut) -> Fetched<T>
where
    T: Reconcilable,
    Fut: Future<Output = Result<RawResponse, islet_api::Error>>,
{
    let raw = match fetch.await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(kind = %T::KIND, error = %e, "remote fetch failed");
            return Fetched {
                classified: ClassifiedMessage::transport_failure(&e),
                data: None,
            };
        }
    };

    let classified = classify_payload(&raw);
    if !classified.is_success() {
        debug!(kind = %T::KIND, status = raw.status, "remote rejected");
        return Fetched {
            classified,
            data: None,
        };
    }

    let body = raw.body_text().unwrap_or_default();
    match T::decode(&body) {
        Ok(items) => Fetched {
            classified,
            data: Some(items),
        },
        Err(e) => {
            warn!(kind = %T::KIND, error = %e, "remote payload did not decode");
            Fetched {
                classified: ClassifiedMessage::error(e.to_string()),
                data: None,
            }
        }
    }
}

struct Settled<T> {
    envelope: Resource<Vec<T>>,
    /// Rows this cycle wrote to the cache, if it wrote any.
    written: Option<Vec<T>>,
}

async fn settle<T, S>(
    store: &Arc<S>,
    fetched: Fetched<T>,
    observed: Option<&[T]>,
    options: &ObserveOptions,
) -> Settled<T>
where
    T: Reconcilable,
    S: LocalStore<T>,
{
    let Fetched { classified, data } = fetched;
    let Some(items) = data.filter(|_| classified.is_success()) else {
        return Settled {
            envelope: Resource::from_remote(&classified, None)
                .with_context(options.error_context.as_deref()),
            written: None,
        };
    };

    if items.is_empty() {
        debug!(kind = %T::KIND, "remote returned nothing; cache untouched");
        return Settled {
            envelope: Resource::from_remote(&classified, Some(items)),
            written: None,
        };
    }

    let unchanged = observed.is_some_and(|prev| T::compare_equals(prev, &items));
    if unchanged && !options.force_refresh {
        debug!(kind = %T::KIND, rows = items.len(), "remote matches cache");
        return Settled {
            envelope: Resource::from_remote(&classified, Some(items)),
            written: None,
        };
    }

    debug!(kind = %T::KIND, rows = items.len(), "updating cache");
    let writer = Arc::clone(store);
    let rows = items.clone();
    let persisted = tokio::spawn(async move { T::persist(writer.as_ref(), rows).await })
        .await
        .unwrap_or_else(|e| Err(StoreError::Interrupted(e.to_string())));

    match persisted {
        Ok(()) => Settled {
            envelope: Resource::from_remote(&classified, Some(items.clone())),
            written: Some(items),
        },
        Err(e) => {
            warn!(kind = %T::KIND, error = %e, "cache update failed");
            Settled {
                envelope: Resource::error(
                    format!("failed to update local cache: {e}"),
                    Origin::Remote,
                ),
                written: None,
            }
        }
    }
}
