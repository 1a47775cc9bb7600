// ── Repository ──
//
// Facade over one `IsletClient` and the local stores. Cached lists are
// exposed as reconciled streams; everything else is a one-shot remote fetch
// that reports through a single `Resource`.

use std::path::Path;
use std::sync::Arc;

use futures_util::Stream;
use tracing::{debug, warn};
use url::Url;

use islet_api::{
    ClassifiedMessage, Comment, Community, Decode, Endpoint, Feed, IsletClient, Notice, Post,
    PostDraft, PostOutcome, Release, SearchResult, Timeline, classify_payload,
};

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::reconcile::{ObserveOptions, Reconcilable, observe};
use crate::resource::{Origin, Resource};
use crate::store::{LocalStore, MemoryStore, StoreError};

/// The cached entity stores a repository reads and writes.
///
/// `Default` gives process-local stores; [`Stores::open`] mirrors each one to
/// a JSON file so the cache outlives the process.
#[derive(Clone, Default)]
pub struct Stores {
    pub communities: Arc<MemoryStore<Community>>,
    pub timelines: Arc<MemoryStore<Timeline>>,
    pub notice: Arc<MemoryStore<Notice>>,
    pub feeds: Arc<MemoryStore<Feed>>,
}

impl Stores {
    /// Open (or start) the cache files under `dir`. Nothing is created on
    /// disk until the first write.
    pub async fn open(dir: &Path) -> Result<Self, StoreError> {
        debug!(dir = %dir.display(), "opening cache");
        Ok(Self {
            communities: Arc::new(MemoryStore::open(dir.join("communities.json")).await?),
            timelines: Arc::new(MemoryStore::open(dir.join("timelines.json")).await?),
            notice: Arc::new(MemoryStore::open(dir.join("notice.json")).await?),
            feeds: Arc::new(MemoryStore::open(dir.join("feeds.json")).await?),
        })
    }
}

/// Cheaply cloneable handle; clones share the client and the stores.
#[derive(Clone)]
pub struct Repository {
    inner: Arc<RepositoryInner>,
}

struct RepositoryInner {
    client: IsletClient,
    stores: Stores,
    error_context: Option<String>,
}

impl Repository {
    /// Build the HTTP client from `config`, with fresh empty stores.
    pub fn new(config: &ClientConfig) -> Result<Self, CoreError> {
        Self::with_stores(config, Stores::default())
    }

    /// Build the HTTP client from `config` over existing stores.
    pub fn with_stores(config: &ClientConfig, stores: Stores) -> Result<Self, CoreError> {
        let client = IsletClient::new(config.base_url.clone(), &config.transport())?;
        Ok(Self {
            inner: Arc::new(RepositoryInner {
                client,
                stores,
                error_context: config.error_context.clone(),
            }),
        })
    }

    /// Use an existing client and stores. No error context is applied.
    ///
    /// Share `stores` between repositories to share one cache.
    pub fn with_client(client: IsletClient, stores: Stores) -> Self {
        Self {
            inner: Arc::new(RepositoryInner {
                client,
                stores,
                error_context: None,
            }),
        }
    }

    pub fn base_url(&self) -> &Url {
        self.inner.client.base_url()
    }

    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    // ── Reconciled lists ─────────────────────────────────────────────

    pub fn communities(
        &self,
        force_refresh: bool,
    ) -> impl Stream<Item = Resource<Vec<Community>>> + Send + use<> {
        self.reconciled(
            &self.inner.stores.communities,
            Endpoint::Communities,
            self.list_options(force_refresh),
        )
    }

    pub fn timelines(
        &self,
        force_refresh: bool,
    ) -> impl Stream<Item = Resource<Vec<Timeline>>> + Send + use<> {
        self.reconciled(
            &self.inner.stores.timelines,
            Endpoint::Timelines,
            self.list_options(force_refresh),
        )
    }

    pub fn notice(
        &self,
        force_refresh: bool,
    ) -> impl Stream<Item = Resource<Vec<Notice>>> + Send + use<> {
        let options = ObserveOptions {
            force_refresh,
            ..ObserveOptions::default()
        };
        self.reconciled(&self.inner.stores.notice, Endpoint::Notice, options)
    }

    /// First page of the subscription feed for `uuid`.
    pub fn feeds(
        &self,
        uuid: &str,
        force_refresh: bool,
    ) -> Result<impl Stream<Item = Resource<Vec<Feed>>> + Send + use<>, CoreError> {
        if uuid.trim().is_empty() {
            return Err(CoreError::invalid_query("feed id must not be empty"));
        }
        let endpoint = Endpoint::Feeds {
            uuid: uuid.to_owned(),
            page: 1,
        };
        let options = ObserveOptions {
            force_refresh,
            ..ObserveOptions::default()
        };
        Ok(self.reconciled(&self.inner.stores.feeds, endpoint, options))
    }

    /// Pin a community locally; it never goes through the network.
    pub async fn save_common_community(&self, community: Community) -> Result<(), CoreError> {
        debug!(id = %community.id, "saving common community");
        self.inner.stores.communities.insert(community).await?;
        Ok(())
    }

    fn list_options(&self, force_refresh: bool) -> ObserveOptions {
        ObserveOptions {
            force_refresh,
            error_context: self.inner.error_context.clone(),
            announce_loading: false,
        }
    }

    fn reconciled<T, S>(
        &self,
        store: &Arc<S>,
        endpoint: Endpoint,
        options: ObserveOptions,
    ) -> impl Stream<Item = Resource<Vec<T>>> + Send + use<T, S>
    where
        T: Reconcilable,
        S: LocalStore<T>,
    {
        let client = self.inner.client.clone();
        observe(
            Arc::clone(store),
            move || async move { client.fetch(&endpoint).await },
            options,
        )
    }

    // ── One-shot fetches ─────────────────────────────────────────────

    /// Fetch, classify, and decode without touching any store.
    pub async fn fetch_once<D: Decode>(&self, endpoint: &Endpoint) -> Resource<D> {
        debug_assert_eq!(endpoint.kind(), D::KIND);

        let raw = match self.inner.client.fetch(endpoint).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(kind = %D::KIND, error = %e, "remote fetch failed");
                return Resource::from_remote(&ClassifiedMessage::transport_failure(&e), None);
            }
        };

        let classified = classify_payload(&raw);
        if !classified.is_success() {
            return Resource::from_remote(&classified, None);
        }

        let body = raw.body_text().unwrap_or_default();
        match D::decode(&body) {
            Ok(data) => Resource::from_remote(&classified, Some(data)),
            Err(e) => {
                warn!(kind = %D::KIND, error = %e, "remote payload did not decode");
                Resource::error(e.to_string(), Origin::Remote)
            }
        }
    }

    /// One page of a thread.
    pub async fn thread(&self, id: &str, page: u32) -> Result<Resource<Post>, CoreError> {
        let id = validate_id(id)?;
        let page = validate_page(page)?;
        Ok(self
            .fetch_once(&Endpoint::Thread {
                id: id.to_owned(),
                page,
            })
            .await)
    }

    /// A single reply, as shown in a quote popup.
    pub async fn quote(&self, id: &str) -> Result<Resource<Comment>, CoreError> {
        let id = validate_id(id)?;
        Ok(self.fetch_once(&Endpoint::Quote { id: id.to_owned() }).await)
    }

    pub async fn search(&self, query: &str, page: u32) -> Result<Resource<SearchResult>, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::invalid_query("search query must not be empty"));
        }
        let page = validate_page(page)?;
        let result: Resource<SearchResult> = self
            .fetch_once(&Endpoint::Search {
                query: query.to_owned(),
                page,
            })
            .await;
        Ok(result.map(|r| r.for_query(query, page)))
    }

    pub async fn latest_release(&self) -> Resource<Release> {
        self.fetch_once(&Endpoint::LatestRelease).await
    }

    /// Submit a new thread or reply.
    pub async fn send_post(&self, draft: &PostDraft) -> Result<PostOutcome, CoreError> {
        if draft.content.trim().is_empty() {
            return Err(CoreError::invalid_query("post content must not be empty"));
        }
        if draft.resto.is_none() && draft.fid.as_deref().is_none_or(str::is_empty) {
            return Err(CoreError::invalid_query("a new thread needs a forum id"));
        }
        let outcome = self.inner.client.send_post(draft).await;
        debug!(accepted = outcome.accepted, "post submitted");
        Ok(outcome)
    }
}

fn validate_id(id: &str) -> Result<&str, CoreError> {
    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::invalid_query(format!("not a post id: {id:?}")));
    }
    Ok(id)
}

fn validate_page(page: u32) -> Result<u32, CoreError> {
    if page == 0 {
        return Err(CoreError::invalid_query("pages start at 1"));
    }
    Ok(page)
}
