// Forum HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction and the `Transport`
// implementation. The client never interprets replies: it hands back a
// `RawResponse` for the classifier, except for post submission, whose whole
// result is a classification.

use std::time::Duration;

use reqwest::header::COOKIE;
use tracing::{debug, warn};
use url::Url;

use crate::classify::{ClassifiedMessage, PostOutcome, classify};
use crate::decode::EntityKind;
use crate::error::Error;
use crate::response::RawResponse;
use crate::transport::{ApiRequest, Transport, TransportConfig};

/// Every remote query the forum exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Communities,
    Timelines,
    Notice,
    Thread { id: String, page: u32 },
    Quote { id: String },
    Feeds { uuid: String, page: u32 },
    Search { query: String, page: u32 },
    LatestRelease,
}

impl Endpoint {
    /// The entity a successful reply from this endpoint decodes into.
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Communities => EntityKind::Communities,
            Self::Timelines => EntityKind::Timelines,
            Self::Notice => EntityKind::Notice,
            Self::Thread { .. } => EntityKind::Post,
            Self::Quote { .. } => EntityKind::Comment,
            Self::Feeds { .. } => EntityKind::Feeds,
            Self::Search { .. } => EntityKind::SearchResult,
            Self::LatestRelease => EntityKind::Release,
        }
    }

    pub fn request(&self) -> ApiRequest {
        match self {
            // Both lists live in the same document.
            Self::Communities | Self::Timelines => ApiRequest::get("Api/getForumList"),
            Self::Notice => ApiRequest::get("Api/notice"),
            Self::Thread { id, page } => ApiRequest::get("Api/thread")
                .with_query("id", id)
                .with_query("page", page),
            Self::Quote { id } => ApiRequest::get("Api/ref").with_query("id", id),
            Self::Feeds { uuid, page } => ApiRequest::get("Api/feed")
                .with_query("uuid", uuid)
                .with_query("page", page),
            Self::Search { query, page } => ApiRequest::get("Api/search")
                .with_query("q", query)
                .with_query("page", page),
            Self::LatestRelease => ApiRequest::get("Api/release/latest"),
        }
    }
}

/// A new thread (`resto = None`) or a reply to thread `resto`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub fid: Option<String>,
    pub resto: Option<String>,
    pub name: String,
    pub email: String,
    pub title: String,
    pub content: String,
    pub water_mark: bool,
    /// The `userhash` cookie that identifies the poster.
    pub user_hash: Option<String>,
}

impl PostDraft {
    fn request(&self) -> ApiRequest {
        let mut form = vec![
            ("name".to_owned(), self.name.clone()),
            ("email".to_owned(), self.email.clone()),
            ("title".to_owned(), self.title.clone()),
            ("content".to_owned(), self.content.clone()),
        ];
        if self.water_mark {
            form.push(("water".to_owned(), "true".to_owned()));
        }

        let path = if let Some(resto) = &self.resto {
            form.push(("resto".to_owned(), resto.clone()));
            "Home/Forum/doReplyThread.html"
        } else {
            form.push(("fid".to_owned(), self.fid.clone().unwrap_or_default()));
            "Home/Forum/doPostThread.html"
        };

        let request = ApiRequest::post_form(path, form);
        match &self.user_hash {
            Some(hash) => request.with_cookie(format!("userhash={hash}")),
            None => request,
        }
    }
}

/// HTTP client for the forum API.
#[derive(Debug, Clone)]
pub struct IsletClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl IsletClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the site root (e.g. `https://www.nmbxd.com`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
            timeout: transport.timeout,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{path}`, tolerant of a trailing slash on the base.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Fetch the raw reply for an endpoint.
    pub async fn fetch(&self, endpoint: &Endpoint) -> Result<RawResponse, Error> {
        self.execute(endpoint.request()).await
    }

    /// Submit a post and classify the reply.
    ///
    /// The forum answers a rejected post with an HTML page; that is never a
    /// success, and its reduced text becomes the outcome message.
    pub async fn send_post(&self, draft: &PostDraft) -> PostOutcome {
        let classified = match self.execute(draft.request()).await {
            Ok(raw) => classify(&raw),
            Err(e) => {
                warn!(error = %e, "post submission failed before a reply");
                ClassifiedMessage::transport_failure(&e)
            }
        };
        PostOutcome::from(&classified)
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

impl Transport for IsletClient {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, Error> {
        let url = self.api_url(&request.path)?;
        debug!("{} {}", request.method, url);

        let mut builder = self.http.request(request.method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }
        if let Some(cookie) = &request.cookie {
            builder = builder.header(COOKIE, cookie);
        }

        let resp = builder.send().await.map_err(|e| self.map_send_error(e))?;
        RawResponse::read(resp)
            .await
            .map_err(|e| self.map_send_error(e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> IsletClient {
        IsletClient::new(Url::parse(base).unwrap(), &TransportConfig::default()).unwrap()
    }

    #[test]
    fn api_url_joins_without_double_slash() {
        assert_eq!(
            client("https://forum.example/").api_url("/Api/thread").unwrap().as_str(),
            "https://forum.example/Api/thread"
        );
        assert_eq!(
            client("https://forum.example/mirror").api_url("Api/ref").unwrap().as_str(),
            "https://forum.example/mirror/Api/ref"
        );
    }

    #[test]
    fn endpoints_know_their_entity() {
        assert_eq!(Endpoint::Communities.kind(), EntityKind::Communities);
        assert_eq!(
            Endpoint::Thread { id: "1".into(), page: 1 }.kind(),
            EntityKind::Post
        );
        assert_eq!(Endpoint::Timelines.request(), Endpoint::Communities.request());
    }

    #[test]
    fn reply_draft_targets_reply_form() {
        let draft = PostDraft {
            resto: Some("42".into()),
            content: "hi".into(),
            user_hash: Some("abc".into()),
            ..PostDraft::default()
        };
        let request = draft.request();
        assert_eq!(request.path, "Home/Forum/doReplyThread.html");
        assert_eq!(request.cookie.as_deref(), Some("userhash=abc"));
        assert!(
            request
                .form
                .unwrap()
                .contains(&("resto".to_owned(), "42".to_owned()))
        );
    }
}
