// Entity decoders
//
// One pure decoder per entity. Each entity type implements `Decode` and
// carries its `EntityKind`; `decode_entity` dispatches on the kind for callers
// that only learn what they are holding at runtime (the CLI, tests).

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString};
use thiserror::Error;

use crate::model::{
    Comment, Community, Feed, Notice, Post, Release, SearchHit, SearchResult, Timeline,
};

/// Why a successful reply could not be turned into an entity.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` is not {expected}")]
    Shape {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Unknown DateTime String: {value}")]
    Timestamp { value: String },
}

/// Tag for each decodable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum EntityKind {
    Communities,
    Timelines,
    Notice,
    Posts,
    Post,
    Comment,
    Feeds,
    SearchResult,
    Release,
}

/// A pure, stateless decoder from a reply body to `Self`.
pub trait Decode: Sized {
    const KIND: EntityKind;

    fn decode(body: &str) -> Result<Self, DecodeError>;
}

/// Output of [`decode_entity`], one variant per [`EntityKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Communities(Vec<Community>),
    Timelines(Vec<Timeline>),
    Notice(Notice),
    Posts(Vec<Post>),
    Post(Box<Post>),
    Comment(Comment),
    Feeds(Vec<Feed>),
    SearchResult(SearchResult),
    Release(Release),
}

impl Decoded {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Communities(_) => EntityKind::Communities,
            Self::Timelines(_) => EntityKind::Timelines,
            Self::Notice(_) => EntityKind::Notice,
            Self::Posts(_) => EntityKind::Posts,
            Self::Post(_) => EntityKind::Post,
            Self::Comment(_) => EntityKind::Comment,
            Self::Feeds(_) => EntityKind::Feeds,
            Self::SearchResult(_) => EntityKind::SearchResult,
            Self::Release(_) => EntityKind::Release,
        }
    }
}

/// Decode `body` as the entity named by `kind`.
pub fn decode_entity(kind: EntityKind, body: &str) -> Result<Decoded, DecodeError> {
    Ok(match kind {
        EntityKind::Communities => Decoded::Communities(Decode::decode(body)?),
        EntityKind::Timelines => Decoded::Timelines(Decode::decode(body)?),
        EntityKind::Notice => Decoded::Notice(Decode::decode(body)?),
        EntityKind::Posts => Decoded::Posts(Decode::decode(body)?),
        EntityKind::Post => Decoded::Post(Box::new(Decode::decode(body)?)),
        EntityKind::Comment => Decoded::Comment(Decode::decode(body)?),
        EntityKind::Feeds => Decoded::Feeds(Decode::decode(body)?),
        EntityKind::SearchResult => Decoded::SearchResult(Decode::decode(body)?),
        EntityKind::Release => Decoded::Release(Decode::decode(body)?),
    })
}

// ── Forum list ───────────────────────────────────────────────────────

const FORUM_LIST: &str = "forumListV1";

impl Decode for Vec<Community> {
    const KIND: EntityKind = EntityKind::Communities;

    /// Every `forumListV1` entry except the first, which is the timeline
    /// sentinel rather than a real community.
    fn decode(body: &str) -> Result<Self, DecodeError> {
        let mut root = parse_object(body)?;
        let entries = take_array(&mut root, FORUM_LIST)?;
        from_values(entries.into_iter().skip(1))
    }
}

impl Decode for Vec<Timeline> {
    const KIND: EntityKind = EntityKind::Timelines;

    /// The `forums` of the first `forumListV1` entry.
    fn decode(body: &str) -> Result<Self, DecodeError> {
        let mut root = parse_object(body)?;
        let sentinel = take_array(&mut root, FORUM_LIST)?
            .into_iter()
            .next()
            .ok_or(DecodeError::MissingField { field: FORUM_LIST })?;
        let Value::Object(mut sentinel) = sentinel else {
            return Err(DecodeError::Shape {
                field: FORUM_LIST,
                expected: "a list of objects",
            });
        };
        from_values(take_array(&mut sentinel, "forums")?)
    }
}

// ── Notice ───────────────────────────────────────────────────────────

impl Decode for Notice {
    const KIND: EntityKind = EntityKind::Notice;

    fn decode(body: &str) -> Result<Self, DecodeError> {
        let root = parse_object(body)?;
        match root.get("siteNotify") {
            Some(Value::String(content)) => Ok(Notice::new(content.as_str())),
            Some(_) => Err(DecodeError::Shape {
                field: "siteNotify",
                expected: "a string",
            }),
            None => Err(DecodeError::MissingField { field: "siteNotify" }),
        }
    }
}

// ── Threads ──────────────────────────────────────────────────────────

impl Decode for Vec<Post> {
    const KIND: EntityKind = EntityKind::Posts;

    /// A bare array, or the `data` array of an envelope object.
    fn decode(body: &str) -> Result<Self, DecodeError> {
        match serde_json::from_str::<Value>(body)? {
            Value::Array(items) => from_values(items),
            Value::Object(mut root) => from_values(take_array(&mut root, "data")?),
            _ => Err(DecodeError::Shape {
                field: "data",
                expected: "an array",
            }),
        }
    }
}

impl Decode for Post {
    const KIND: EntityKind = EntityKind::Post;

    fn decode(body: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(body)?)
    }
}

impl Decode for Comment {
    const KIND: EntityKind = EntityKind::Comment;

    fn decode(body: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(body)?)
    }
}

impl Decode for Vec<Feed> {
    const KIND: EntityKind = EntityKind::Feeds;

    fn decode(body: &str) -> Result<Self, DecodeError> {
        let mut root = parse_object(body)?;
        from_values(take_array(&mut root, "list")?)
    }
}

// ── Search ───────────────────────────────────────────────────────────

impl Decode for SearchResult {
    const KIND: EntityKind = EntityKind::SearchResult;

    /// `hits` must be an object; its `total` and `hits` array are optional.
    /// Query and page are left blank for the caller to stamp.
    fn decode(body: &str) -> Result<Self, DecodeError> {
        let root = parse_object(body)?;
        let hits = match root.get("hits") {
            Some(Value::Object(hits)) => hits,
            Some(_) => {
                return Err(DecodeError::Shape {
                    field: "hits",
                    expected: "an object",
                });
            }
            None => return Err(DecodeError::MissingField { field: "hits" }),
        };

        let query_hits = hits
            .get("total")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0);

        let hits = hits
            .get("hits")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(search_hit).collect())
            .unwrap_or_default();

        Ok(SearchResult {
            query: String::new(),
            query_hits,
            page: 0,
            hits,
        })
    }
}

fn search_hit(item: &Value) -> SearchHit {
    let source = item.get("_source");
    let field = |name: &str| opt_string(source.and_then(|s| s.get(name)));

    // Defaults only when the key is absent; an explicit "" stays "".
    let sage = match source.and_then(|s| s.get("sage")) {
        None => "0".to_owned(),
        present => opt_string(present),
    };
    SearchHit {
        id: opt_string(item.get("_id")),
        now: field("now"),
        time: field("time"),
        sage,
        img: field("img"),
        ext: field("ext"),
        title: field("title"),
        resto: field("resto"),
        userid: field("userid"),
        email: field("email"),
        content: field("content"),
        page: 0,
    }
}

// ── Release ──────────────────────────────────────────────────────────

impl Decode for Release {
    const KIND: EntityKind = EntityKind::Release;

    fn decode(body: &str) -> Result<Self, DecodeError> {
        let root = parse_object(body)?;
        let required = |field: &'static str| match root.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => Err(DecodeError::MissingField { field }),
            Some(_) => Err(DecodeError::Shape {
                field,
                expected: "a string",
            }),
        };
        Ok(Release {
            tag_name: required("tag_name")?,
            html_url: required("html_url")?,
            body: opt_string(root.get("body")),
        })
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn parse_object(body: &str) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(DecodeError::Shape {
            field: "<root>",
            expected: "an object",
        }),
    }
}

fn take_array(root: &mut Map<String, Value>, field: &'static str) -> Result<Vec<Value>, DecodeError> {
    match root.remove(field) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(DecodeError::Shape {
            field,
            expected: "an array",
        }),
        None => Err(DecodeError::MissingField { field }),
    }
}

fn from_values<T: DeserializeOwned>(
    values: impl IntoIterator<Item = Value>,
) -> Result<Vec<T>, DecodeError> {
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(DecodeError::from))
        .collect()
}

/// Textual form of a scalar; absent or `null` is empty.
fn opt_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
