use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::lenient;
use crate::time::server_time;

/// A thread head with (a page of) its replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub fid: String,
    #[serde(default, rename = "ReplyCount", deserialize_with = "lenient::count")]
    pub reply_count: u32,
    #[serde(default, deserialize_with = "lenient::string")]
    pub img: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ext: String,
    #[serde(with = "server_time")]
    pub now: NaiveDateTime,
    #[serde(default, deserialize_with = "lenient::string")]
    pub userid: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sage: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub admin: String,
    #[serde(default, rename = "Replies")]
    pub replies: Vec<Comment>,
}

impl Post {
    pub fn is_sage(&self) -> bool {
        self.sage == "1"
    }
}

/// A single reply (also what the quote endpoint returns).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub img: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ext: String,
    #[serde(with = "server_time")]
    pub now: NaiveDateTime,
    #[serde(default, deserialize_with = "lenient::string")]
    pub userid: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sage: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub admin: String,
}

/// A subscribed thread from the user's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub fid: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub img: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ext: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub now: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub userid: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: String,
}
