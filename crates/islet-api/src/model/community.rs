use serde::{Deserialize, Serialize};

use super::lenient;

/// A group of boards (forums) as listed by `getForumList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sort: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(default)]
    pub forums: Vec<Forum>,
}

/// A single board inside a community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub fgroup: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sort: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, rename = "showName", deserialize_with = "lenient::string")]
    pub show_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub msg: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub interval: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub status: String,
}

impl Forum {
    /// Name to display: `showName` when the server provides one.
    pub fn display_name(&self) -> &str {
        if self.show_name.is_empty() {
            &self.name
        } else {
            &self.show_name
        }
    }
}

/// A timeline: an aggregated view across boards, listed in the first
/// (sentinel) entry of `forumListV1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub display_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub notice: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub max_page: u32,
}
