use serde::{Deserialize, Serialize};

/// The latest published client release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub html_url: String,
    pub body: String,
}
