// Forum entity models
//
// The typed records the decoders produce. Fields use `#[serde(default)]` and
// lenient scalar handling liberally: the server is inconsistent about whether
// ids and counters arrive as strings or numbers, and about field presence.

mod community;
mod notice;
mod post;
mod release;
mod search;

pub use community::{Community, Forum, Timeline};
pub use notice::Notice;
pub use post::{Comment, Feed, Post};
pub use release::Release;
pub use search::{SearchHit, SearchResult};

/// Scalar coercions for fields whose JSON type varies between endpoints.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Accept a string, number, or bool and keep its textual form.
    /// `null` becomes an empty string.
    pub(crate) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        })
    }

    /// Accept a non-negative number or a numeric string; anything else is 0.
    pub(crate) fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }
}
