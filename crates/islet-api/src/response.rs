// Raw transport reply
//
// The unclassified result of one HTTP exchange. Produced once per request
// attempt and handed to the classifier; nothing here interprets the body.

use std::borrow::Cow;

use bytes::Bytes;

/// HTTP 204.
pub const NO_CONTENT: u16 = 204;

/// Status, success flag, and body of a single reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub is_successful: bool,
    pub body: Option<Bytes>,
    /// Canonical reason phrase for `status`, used when an error reply has no body.
    pub reason: Option<String>,
}

impl RawResponse {
    /// Build a reply with a body. Success is derived from the status code.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            is_successful: (200..300).contains(&status),
            body: Some(body.into()),
            reason: canonical_reason(status),
        }
    }

    /// Build a reply that carried no body at all.
    pub fn without_body(status: u16) -> Self {
        Self {
            status,
            is_successful: (200..300).contains(&status),
            body: None,
            reason: canonical_reason(status),
        }
    }

    /// Body decoded as UTF-8 (lossy). `None` when no body was sent.
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }

    /// `true` for 204 or an absent / blank body.
    pub fn is_empty(&self) -> bool {
        self.status == NO_CONTENT
            || self
                .body_text()
                .is_none_or(|text| text.trim().is_empty())
    }

    /// Drain a `reqwest` response into an owned reply.
    pub(crate) async fn read(resp: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = resp.status();
        let body = resp.bytes().await?;
        Ok(Self {
            status: status.as_u16(),
            is_successful: status.is_success(),
            body: Some(body),
            reason: status.canonical_reason().map(String::from),
        })
    }
}

fn canonical_reason(status: u16) -> Option<String> {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(String::from)
}
