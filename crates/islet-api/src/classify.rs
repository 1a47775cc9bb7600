// Reply classification
//
// Turns a `RawResponse` into one of three outcomes -- empty, error, success --
// without ever failing. The forum answers in three dialects: a JSON object
// with `errcode`/`errmsg`, a bare text message, or (behind some proxies and on
// moderation actions) a complete HTML error page. The HTML page is reduced to
// its `.system-message` text so callers never surface raw markup.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::response::RawResponse;

/// Text carried by a successful classification.
pub const SUCCESS_TEXT: &str = "Ok";
/// Text carried by an empty classification.
pub const EMPTY_TEXT: &str = "EmptyResponse";
/// Text for a failed, bodyless reply whose status has no reason phrase.
pub const UNKNOWN_ERROR_TEXT: &str = "unknown error";

/// `errcode` value the server uses for success.
const SUCCESS_SENTINEL: i64 = 0;

/// A complete HTML document: an opening `<html…>` and a closing `</html…>`.
static HTML_DOCUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<html[^>]*>.*</html[^>]*>").expect("HTML document pattern is valid")
});

static SYSTEM_MESSAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".system-message").expect("selector is valid"));
static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("selector is valid"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("selector is valid"));

// ── Outcome types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Empty,
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    PlainText,
    StructuredDocument,
}

/// The reduced form of an HTML error page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedDocument {
    pub title: Option<String>,
    /// Text of the first `.system-message` block (navigation links removed),
    /// or of `<body>` when the page has no such block.
    pub message: String,
}

impl ParsedDocument {
    /// Parse markup leniently. Broken markup still yields a document; the
    /// parser recovers the way a browser would.
    pub fn parse(markup: &str) -> Self {
        let html = Html::parse_document(markup);

        let title = html
            .select(&TITLE)
            .next()
            .map(visible_text)
            .filter(|t| !t.is_empty());

        let message = html
            .select(&SYSTEM_MESSAGE)
            .next()
            .or_else(|| html.select(&BODY).next())
            .map(visible_text)
            .unwrap_or_default();

        Self { title, message }
    }
}

/// Classification result.
///
/// `document` is only ever set for HTML error pages; a success is always
/// plain text with no document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedMessage {
    pub kind: MessageKind,
    pub message_type: MessageType,
    pub text: String,
    pub document: Option<ParsedDocument>,
}

impl ClassifiedMessage {
    pub fn success() -> Self {
        Self {
            kind: MessageKind::Success,
            message_type: MessageType::PlainText,
            text: SUCCESS_TEXT.into(),
            document: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            kind: MessageKind::Empty,
            message_type: MessageType::PlainText,
            text: EMPTY_TEXT.into(),
            document: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            message_type: MessageType::PlainText,
            text: text.into(),
            document: None,
        }
    }

    /// An error whose text is an HTML page. Keeps the raw markup in `text`
    /// and the reduced page in `document`.
    pub fn html_error(markup: &str) -> Self {
        Self {
            kind: MessageKind::Error,
            message_type: MessageType::StructuredDocument,
            text: markup.to_owned(),
            document: Some(ParsedDocument::parse(markup)),
        }
    }

    /// Synthesized when the transport failed before any reply existed.
    pub fn transport_failure(err: &impl std::fmt::Display) -> Self {
        Self::error(err.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.kind == MessageKind::Success
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }

    /// Human-readable text: the reduced page for HTML errors, `text` otherwise.
    pub fn display_text(&self) -> &str {
        match &self.document {
            Some(doc) if !doc.message.is_empty() => &doc.message,
            _ => &self.text,
        }
    }
}

// ── Classifier ───────────────────────────────────────────────────────

/// Classify a reply. Never fails; anything unrecognizable becomes a
/// plain-text error carrying the raw body.
pub fn classify(raw: &RawResponse) -> ClassifiedMessage {
    if raw.is_empty() {
        trace!(status = raw.status, "empty reply");
        // Only a successful call can mean "nothing there"; a failed one with
        // no body is still a failure, described by its reason phrase.
        return if raw.is_successful {
            ClassifiedMessage::empty()
        } else {
            ClassifiedMessage::error(raw.reason.as_deref().unwrap_or(UNKNOWN_ERROR_TEXT))
        };
    }
    let body = raw.body_text().unwrap_or_default();

    let classified = if raw.is_successful {
        classify_body(&body)
    } else {
        classify_error_body(&body)
    };

    debug!(
        status = raw.status,
        kind = ?classified.kind,
        message_type = ?classified.message_type,
        "classified reply"
    );
    classified
}

/// Classify a reply to a data endpoint.
///
/// Same as [`classify`], except that a 2xx JSON body with no `errcode` at all
/// (a bare array, or an object from a service that does not use the envelope)
/// is the payload itself and counts as success.
pub fn classify_payload(raw: &RawResponse) -> ClassifiedMessage {
    if raw.is_successful && !raw.is_empty() {
        let body = raw.body_text().unwrap_or_default();
        let is_bare_payload = match serde_json::from_str::<Value>(&body) {
            Ok(Value::Array(_)) => true,
            Ok(Value::Object(map)) => !map.contains_key("errcode"),
            _ => false,
        };
        if is_bare_payload {
            trace!(status = raw.status, "bare JSON payload");
            return ClassifiedMessage::success();
        }
    }
    classify(raw)
}

/// 2xx reply with a body.
fn classify_body(body: &str) -> ClassifiedMessage {
    let json = serde_json::from_str::<Value>(body).ok();

    if json.as_ref().is_some_and(is_success_marker) {
        return ClassifiedMessage::success();
    }

    if HTML_DOCUMENT.is_match(body) {
        return ClassifiedMessage::html_error(body);
    }

    let message = json.as_ref().and_then(error_message).unwrap_or(body);
    ClassifiedMessage::error(message)
}

/// Non-2xx reply with a body.
fn classify_error_body(body: &str) -> ClassifiedMessage {
    let json = serde_json::from_str::<Value>(body).ok();
    let message = json.as_ref().and_then(error_message).unwrap_or(body);

    if HTML_DOCUMENT.is_match(message) {
        ClassifiedMessage::html_error(message)
    } else {
        ClassifiedMessage::error(message)
    }
}

fn is_success_marker(json: &Value) -> bool {
    match json.get("errcode") {
        Some(Value::Number(n)) => n.as_i64() == Some(SUCCESS_SENTINEL),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok() == Some(SUCCESS_SENTINEL),
        _ => false,
    }
}

fn error_message(json: &Value) -> Option<&str> {
    json.get("errmsg").and_then(Value::as_str)
}

/// Text of `root` with every `.jump` subtree skipped and whitespace collapsed.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_jump = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| el.classes().any(|class| class == "jump"))
        });
        if !in_jump {
            raw.push_str(text);
        }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Post submission outcome ─────────────────────────────────────────

/// Result of submitting a post: accepted or not, plus a message to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostOutcome {
    pub accepted: bool,
    pub message: String,
}

impl From<&ClassifiedMessage> for PostOutcome {
    fn from(classified: &ClassifiedMessage) -> Self {
        Self {
            accepted: classified.is_success(),
            message: classified.display_text().to_owned(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok(body: &str) -> RawResponse {
        RawResponse::new(200, body.to_owned())
    }

    #[test]
    fn errcode_zero_is_success() {
        for body in [
            r#"{"errcode":0}"#,
            r#"{"errcode":"0","forumListV1":[]}"#,
            r#"{"errcode":0,"errmsg":"ignored"}"#,
        ] {
            assert_eq!(classify(&ok(body)), ClassifiedMessage::success(), "{body}");
        }
    }

    #[test]
    fn errmsg_is_extracted_for_nonzero_errcode() {
        let classified = classify(&ok(r#"{"errcode":1,"errmsg":"no such board"}"#));
        assert_eq!(classified.kind, MessageKind::Error);
        assert_eq!(classified.message_type, MessageType::PlainText);
        assert_eq!(classified.text, "no such board");
        assert!(classified.document.is_none());
    }

    #[test]
    fn json_without_errmsg_falls_back_to_body() {
        let body = r#"{"errcode":7}"#;
        let classified = classify(&ok(body));
        assert!(classified.is_error());
        assert_eq!(classified.text, body);
    }

    #[test]
    fn malformed_json_degrades_to_plain_text_error() {
        let classified = classify(&ok("{errcode: oops"));
        assert!(classified.is_error());
        assert_eq!(classified.message_type, MessageType::PlainText);
        assert_eq!(classified.text, "{errcode: oops");
    }

    #[test]
    fn empty_and_no_content_are_empty() {
        assert_eq!(classify(&RawResponse::without_body(200)).kind, MessageKind::Empty);
        assert_eq!(classify(&ok("")).kind, MessageKind::Empty);
        assert_eq!(
            classify(&RawResponse::new(204, r#"{"errcode":0}"#)).kind,
            MessageKind::Empty
        );
        assert_eq!(classify(&ok("")).text, EMPTY_TEXT);
    }

    #[test]
    fn failed_reply_without_body_is_an_error() {
        let failed = classify(&RawResponse::without_body(503));
        assert_eq!(failed, ClassifiedMessage::error("Service Unavailable"));

        let blank = classify(&RawResponse::new(500, "  "));
        assert_eq!(blank.text, "Internal Server Error");
        assert!(blank.is_error());

        let unnamed = classify(&RawResponse::without_body(599));
        assert_eq!(unnamed, ClassifiedMessage::error(UNKNOWN_ERROR_TEXT));
    }

    #[test]
    fn html_page_is_reduced_without_jump_link() {
        let body = r#"<html><body><div class="system-message">Banned<a class="jump">x</a></div></body></html>"#;
        let classified = classify(&ok(body));

        assert_eq!(classified.kind, MessageKind::Error);
        assert_eq!(classified.message_type, MessageType::StructuredDocument);
        assert_eq!(classified.text, body);
        assert_eq!(classified.document.as_ref().unwrap().message, "Banned");
        assert_eq!(classified.display_text(), "Banned");
    }

    #[test]
    fn html_page_with_nested_blocks_and_title() {
        let body = "<!DOCTYPE html>\n<HTML lang=\"zh\">\n<head><title> Error </title></head>\n\
                    <body><div class=\"system-message\">\n  <h1>:(</h1>\n  <p class=\"error\">  \
                    too   fast </p>\n  <p class=\"jump\">jump <a href=\"/\">back</a></p>\n</div></body></HTML>";
        let doc = classify(&ok(body)).document.unwrap();
        assert_eq!(doc.title.as_deref(), Some("Error"));
        assert_eq!(doc.message, ":( too fast");
    }

    #[test]
    fn html_without_system_message_uses_body_text() {
        let body = "<html><body><p>Gateway   down</p></body></html>";
        let classified = classify(&ok(body));
        assert_eq!(classified.display_text(), "Gateway down");
    }

    #[test]
    fn broken_markup_never_panics() {
        let body = "<html><div class=\"system-message\"><<b>unterminated</html>";
        let classified = classify(&ok(body));
        assert!(classified.is_error());
        assert!(classified.document.is_some());
    }

    #[test]
    fn error_status_prefers_errmsg() {
        let raw = RawResponse::new(403, r#"{"errmsg":"forbidden board"}"#);
        let classified = classify(&raw);
        assert!(classified.is_error());
        assert_eq!(classified.text, "forbidden board");
    }

    #[test]
    fn error_status_with_html_body_is_structured() {
        let raw = RawResponse::new(
            502,
            "<html><body><div class=\"system-message\">Bad gateway</div></body></html>",
        );
        let classified = classify(&raw);
        assert_eq!(classified.message_type, MessageType::StructuredDocument);
        assert_eq!(classified.display_text(), "Bad gateway");
    }

    #[test]
    fn error_status_does_not_honor_success_marker() {
        let classified = classify(&RawResponse::new(500, r#"{"errcode":0}"#));
        assert!(classified.is_error());
    }

    #[test]
    fn classification_is_idempotent() {
        let raw = ok(r#"<html><body><div class="system-message">x</div></body></html>"#);
        assert_eq!(classify(&raw), classify(&raw));
    }

    #[test]
    fn payload_without_envelope_is_success() {
        assert!(classify_payload(&ok(r#"[{"id":1}]"#)).is_success());
        assert!(classify_payload(&ok(r#"{"tag_name":"v1"}"#)).is_success());
        assert!(classify_payload(&ok(r#"{"errcode":0,"forumListV1":[]}"#)).is_success());

        let rejected = classify_payload(&ok(r#"{"errcode":1,"errmsg":"no such board"}"#));
        assert_eq!(rejected, ClassifiedMessage::error("no such board"));
        assert!(classify_payload(&RawResponse::new(404, "[]")).is_error());
        // The plain classifier still wants the marker.
        assert!(classify(&ok("[]")).is_error());
    }

    #[test]
    fn post_outcome_uses_display_text() {
        let banned = classify(&ok(
            r#"<html><body><div class="system-message">Banned<a class="jump">x</a></div></body></html>"#,
        ));
        assert_eq!(
            PostOutcome::from(&banned),
            PostOutcome { accepted: false, message: "Banned".into() }
        );
        assert!(PostOutcome::from(&ClassifiedMessage::success()).accepted);
    }
}
