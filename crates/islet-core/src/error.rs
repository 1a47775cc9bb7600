// ── Core error types ──
//
// Errors that escape the envelope stream. Almost everything that can go wrong
// during a reconciliation cycle is reported as a `Resource` with status
// `Error`; these are the failures that happen before a cycle starts, or in
// operations that have no stream to report through.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Query construction ───────────────────────────────────────────
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unexpected reply: {message}")]
    Decode { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<islet_api::Error> for CoreError {
    fn from(err: islet_api::Error) -> Self {
        match err {
            islet_api::Error::Transport(ref e) => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                reason: e.to_string(),
            },
            islet_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            islet_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            islet_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            islet_api::Error::Decode(e) => CoreError::Decode {
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_timeout_keeps_its_duration() {
        let err = CoreError::from(islet_api::Error::Timeout { timeout_secs: 7 });
        assert!(matches!(err, CoreError::Timeout { timeout_secs: 7 }));
    }

    #[test]
    fn store_errors_pass_through() {
        let err = CoreError::from(StoreError::Unavailable("disk full".into()));
        assert_eq!(err.to_string(), "local store unavailable: disk full");
    }
}
