// ── Resource envelope ──
//
// The status-tagged container every consumer observes. Local snapshots and
// remote outcomes are both expressed as `Resource`s; `origin` tells them apart.

use islet_api::{ClassifiedMessage, MessageKind};
use serde::Serialize;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum LoadingStatus {
    Loading,
    Success,
    Error,
    #[strum(serialize = "no data")]
    NoData,
}

impl LoadingStatus {
    /// `true` for every status except `Loading`.
    pub fn is_terminal(self) -> bool {
        self != Self::Loading
    }
}

/// Which branch of a reconciliation produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    Remote,
}

/// `data` is present iff `status` is `Success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource<T> {
    pub status: LoadingStatus,
    pub data: Option<T>,
    pub message: Option<String>,
    pub origin: Origin,
}

impl<T> Resource<T> {
    pub fn loading() -> Self {
        Self {
            status: LoadingStatus::Loading,
            data: None,
            message: None,
            origin: Origin::Remote,
        }
    }

    /// A cached value: always a success with no message.
    pub fn from_local(data: T) -> Self {
        Self {
            status: LoadingStatus::Success,
            data: Some(data),
            message: None,
            origin: Origin::Local,
        }
    }

    /// Map a classified reply (and, on success, its decoded payload).
    ///
    /// A success without a payload has nothing to show and becomes `NoData`.
    pub fn from_remote(classified: &ClassifiedMessage, data: Option<T>) -> Self {
        match (classified.kind, data) {
            (MessageKind::Success, Some(data)) => Self {
                status: LoadingStatus::Success,
                data: Some(data),
                message: None,
                origin: Origin::Remote,
            },
            (MessageKind::Error, _) => Self::error(classified.display_text(), Origin::Remote),
            (MessageKind::Empty | MessageKind::Success, _) => Self {
                message: Some(classified.text.clone()),
                ..Self::no_data(Origin::Remote)
            },
        }
    }

    pub fn no_data(origin: Origin) -> Self {
        Self {
            status: LoadingStatus::NoData,
            data: None,
            message: None,
            origin,
        }
    }

    pub fn error(message: impl Into<String>, origin: Origin) -> Self {
        Self {
            status: LoadingStatus::Error,
            data: None,
            message: Some(message.into()),
            origin,
        }
    }

    /// Prefix an error message with `context`. Other statuses pass through.
    pub fn with_context(mut self, context: Option<&str>) -> Self {
        if let (LoadingStatus::Error, Some(context)) = (self.status, context) {
            let message = self.message.take().unwrap_or_default();
            self.message = Some(format!("{context}{message}"));
        }
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        Resource {
            status: self.status,
            data: self.data.map(f),
            message: self.message,
            origin: self.origin,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LoadingStatus::Success
    }
}
