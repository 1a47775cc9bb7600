// islet-api: Async Rust client for the island forum API (transport + classification + decoding)

pub mod classify;
pub mod client;
pub mod decode;
pub mod error;
pub mod model;
pub mod response;
pub mod time;
pub mod transport;

pub use classify::{
    ClassifiedMessage, MessageKind, MessageType, ParsedDocument, PostOutcome, classify,
    classify_payload,
};
pub use client::{Endpoint, IsletClient, PostDraft};
pub use decode::{Decode, DecodeError, Decoded, EntityKind, decode_entity};
pub use error::Error;
pub use model::{Comment, Community, Feed, Forum, Notice, Post, Release, SearchHit, SearchResult, Timeline};
pub use response::RawResponse;
pub use transport::{ApiRequest, TlsMode, Transport, TransportConfig};
