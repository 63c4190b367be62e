use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One extracted search hit
///
/// Immutable once created. `key` is stable across runs for the same
/// underlying message and is what deduplication works on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub key: String,
    pub timestamp: DateTime<Utc>,

    /// Raw workspace timestamp (`<seconds>.<micros>`)
    pub ts: String,
    pub sender: String,
    pub channel: String,
    pub permalink: Option<String>,

    #[serde(rename = "text")]
    pub body: String,

    /// The UI shortened the body and expanding it failed; `body` is incomplete
    pub truncated: bool,
}
