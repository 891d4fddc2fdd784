//! Response envelopes.
//!
//! The provider wraps payloads in an envelope carrying the request id and,
//! for list endpoints, a continuation cursor. Envelopes are decoded after the
//! keys have been camelCased.

use serde::{Deserialize, Serialize};

/// Envelope of a single-item endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse<T> {
    #[serde(default)]
    pub request_id: String,
    pub data: T,
}

/// Envelope of one page from a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default)]
    pub request_id: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Cursor for the next page; `None` marks the last page.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> ListResponse<T> {
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// Envelope of endpoints that only acknowledge the call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    #[serde(default)]
    pub request_id: String,
}
