//! Serde types for the Gmail list/get responses.
//!
//! Only the fields the relay reads are modeled; everything else in the API
//! payload is ignored. Shapes are validated at deserialization time rather
//! than assumed at the point of use.

use serde::Deserialize;

/// Response of `users/{user}/messages` (list).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    /// Absent entirely when the query matches nothing.
    pub messages: Option<Vec<MessageRef>>,
    pub result_size_estimate: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: Option<String>,
}

/// Response of `users/{user}/messages/{id}?format=full`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// Millisecond epoch timestamp, as a decimal string.
    pub internal_date: Option<String>,
    pub snippet: Option<String>,
    pub payload: Option<MessagePart>,
}

/// A MIME part. The top-level payload and nested parts share this shape,
/// and parts nest arbitrarily for multipart messages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub mime_type: Option<String>,
    pub body: Option<MessageBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    /// Base64url-encoded part content.
    pub data: Option<String>,
    pub size: Option<u64>,
}
