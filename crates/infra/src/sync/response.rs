//! Decoding of remote ERP response bodies.
//!
//! List endpoints answer in several shapes depending on server version and
//! whether a resource or an RPC method produced them: a bare array, or the
//! array wrapped under `data`, `devices`, or `message`. Rejection bodies
//! spread their text over `exception`, `message`, and `_server_messages`
//! (the latter a JSON string containing a JSON array of JSON strings), so
//! classification gathers all three before matching.

use punchbridge_domain::PushOutcome;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Tagged union over the list-response shapes the remote system produces.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Bare(Vec<T>),
    Data { data: Vec<T> },
    Devices { devices: Vec<T> },
    Message { message: Vec<T> },
}

impl<T> ListResponse<T> {
    /// Unwrap whichever shape arrived.
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items)
            | Self::Data { data: items }
            | Self::Devices { devices: items }
            | Self::Message { message: items } => items,
        }
    }
}

/// Single-value RPC responses arrive under `message`.
#[derive(Debug, Deserialize)]
pub struct MethodResponse<T> {
    pub message: T,
}

pub fn parse_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, serde_json::Error> {
    serde_json::from_str::<ListResponse<T>>(body).map(ListResponse::into_items)
}

/// Pull every human-readable message out of a rejection body.
pub fn extract_error_text(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };

    let mut parts = Vec::new();
    if let Some(exception) = value.get("exception").and_then(|v| v.as_str()) {
        parts.push(exception.to_string());
    }
    if let Some(message) = value.get("message").and_then(|v| v.as_str()) {
        parts.push(message.to_string());
    }
    if let Some(raw) = value.get("_server_messages").and_then(|v| v.as_str()) {
        // _server_messages is a JSON array of JSON-encoded objects.
        if let Ok(messages) = serde_json::from_str::<Vec<String>>(raw) {
            for message in messages {
                match serde_json::from_str::<serde_json::Value>(&message) {
                    Ok(inner) => {
                        if let Some(text) = inner.get("message").and_then(|v| v.as_str()) {
                            parts.push(text.to_string());
                        }
                    }
                    Err(_) => parts.push(message),
                }
            }
        }
    }

    if parts.is_empty() {
        body.to_string()
    } else {
        parts.join(" | ")
    }
}

/// Map a rejection body to a definitive push outcome, when its wording
/// matches one of the known permanent rejections. `None` means the
/// rejection is unrecognized and must be treated as transient.
pub fn classify_rejection(body: &str) -> Option<PushOutcome> {
    let text = extract_error_text(body).to_lowercase();
    if text.contains("already has a log") || text.contains("duplicate") {
        return Some(PushOutcome::Duplicate);
    }
    if text.contains("no employee found") || text.contains("does not exist") {
        return Some(PushOutcome::UnknownEmployee);
    }
    None
}
