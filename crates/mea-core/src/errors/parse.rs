//! Error-body parsing for failed HTTP responses.
//!
//! Handles the envelopes the backend uses:
//! - Flat:     `{"error": "..."}`
//! - Nested:   `{"error": {"message": "..."}}`
//! - Detail:   `{"detail": "..."}` or `{"detail": [{"msg": "..."}]}`
//! - Message:  `{"message": "..."}`

use serde_json::Value;

/// Generic message for a failed request whose body carries no message.
pub fn generic_message(status: u16) -> String {
    format!("Request failed with status {status}")
}

/// Extract the error message from a response body, if the body has one.
pub fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    if let Some(msg) = json["error"].as_str() {
        return Some(msg.to_string());
    }
    if let Some(msg) = json["error"]["message"].as_str() {
        return Some(msg.to_string());
    }
    if let Some(msg) = json["detail"].as_str() {
        return Some(msg.to_string());
    }
    // Validation errors: {"detail": [{"loc": [...], "msg": "...", "type": "..."}]}
    if let Some(msg) = json["detail"][0]["msg"].as_str() {
        return Some(msg.to_string());
    }
    json["message"].as_str().map(String::from)
}

/// Message for a failed response: the body's message or a generic fallback.
pub fn failure_message(body: &str, status: u16) -> String {
    error_message(body)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| generic_message(status))
}
