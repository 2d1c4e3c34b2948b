//! JSON encode/decode helpers.
//!
//! Request bodies come in as raw bytes so that an empty body can stand
//! for `{}` (the lobby create call is often sent without one) and so
//! that every malformed body maps to one [`ValidationError`].

use serde::de::DeserializeOwned;

use crate::validation::ValidationError;
use crate::wire_types::ServerEvent;

/// Decode a request body. Blank input decodes as `{}`.
pub fn decode_request<T: DeserializeOwned>(buf: &[u8]) -> Result<T, ValidationError> {
    let body = if buf.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        buf
    };
    serde_json::from_slice(body).map_err(|e| ValidationError::Body(e.to_string()))
}

/// Serialize a realtime event to the text frame sent to subscribers.
pub fn encode_event(event: &ServerEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Parse a text frame back into an event (clients and tests).
pub fn decode_event(text: &str) -> Result<ServerEvent, serde_json::Error> {
    serde_json::from_str(text)
}
