// Canonical text encoding for payloads crossing the platform boundary.
//
// A payload travels as a single JSON object in compact form. Keys come out
// sorted because `Payload` is BTreeMap-backed, so equal payloads always
// encode to identical text.
//
// Decoding has a strict form (`decode_payload`) that reports why the text was
// rejected, and a lenient form (`decode_payload_or_empty`) used on the inbound
// boundary path, where a malformed payload must degrade to an empty one
// rather than fail the response.
//
// `MAX_PAYLOAD_SIZE` caps what the decoder will look at. Text over the cap is
// rejected before parsing and so decodes leniently to an empty payload.
//
// `MAX_PAYLOAD_DEPTH` caps container nesting, with the payload object itself
// at depth 1. It sits below serde_json's parser recursion limit, and the
// encoder enforces it too, so anything `encode_payload` accepts decodes back.

use serde_json::Value;
use thiserror::Error;

use crate::payload::Payload;

/// Largest encoded payload the decoder accepts (16 MB).
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Deepest container nesting the codec accepts, counting the payload itself.
pub const MAX_PAYLOAD_DEPTH: usize = 100;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("payload is JSON but not an object (found {0})")]
    NotAnObject(&'static str),
    #[error("payload too large: {0} bytes (max {max})", max = MAX_PAYLOAD_SIZE)]
    TooLarge(usize),
    #[error("payload nested deeper than {max} levels", max = MAX_PAYLOAD_DEPTH)]
    TooDeep,
    #[error("payload could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Encode a payload as compact JSON text with sorted keys.
pub fn encode_payload(payload: &Payload) -> Result<String, CodecError> {
    if too_deep(payload) {
        return Err(CodecError::TooDeep);
    }
    serde_json::to_string(payload).map_err(CodecError::Encode)
}

/// Decode JSON text into a payload. The text must hold a single JSON object.
pub fn decode_payload(text: &str) -> Result<Payload, CodecError> {
    if text.len() > MAX_PAYLOAD_SIZE {
        return Err(CodecError::TooLarge(text.len()));
    }
    match serde_json::from_str::<Value>(text).map_err(CodecError::Parse)? {
        Value::Object(map) if too_deep(&map) => Err(CodecError::TooDeep),
        Value::Object(map) => Ok(map),
        other => Err(CodecError::NotAnObject(json_kind(&other))),
    }
}

/// Decode JSON text into a payload, treating any failure as an empty payload.
pub fn decode_payload_or_empty(text: &str) -> Payload {
    decode_payload(text).unwrap_or_else(|e| {
        log::debug!("native bridge: {e}, using empty payload");
        Payload::new()
    })
}

fn too_deep(payload: &Payload) -> bool {
    payload.values().any(|v| exceeds_depth(v, MAX_PAYLOAD_DEPTH - 1))
}

/// True if `value` holds more than `budget` levels of containers. Stops
/// descending once the budget is spent.
fn exceeds_depth(value: &Value, budget: usize) -> bool {
    match value {
        Value::Array(items) => budget == 0 || items.iter().any(|v| exceeds_depth(v, budget - 1)),
        Value::Object(map) => budget == 0 || map.values().any(|v| exceeds_depth(v, budget - 1)),
        _ => false,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
