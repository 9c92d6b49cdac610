// Payload type and the structured error payloads handlers return.
//
// A payload is a JSON object: string keys mapped to dynamically typed values
// (strings, numbers, booleans, null, nested arrays and objects). Using
// `serde_json::Map` directly keeps the payload shape identical on both sides
// of the platform boundary, where it travels as JSON text (see `codec.rs`).
//
// `serde_json::Map` is BTreeMap-backed unless `preserve_order` is enabled,
// which is what makes the encoded form canonical (keys always sorted). Do not
// turn that feature on anywhere in the workspace.

use serde_json::{Map, Value};

/// Structured key-value data attached to a request or response.
pub type Payload = Map<String, Value>;

/// Error code for actions no handler recognizes.
pub const UNKNOWN_ACTION: &str = "unknown_action";

/// Error code for requests that could not be handed to the platform side.
pub const BOUNDARY_UNAVAILABLE: &str = "boundary_unavailable";

/// Build an error payload of the form `{error: <code>, message: <message>}`.
pub fn error_payload(code: &str, message: impl Into<String>) -> Payload {
    let mut payload = Payload::new();
    payload.insert("error".into(), Value::String(code.into()));
    payload.insert("message".into(), Value::String(message.into()));
    payload
}

/// The payload produced for an action with no registered handler.
pub fn unknown_action_payload(action: &str) -> Payload {
    error_payload(UNKNOWN_ACTION, format!("Unknown action: {action}"))
}

/// Return the error code if `payload` is an error payload.
pub fn error_code(payload: &Payload) -> Option<&str> {
    payload.get("error").and_then(Value::as_str)
}
