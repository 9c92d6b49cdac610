// native_bridge_protocol — shared vocabulary for the native bridge.
//
// Defines what travels through the bridge and how it is written down when it
// has to cross the platform boundary as text. It has no dependency on the
// dispatcher or on Godot, so both the core crate and any platform-side test
// harness can use it.
//
// Module overview:
// - `payload.rs`:  `Payload` (a JSON object) and the `{error, message}`
//                  error payloads handlers produce.
// - `message.rs`:  `BridgeRequest` / `BridgeResponse` envelopes carrying the
//                  `(action, payload, tag)` triple.
// - `codec.rs`:    Canonical JSON encoding of payloads, with a strict decoder
//                  and a lenient one that degrades to an empty payload.
//
// Design decisions:
// - **JSON as the payload model.** The host's dictionaries and the platform
//   side's JSON both map onto it without loss.
// - **Tags are plain strings.** The bridge never inspects them, so there is
//   nothing a newtype would enforce.

pub mod codec;
pub mod message;
pub mod payload;

pub use codec::{CodecError, MAX_PAYLOAD_DEPTH, MAX_PAYLOAD_SIZE, decode_payload, decode_payload_or_empty, encode_payload};
pub use message::{BridgeRequest, BridgeResponse};
pub use payload::{
    BOUNDARY_UNAVAILABLE, Payload, UNKNOWN_ACTION, error_code, error_payload, unknown_action_payload,
};
