// Request and response envelopes.
//
// Both directions carry the same triple: an action name, a payload, and the
// caller's tag. The tag is opaque to the bridge. It is copied from request to
// response untouched so the caller can match an asynchronous response to the
// request that produced it. Responses are broadcast, not addressed, so the tag
// is the only correlation mechanism there is.

use serde::{Deserialize, Serialize};

use crate::payload::Payload;

/// A request from the scripting layer to a native handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub action: String,
    pub payload: Payload,
    pub tag: String,
}

/// A response broadcast to every listener of the bridge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub action: String,
    pub payload: Payload,
    pub tag: String,
}

impl BridgeRequest {
    pub fn new(action: impl Into<String>, payload: Payload, tag: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            payload,
            tag: tag.into(),
        }
    }

    /// Consume the request and produce its response, carrying over its
    /// action and tag.
    pub fn into_reply(self, payload: Payload) -> BridgeResponse {
        BridgeResponse {
            action: self.action,
            payload,
            tag: self.tag,
        }
    }
}

impl BridgeResponse {
    pub fn new(action: impl Into<String>, payload: Payload, tag: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            payload,
            tag: tag.into(),
        }
    }
}
