// Platform boundary adapter: handing requests to native platform code and
// taking its responses back.
//
// On platforms where actions are implemented natively outside Rust (iOS),
// the dispatcher does not run a local handler. Instead:
//
// 1. Outbound. The request is flattened to three owned C strings (action,
//    canonical payload JSON, tag) and passed to
//    `ios_native_bridge_call_native`. The platform side copies what it needs
//    during the call; the strings are freed when the call returns. `call`
//    then returns with no response yet.
// 2. Inbound. Some time later, on whatever thread the platform runtime
//    picks, the platform calls the exported `native_bridge_send_response`
//    with the same triple. That function looks up the active bridge, decodes
//    the payload (malformed text becomes an empty payload), and queues the
//    response through the bridge's `Responder`. If no bridge is installed the
//    response is dropped.
//
// There is no timeout. A request the platform never answers stays pending
// forever, and nothing on this side knows about it.
//
// `BoundaryForwarder` is the seam for the outbound half. `ExternForwarder`
// is the real iOS implementation. Tests supply their own forwarders that
// play the platform role and call back through the C entry point.

use std::ffi::{CStr, CString, c_char};

use native_bridge_protocol::codec::{CodecError, decode_payload_or_empty, encode_payload};
use native_bridge_protocol::message::BridgeResponse;
use native_bridge_protocol::payload::Payload;
use thiserror::Error;

use crate::active;

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("{field} contains an interior NUL byte and cannot cross the C boundary")]
    InteriorNul { field: &'static str },
    #[error(transparent)]
    Encode(#[from] CodecError),
    #[error("platform boundary unavailable: {0}")]
    Unavailable(String),
}

/// A request flattened into owned C strings, ready to hand to platform code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignCall {
    action: CString,
    payload_json: CString,
    tag: CString,
}

impl ForeignCall {
    pub fn new(action: &str, payload: &Payload, tag: &str) -> Result<Self, BoundaryError> {
        let payload_json = encode_payload(payload)?;
        Ok(Self {
            action: c_string(action, "action")?,
            // serde_json escapes NUL inside strings, so this cannot fail in
            // practice.
            payload_json: c_string(&payload_json, "payload")?,
            tag: c_string(tag, "tag")?,
        })
    }

    pub fn action(&self) -> &CStr {
        &self.action
    }

    pub fn payload_json(&self) -> &CStr {
        &self.payload_json
    }

    pub fn tag(&self) -> &CStr {
        &self.tag
    }
}

fn c_string(value: &str, field: &'static str) -> Result<CString, BoundaryError> {
    CString::new(value).map_err(|_| BoundaryError::InteriorNul { field })
}

/// Outbound half of the boundary: passes a request to the platform side.
///
/// `forward` must not produce a response itself. Responses come back only
/// through `native_bridge_send_response` (or `deliver_foreign_response`).
pub trait BoundaryForwarder {
    fn forward(&self, call: ForeignCall) -> Result<(), BoundaryError>;
}

#[cfg(target_os = "ios")]
unsafe extern "C" {
    fn ios_native_bridge_call_native(
        action: *const c_char,
        data_json: *const c_char,
        tag: *const c_char,
    );
}

/// Forwards to the iOS platform implementation over its C entry point.
#[cfg(target_os = "ios")]
#[derive(Debug, Default)]
pub struct ExternForwarder;

#[cfg(target_os = "ios")]
impl BoundaryForwarder for ExternForwarder {
    fn forward(&self, call: ForeignCall) -> Result<(), BoundaryError> {
        // SAFETY: all three pointers are valid NUL-terminated strings that
        // outlive the call. The platform side copies them before returning.
        unsafe {
            ios_native_bridge_call_native(
                call.action().as_ptr(),
                call.payload_json().as_ptr(),
                call.tag().as_ptr(),
            );
        }
        Ok(())
    }
}

/// The forwarder for the platform this crate was built for, if it has one.
pub fn platform_forwarder() -> Option<Box<dyn BoundaryForwarder>> {
    #[cfg(target_os = "ios")]
    {
        Some(Box::new(ExternForwarder))
    }
    #[cfg(not(target_os = "ios"))]
    {
        None
    }
}

/// Deliver a platform-side response to the active bridge.
///
/// Returns `true` if a bridge was installed and accepted the response.
/// Malformed `payload_json` is delivered as an empty payload.
pub fn deliver_foreign_response(action: &str, payload_json: &str, tag: &str) -> bool {
    let Some(responder) = active::active_responder() else {
        log::debug!("native bridge: no active instance, dropping response action={action} tag={tag}");
        return false;
    };
    let payload = decode_payload_or_empty(payload_json);
    let delivered = responder.respond(BridgeResponse::new(action, payload, tag));
    if !delivered {
        log::debug!("native bridge: instance gone, dropping response action={action} tag={tag}");
    }
    delivered
}

/// Inbound C entry point called by platform code to return a response.
///
/// Safe to call from any thread, before init, and after teardown. Null
/// pointers are read as empty strings and invalid UTF-8 is replaced.
///
/// # Safety
///
/// Each non-null pointer must point to a NUL-terminated string that stays
/// valid for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn native_bridge_send_response(
    action: *const c_char,
    data_json: *const c_char,
    tag: *const c_char,
) {
    // SAFETY: forwarded from this function's contract.
    let (action, data_json, tag) = unsafe { (lossy(action), lossy(data_json), lossy(tag)) };
    deliver_foreign_response(&action, &data_json, &tag);
}

/// # Safety
///
/// `ptr` is null or points to a valid NUL-terminated string.
unsafe fn lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
