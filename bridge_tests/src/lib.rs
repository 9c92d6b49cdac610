// Test-only host and platform for end-to-end bridge tests.
//
// `TestHost` plays the engine: it owns a real `Dispatcher`, installs it as
// the active bridge, and records every response a listener sees, the same
// way the Godot adapter turns responses into signals. `FakePlatform` plays
// the native side of the boundary: it is a `BoundaryForwarder` that holds on
// to forwarded calls and later answers them from background threads through
// the real exported C entry point, in whatever order the test asks for.
//
// The only test-specific code here is the recording and the blocking poll
// loop. Routing, queuing and payload decoding all go through the same code
// paths as the real plugin.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::cell::RefCell;
use std::ffi::CString;
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use native_bridge_core::boundary::native_bridge_send_response;
use native_bridge_core::{
    ActiveGuard, BoundaryError, BoundaryForwarder, Dispatcher, ForeignCall, HandlerTable, Route,
};
use native_bridge_protocol::{BridgeResponse, Payload, unknown_action_payload};

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// The active slot is process-wide, so hosts in one test binary take turns.
static HOST_LOCK: Mutex<()> = Mutex::new(());

/// A test engine host wrapping a real, installed `Dispatcher`.
pub struct TestHost {
    pub dispatcher: Dispatcher,
    responses: Rc<RefCell<Vec<BridgeResponse>>>,
    guard: Option<ActiveGuard>,
    _serial: MutexGuard<'static, ()>,
}

impl TestHost {
    /// A host whose bridge runs handlers in-process.
    pub fn local() -> Self {
        Self::with_route(Route::Local)
    }

    /// A host whose bridge forwards every call to `platform`.
    pub fn with_platform(platform: &FakePlatform) -> Self {
        Self::with_route(Route::Boundary(Box::new(platform.clone())))
    }

    fn with_route(route: Route) -> Self {
        let serial = HOST_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut dispatcher = Dispatcher::new(HandlerTable::with_builtins(), route);
        dispatcher.set_log_traffic(false);
        let responses = Rc::new(RefCell::new(Vec::new()));
        let sink = responses.clone();
        dispatcher.subscribe(move |r: &BridgeResponse| sink.borrow_mut().push(r.clone()));
        let guard = dispatcher.install();
        Self {
            dispatcher,
            responses,
            guard: Some(guard),
            _serial: serial,
        }
    }

    pub fn call(&mut self, action: &str, payload: Payload, tag: &str) {
        self.dispatcher.call(action, payload, tag);
    }

    /// Everything listeners have received so far.
    pub fn responses(&self) -> Vec<BridgeResponse> {
        self.responses.borrow().clone()
    }

    /// Pump until at least `count` responses have arrived, or panic after
    /// `POLL_TIMEOUT`.
    pub fn wait_for_responses(&mut self, count: usize) -> Vec<BridgeResponse> {
        let deadline = Instant::now() + POLL_TIMEOUT;
        loop {
            self.dispatcher.pump();
            if self.responses.borrow().len() >= count {
                return self.responses();
            }
            if Instant::now() > deadline {
                panic!(
                    "timed out waiting for {count} responses (have {})",
                    self.responses.borrow().len()
                );
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Plugin teardown: uninstall the bridge but keep the host around so the
    /// test can check nothing else arrives.
    pub fn teardown(&mut self) {
        self.guard = None;
    }
}

/// A stand-in for platform code on the far side of the C boundary.
#[derive(Clone, Default)]
pub struct FakePlatform {
    pending: Arc<Mutex<Vec<ForeignCall>>>,
}

impl BoundaryForwarder for FakePlatform {
    fn forward(&self, call: ForeignCall) -> Result<(), BoundaryError> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        Ok(())
    }
}

impl FakePlatform {
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Answer every pending call, newest first, each from its own thread.
    /// Returns after all answers have been handed to the C entry point.
    pub fn answer_all_reversed(&self) {
        let calls: Vec<ForeignCall> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).rev().collect()
        };
        for call in calls {
            let (action, data_json, tag) = platform_handle(&call);
            thread::spawn(move || send_from_platform(&action, &data_json, &tag))
                .join()
                .expect("platform thread panicked");
        }
    }

    /// Answer every pending call concurrently, without waiting.
    pub fn answer_all_concurrently(&self) {
        let calls: Vec<ForeignCall> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };
        for call in calls {
            let (action, data_json, tag) = platform_handle(&call);
            thread::spawn(move || send_from_platform(&action, &data_json, &tag));
        }
    }

    /// Send an arbitrary response through the C entry point, as misbehaving
    /// platform code might.
    pub fn send_raw(&self, action: &str, data_json: &str, tag: &str) {
        send_from_platform(action, data_json, tag);
    }
}

/// The platform's own action handling: echo, or report the action unknown.
/// Works on the C strings it was given, like real platform code would.
fn platform_handle(call: &ForeignCall) -> (String, String, String) {
    let action = call.action().to_string_lossy().into_owned();
    let data_json = call.payload_json().to_string_lossy().into_owned();
    let tag = call.tag().to_string_lossy().into_owned();
    let reply = if action == "echo" {
        data_json
    } else {
        let payload = unknown_action_payload(&action);
        serde_json::to_string(&payload).expect("error payload serializes")
    };
    (action, reply, tag)
}

fn send_from_platform(action: &str, data_json: &str, tag: &str) {
    let action = CString::new(action).expect("action has no NUL");
    let data = CString::new(data_json).expect("payload has no NUL");
    let tag = CString::new(tag).expect("tag has no NUL");
    // SAFETY: the CStrings outlive the call.
    unsafe { native_bridge_send_response(action.as_ptr(), data.as_ptr(), tag.as_ptr()) };
}
