// The bridge dispatcher: routes action requests and fans responses out to
// listeners.
//
// `Dispatcher` is owned by one thread (in Godot, the main thread through the
// `NativeBridge` object). It has two request paths chosen by its `Route`:
//
// - **Local.** `call` runs the matching handler from the `HandlerTable` and
//   immediately calls `respond` with the result. The response reaches every
//   listener before `call` returns.
// - **Boundary.** `call` hands the request to a `BoundaryForwarder` and
//   returns with no response. The platform side answers later through the C
//   entry point in `boundary.rs`, which queues the response on this
//   dispatcher's `Responder`. Queued responses reach listeners on the next
//   `pump()` (or the next local `respond`, which drains the queue first so
//   delivery order matches arrival order).
//
// Either way, the response carries the request's action and tag unchanged.
// Listeners receive every response and correlate by tag themselves. The
// dispatcher keeps no per-request state.
//
// If forwarding fails before the request leaves (a NUL in the action or
// tag, or a payload nested past `MAX_PAYLOAD_DEPTH`), the dispatcher answers
// locally with a `boundary_unavailable` error payload so the caller still
// sees exactly one response.

use std::mem;
use std::sync::mpsc::Receiver;

use native_bridge_protocol::message::{BridgeRequest, BridgeResponse};
use native_bridge_protocol::payload::{BOUNDARY_UNAVAILABLE, Payload, error_payload};

use crate::active::{self, ActiveGuard};
use crate::boundary::{BoundaryForwarder, ForeignCall, platform_forwarder};
use crate::config::{BridgeConfig, RouteMode};
use crate::handler::HandlerTable;
use crate::responder::{self, Responder};

/// Where `Dispatcher::call` sends requests.
pub enum Route {
    Local,
    Boundary(Box<dyn BoundaryForwarder>),
}

impl Route {
    /// Boundary on platforms that have a native counterpart, local elsewhere.
    pub fn platform_default() -> Self {
        platform_forwarder().map_or(Route::Local, Route::Boundary)
    }

    pub fn from_mode(mode: RouteMode) -> Self {
        match mode {
            RouteMode::Auto => Self::platform_default(),
            RouteMode::Local => Route::Local,
            RouteMode::Boundary => match platform_forwarder() {
                Some(forwarder) => Route::Boundary(forwarder),
                None => {
                    log::warn!("native bridge: no platform boundary on this target, routing locally");
                    Route::Local
                }
            },
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, Route::Boundary(_))
    }
}

/// Receives every response the dispatcher publishes.
pub trait ResponseListener {
    fn on_response(&mut self, response: &BridgeResponse);
}

impl<F> ResponseListener for F
where
    F: FnMut(&BridgeResponse),
{
    fn on_response(&mut self, response: &BridgeResponse) {
        self(response)
    }
}

/// Identifies a subscription for `Dispatcher::unsubscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub struct Dispatcher {
    handlers: HandlerTable,
    route: Route,
    responder: Responder,
    inbox: Receiver<BridgeResponse>,
    listeners: Vec<(ListenerId, Box<dyn ResponseListener>)>,
    next_listener_id: u64,
    log_traffic: bool,
}

impl Dispatcher {
    pub fn new(handlers: HandlerTable, route: Route) -> Self {
        let (responder, inbox) = responder::channel();
        Self {
            handlers,
            route,
            responder,
            inbox,
            listeners: Vec::new(),
            next_listener_id: 0,
            log_traffic: true,
        }
    }

    /// Built-in handlers, routed and logged as `config` says.
    pub fn from_config(config: &BridgeConfig) -> Self {
        let mut dispatcher = Self::new(HandlerTable::with_builtins(), Route::from_mode(config.route));
        dispatcher.log_traffic = config.log_traffic;
        dispatcher
    }

    /// Re-apply route and logging settings. Handlers and listeners are kept.
    pub fn apply_config(&mut self, config: &BridgeConfig) {
        self.route = Route::from_mode(config.route);
        self.log_traffic = config.log_traffic;
    }

    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerTable {
        &mut self.handlers
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn set_route(&mut self, route: Route) {
        self.route = route;
    }

    pub fn set_log_traffic(&mut self, enabled: bool) {
        self.log_traffic = enabled;
    }

    /// Dispatch one request. Never fails: every outcome, including an
    /// unknown action, surfaces as a response.
    pub fn call(&mut self, action: &str, payload: Payload, tag: &str) {
        self.call_request(BridgeRequest::new(action, payload, tag));
    }

    pub fn call_request(&mut self, mut request: BridgeRequest) {
        if self.log_traffic {
            log::info!("native bridge: call action={} tag={}", request.action, request.tag);
        }

        let local_payload = match &self.route {
            Route::Local => {
                let payload = mem::take(&mut request.payload);
                Some(self.handlers.dispatch(&request.action, payload))
            }
            Route::Boundary(forwarder) => {
                match ForeignCall::new(&request.action, &request.payload, &request.tag)
                    .and_then(|c| forwarder.forward(c))
                {
                    Ok(()) => None,
                    Err(e) => {
                        log::warn!(
                            "native bridge: could not forward action={} tag={}: {e}",
                            request.action,
                            request.tag
                        );
                        Some(error_payload(BOUNDARY_UNAVAILABLE, e.to_string()))
                    }
                }
            }
        };

        if let Some(payload) = local_payload {
            self.respond(request.into_reply(payload));
        }
    }

    /// Publish a response to every listener, after any queued ones.
    pub fn respond(&mut self, response: BridgeResponse) {
        self.pump();
        self.deliver(&response);
    }

    /// Deliver responses queued from other threads. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(response) = self.inbox.try_recv() {
            self.deliver(&response);
            delivered += 1;
        }
        delivered
    }

    /// A handle other threads can use to queue responses.
    pub fn responder(&self) -> Responder {
        self.responder.clone()
    }

    /// Publish this dispatcher as the process's active bridge, so the
    /// platform callback can reach it. Uninstalls when the guard drops.
    pub fn install(&self) -> ActiveGuard {
        active::install(self.responder())
    }

    pub fn subscribe(&mut self, listener: impl ResponseListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn deliver(&mut self, response: &BridgeResponse) {
        if self.log_traffic {
            log::info!(
                "native bridge: response action={} tag={}",
                response.action,
                response.tag
            );
        }
        if self.listeners.is_empty() {
            log::debug!("native bridge: no listeners for response tag={}", response.tag);
        }
        for (_, listener) in &mut self.listeners {
            listener.on_response(response);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(HandlerTable::with_builtins(), Route::platform_default())
    }
}
