// native_bridge_core — request dispatch and response correlation for the
// native bridge.
//
// Scripts send `(action, payload, tag)` requests. The dispatcher routes each
// one to a handler and broadcasts the `(action, payload, tag)` response to
// every listener, with the tag copied through so callers can match responses
// to requests. The protocol is identical whether the handler runs in-process
// or on the far side of the platform boundary. The host (Godot) is kept out
// of this crate entirely; `native_bridge_gdext` adapts it.
//
// Module overview:
// - `handler.rs`:     `ActionHandler` trait, the built-in `echo` and
//                     unknown-action handlers, and `HandlerTable` (exact-match
//                     routing with a fallback).
// - `dispatcher.rs`:  `Dispatcher` — local vs. boundary routing, listener
//                     subscription and fan-out, draining queued responses.
// - `responder.rs`:   `Responder` — `Send` handle that queues responses for
//                     the dispatcher's thread over an `mpsc` channel.
// - `boundary.rs`:    Outbound `BoundaryForwarder` (iOS extern call) and the
//                     exported inbound C entry `native_bridge_send_response`.
// - `active.rs`:      The process-wide slot the C entry point uses to find
//                     the live dispatcher, with an RAII `ActiveGuard`.
// - `config.rs`:      `BridgeConfig` (route, traffic logging, log level),
//                     deserialized from JSON.
//
// Threading: everything except `Responder`, the active slot and the C entry
// point is single-threaded and owned by the host's main thread. Responses
// from other threads are queued and reach listeners on `Dispatcher::pump()`.
//
// Dependencies: `native_bridge_protocol` for payload types and the codec,
// `log` for diagnostics. No dependency on Godot.

pub mod active;
pub mod boundary;
pub mod config;
pub mod dispatcher;
pub mod handler;
pub mod responder;

pub use active::{ActiveGuard, active_responder};
pub use boundary::{BoundaryError, BoundaryForwarder, ForeignCall, deliver_foreign_response};
pub use config::{BridgeConfig, ConfigError, LogLevel, RouteMode};
pub use dispatcher::{Dispatcher, ListenerId, ResponseListener, Route};
pub use handler::{ActionHandler, HandlerTable};
pub use responder::Responder;
