// GDExtension class exposing the bridge to scripts.
//
// `NativeBridge` is registered as the engine singleton `NativeBridge` (see
// `lib.rs`), so GDScript reaches it as a global:
//
//     NativeBridge.native_response.connect(_on_native_response)
//     NativeBridge.call_native("echo", {"x": 1}, "tag-42")
//
//     func _on_native_response(action, data, tag):
//         if tag == "tag-42": ...
//
// ## What it exposes
//
// - **`call_native(action, data, tag)`**: dispatch a request. On the local
//   route the `native_response` signal fires before this returns. On the
//   boundary route (iOS) it fires later, once the platform answers.
// - **`send_response(action, data, tag)`**: publish a response directly,
//   for scripts or plugins acting as handlers themselves.
// - **`pump()`**: emit responses that arrived from the platform thread.
//   Connected to `SceneTree.process_frame` automatically on the first
//   boundary call, so scripts rarely need it.
// - **`set_config_json(json)` / `get_config_json()`**: route and logging
//   settings (see `BridgeConfig` in the core crate).
// - **`known_actions()`**: action names with an in-process handler.
// - **Signal `native_response(action, data, tag)`**: every response, to
//   every connected listener. Listeners match on `tag`.
//
// Responses are collected from the dispatcher into `outbox` and emitted as
// signals afterwards, so a signal handler that calls back into the bridge
// never finds the dispatcher mid-call.
//
// The object owns the `ActiveGuard` for its dispatcher, so freeing it at
// plugin teardown is what makes late platform responses a no-op.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use godot::classes::{Engine, SceneTree};
use godot::global::Error;
use godot::prelude::*;
use native_bridge_core::{ActiveGuard, BridgeConfig, Dispatcher};
use native_bridge_protocol::message::BridgeResponse;

use crate::variant_codec::{dictionary_to_payload, payload_to_dictionary};

#[derive(GodotClass)]
#[class(base=Object)]
pub struct NativeBridge {
    base: Base<Object>,
    dispatcher: Dispatcher,
    outbox: Rc<RefCell<VecDeque<BridgeResponse>>>,
    config: BridgeConfig,
    _active: ActiveGuard,
    pump_connected: bool,
}

#[godot_api]
impl IObject for NativeBridge {
    fn init(base: Base<Object>) -> Self {
        let config = BridgeConfig::default();
        let mut dispatcher = Dispatcher::from_config(&config);
        let outbox = Rc::new(RefCell::new(VecDeque::new()));
        let sink = outbox.clone();
        dispatcher.subscribe(move |r: &BridgeResponse| sink.borrow_mut().push_back(r.clone()));
        let active = dispatcher.install();
        godot_print!(
            "NativeBridge: initialized ({} route)",
            if dispatcher.route().is_boundary() { "boundary" } else { "local" }
        );
        Self {
            base,
            dispatcher,
            outbox,
            config,
            _active: active,
            pump_connected: false,
        }
    }
}

#[godot_api]
impl NativeBridge {
    #[signal]
    fn native_response(action: GString, data: VarDictionary, tag: GString);

    /// Dispatch an action request. The response arrives as `native_response`.
    ///
    /// `data` crosses the bridge as JSON, on every route. Values JSON has no
    /// form for (vectors, colors, packed or typed arrays, objects) come back
    /// as their `str()` text, and non-string keys come back as strings. So
    /// even a local `echo` returns a plain-JSON copy, not the same Dictionary.
    /// A container that holds itself, or nesting past 100 levels, becomes
    /// null.
    #[func]
    fn call_native(&mut self, action: GString, data: VarDictionary, tag: GString) {
        let payload = dictionary_to_payload(&data);
        self.dispatcher.call(&action.to_string(), payload, &tag.to_string());
        if self.dispatcher.route().is_boundary() {
            self.connect_pump();
        }
        self.emit_pending();
    }

    /// Publish a response to every `native_response` listener.
    #[func]
    fn send_response(&mut self, action: GString, data: VarDictionary, tag: GString) {
        self.dispatcher.respond(BridgeResponse::new(
            action.to_string(),
            dictionary_to_payload(&data),
            tag.to_string(),
        ));
        self.emit_pending();
    }

    /// Emit responses queued by the platform thread. Returns how many.
    #[func]
    fn pump(&mut self) -> i64 {
        let delivered = self.dispatcher.pump();
        self.emit_pending();
        delivered as i64
    }

    /// Replace the bridge config from a JSON string. On parse failure, warns
    /// and keeps the current config.
    #[func]
    fn set_config_json(&mut self, json: GString) -> bool {
        match BridgeConfig::from_json_str(&json.to_string()) {
            Ok(config) => {
                self.dispatcher.apply_config(&config);
                log::set_max_level(config.log_level.to_filter());
                self.config = config;
                godot_print!("NativeBridge: loaded config ({:?} route)", self.config.route);
                true
            }
            Err(e) => {
                godot_warn!("NativeBridge: {e}, keeping current config");
                false
            }
        }
    }

    /// The current config as a JSON string.
    #[func]
    fn get_config_json(&self) -> GString {
        match serde_json::to_string(&self.config) {
            Ok(json) => GString::from(json.as_str()),
            Err(e) => {
                godot_error!("NativeBridge: failed to serialize config: {e}");
                GString::new()
            }
        }
    }

    /// Action names with an in-process handler, sorted.
    #[func]
    fn known_actions(&self) -> PackedStringArray {
        let mut names = PackedStringArray::new();
        for action in self.dispatcher.handlers().actions() {
            names.push(&GString::from(action));
        }
        names
    }

    fn emit_pending(&mut self) {
        let ready: Vec<BridgeResponse> = self.outbox.borrow_mut().drain(..).collect();
        for response in ready {
            let action = GString::from(response.action.as_str());
            let data = payload_to_dictionary(&response.payload);
            let tag = GString::from(response.tag.as_str());
            self.signals().native_response().emit(&action, &data, &tag);
        }
    }

    /// Hook `pump` to the scene tree's frame signal so platform responses
    /// are emitted on the main thread without script involvement.
    fn connect_pump(&mut self) {
        if self.pump_connected {
            return;
        }
        let Some(main_loop) = Engine::singleton().get_main_loop() else {
            return;
        };
        let Ok(mut tree) = main_loop.try_cast::<SceneTree>() else {
            godot_warn!("NativeBridge: main loop is not a SceneTree, call pump() manually");
            return;
        };
        let callable = Callable::from_object_method(&self.to_gd(), "pump");
        if tree.connect("process_frame", &callable) != Error::OK {
            godot_warn!("NativeBridge: could not connect pump to process_frame");
            return;
        }
        self.pump_connected = true;
    }
}
