// native_bridge_gdext — GDExtension plugin exposing the native bridge.
//
// This crate is a thin wrapper that exposes `native_bridge_core` to Godot 4
// via gdext (godot-rust). It contains no dispatch logic. It only translates
// between Godot types and bridge types and ties the bridge's lifetime to the
// plugin's.
//
// Lifecycle (scene initialization level):
// - init:   install the Godot log sink, allocate one `NativeBridge`, and
//           register it as the engine singleton `NativeBridge`.
// - deinit: unregister and free it. Freeing drops the dispatcher's
//           `ActiveGuard`, so platform responses arriving afterwards are
//           dropped instead of touching freed state.
//
// Module overview:
// - `native_bridge.rs`:  The `NativeBridge` Godot object: `call_native`,
//                        `send_response`, `pump`, the `native_response` signal.
// - `variant_codec.rs`:  `Dictionary` ↔ `Payload` conversion.
// - `godot_log.rs`:      `log` sink printing through `godot_print!` and friends.
//
// The platform's inbound C entry point `native_bridge_send_response` lives
// in `native_bridge_core::boundary`. It is re-exported here so the symbol
// ends up in this library's export table on iOS.
//
// See also: `native_bridge_core` for dispatch and the boundary adapter,
// `native_bridge_protocol` for payload types and the JSON codec.

mod godot_log;
mod native_bridge;
mod variant_codec;

use godot::classes::Engine;
use godot::prelude::*;
use native_bridge_core::BridgeConfig;

pub use native_bridge_core::boundary::native_bridge_send_response;

use crate::native_bridge::NativeBridge;

const SINGLETON_NAME: &str = "NativeBridge";

struct NativeBridgeExtension;

#[gdextension]
unsafe impl ExtensionLibrary for NativeBridgeExtension {
    fn on_level_init(level: InitLevel) {
        if level != InitLevel::Scene {
            return;
        }
        godot_log::install(BridgeConfig::default().log_level.to_filter());
        let bridge = NativeBridge::new_alloc().upcast::<Object>();
        Engine::singleton().register_singleton(SINGLETON_NAME, &bridge);
    }

    fn on_level_deinit(level: InitLevel) {
        if level != InitLevel::Scene {
            return;
        }
        let mut engine = Engine::singleton();
        if let Some(bridge) = engine.get_singleton(SINGLETON_NAME) {
            engine.unregister_singleton(SINGLETON_NAME);
            bridge.free();
        }
    }
}
