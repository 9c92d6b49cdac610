// `log` backend that prints through Godot's output.
//
// The core crates log through the `log` facade. This sink routes their
// records to the editor/console output: errors to `godot_error!`, warnings
// to `godot_warn!`, and everything else to `godot_print!`. Only records from
// the bridge's own crates are printed.
//
// Records may come from the platform callback thread. Godot's print
// functions are safe to call from any thread.

use godot::prelude::*;
use log::{Level, LevelFilter, Log, Metadata, Record};

const TARGET_PREFIX: &str = "native_bridge";

struct GodotLog;

static LOGGER: GodotLog = GodotLog;

impl Log for GodotLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.target().starts_with(TARGET_PREFIX)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => godot_error!("{}", record.args()),
            Level::Warn => godot_warn!("{}", record.args()),
            _ => godot_print!("{}", record.args()),
        }
    }

    fn flush(&self) {}
}

/// Install the Godot sink (once per process) and set the level filter.
pub fn install(level: LevelFilter) {
    // A second install after an editor reload finds the logger already set;
    // only the level needs updating then.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
