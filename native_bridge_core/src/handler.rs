// Action handlers and the table that routes to them.
//
// A handler turns a request payload into a response payload. Routing is an
// exact, case-sensitive lookup of the action name in `HandlerTable`; names
// with no entry go to the table's fallback handler, which by default
// produces the `unknown_action` error payload. An unknown action is an
// ordinary outcome, not a failure, so there is no error path here at all.
//
// Adding an action means registering another entry. Nothing else in the
// dispatcher changes.

use std::collections::BTreeMap;

use native_bridge_protocol::payload::{Payload, unknown_action_payload};

/// Name of the built-in echo action.
pub const ECHO: &str = "echo";

/// Produces a response payload for one action request.
pub trait ActionHandler {
    fn handle(&self, action: &str, payload: Payload) -> Payload;
}

impl<F> ActionHandler for F
where
    F: Fn(&str, Payload) -> Payload,
{
    fn handle(&self, action: &str, payload: Payload) -> Payload {
        self(action, payload)
    }
}

/// Returns the input payload unchanged.
pub fn echo(_action: &str, payload: Payload) -> Payload {
    payload
}

/// Ignores the input and reports the action as unknown.
pub fn unknown_action(action: &str, _payload: Payload) -> Payload {
    unknown_action_payload(action)
}

/// Mapping from action name to handler, plus a fallback for everything else.
pub struct HandlerTable {
    handlers: BTreeMap<String, Box<dyn ActionHandler>>,
    fallback: Box<dyn ActionHandler>,
}

impl HandlerTable {
    /// A table with no actions. Every request hits the fallback.
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
            fallback: Box::new(unknown_action),
        }
    }

    /// The standard table: `echo`, with unknown actions reported as errors.
    pub fn with_builtins() -> Self {
        let mut table = Self::empty();
        table.register(ECHO, echo);
        table
    }

    /// Add a handler for `action`, returning the one it replaced.
    pub fn register(
        &mut self,
        action: impl Into<String>,
        handler: impl ActionHandler + 'static,
    ) -> Option<Box<dyn ActionHandler>> {
        self.handlers.insert(action.into(), Box::new(handler))
    }

    pub fn unregister(&mut self, action: &str) -> Option<Box<dyn ActionHandler>> {
        self.handlers.remove(action)
    }

    /// Replace the handler used for actions with no entry.
    pub fn set_fallback(&mut self, handler: impl ActionHandler + 'static) {
        self.fallback = Box::new(handler);
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Registered action names in sorted order.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Run the handler registered for `action`, or the fallback.
    pub fn dispatch(&self, action: &str, payload: Payload) -> Payload {
        match self.handlers.get(action) {
            Some(handler) => handler.handle(action, payload),
            None => self.fallback.handle(action, payload),
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use native_bridge_protocol::payload::error_code;
    use serde_json::{Value, json};

    use super::*;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn echo_returns_payload_unchanged() {
        let table = HandlerTable::with_builtins();
        let input = payload(json!({"x": 1, "nested": {"list": [true, null, "s"]}}));
        assert_eq!(table.dispatch("echo", input.clone()), input);
    }

    #[test]
    fn unknown_action_uses_fallback() {
        let table = HandlerTable::with_builtins();
        let out = table.dispatch("frobnicate", payload(json!({"ignored": 1})));
        assert_eq!(
            Value::Object(out),
            json!({"error": "unknown_action", "message": "Unknown action: frobnicate"})
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        let table = HandlerTable::with_builtins();
        let out = table.dispatch("Echo", Payload::new());
        assert_eq!(error_code(&out), Some("unknown_action"));
    }

    #[test]
    fn empty_action_is_unknown() {
        let table = HandlerTable::with_builtins();
        let out = table.dispatch("", Payload::new());
        assert_eq!(out["message"], "Unknown action: ");
    }

    #[test]
    fn registered_handler_is_routed_to() {
        let mut table = HandlerTable::with_builtins();
        table.register("count_keys", |_: &str, p: Payload| {
            payload(json!({"count": p.len()}))
        });
        let out = table.dispatch("count_keys", payload(json!({"a": 1, "b": 2})));
        assert_eq!(out["count"], 2);
        assert_eq!(table.actions().collect::<Vec<_>>(), ["count_keys", "echo"]);
    }

    #[test]
    fn register_replaces_and_unregister_removes() {
        let mut table = HandlerTable::with_builtins();
        let replaced = table.register("echo", |_: &str, _: Payload| Payload::new());
        assert!(replaced.is_some());
        assert!(table.dispatch("echo", payload(json!({"x": 1}))).is_empty());

        assert!(table.unregister("echo").is_some());
        assert!(!table.contains("echo"));
        assert_eq!(error_code(&table.dispatch("echo", Payload::new())), Some("unknown_action"));
    }

    #[test]
    fn custom_fallback() {
        let mut table = HandlerTable::empty();
        table.set_fallback(|action: &str, _: Payload| payload(json!({"seen": action})));
        assert_eq!(table.dispatch("anything", Payload::new())["seen"], "anything");
        assert_eq!(table.actions().count(), 0);
    }
}
