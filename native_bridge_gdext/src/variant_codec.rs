// Conversion between Godot variants and bridge payloads.
//
// Scripts hand the bridge a `Dictionary`, and the core works on `Payload`
// (a JSON object). The mapping is structural:
//
//   Nil ↔ null, bool ↔ bool, int ↔ integer, float ↔ float,
//   String / StringName → string, Array ↔ array, Dictionary ↔ object.
//
// Godot-side values JSON cannot express become their `str()` form. That
// covers vectors, colors, packed and typed arrays, and objects. Non-finite
// floats become null. Dictionary keys are stringified. Integers stay
// integers in both directions. JSON integers too large for `i64` come back
// as floats.
//
// Godot arrays and dictionaries are shared references, so a script can build
// one that contains itself. The walk tracks the containers on the current
// path: a container that is already on it, or one nested deeper than
// `MAX_PAYLOAD_DEPTH`, converts to null. The result therefore always fits the
// boundary codec.
//
// The walk is written against `HostValue` rather than `Variant` directly so
// it can be exercised without a running engine.

use godot::global::is_same;
use godot::prelude::*;
use native_bridge_protocol::codec::MAX_PAYLOAD_DEPTH;
use native_bridge_protocol::payload::Payload;
use serde_json::{Number, Value};

/// A host value as the converter sees it.
enum Node<V> {
    Leaf(Value),
    List(Vec<V>),
    Map(Vec<(String, V)>),
}

trait HostValue: Clone {
    fn node(&self) -> Node<Self>;

    /// True if both values are the same shared container.
    fn same_container(&self, other: &Self) -> bool;
}

impl HostValue for Variant {
    fn node(&self) -> Node<Self> {
        match self.get_type() {
            VariantType::NIL => Node::Leaf(Value::Null),
            VariantType::BOOL => Node::Leaf(Value::Bool(self.to::<bool>())),
            VariantType::INT => Node::Leaf(Value::from(self.to::<i64>())),
            VariantType::FLOAT => {
                Node::Leaf(Number::from_f64(self.to::<f64>()).map_or(Value::Null, Value::Number))
            }
            VariantType::DICTIONARY => match self.try_to::<VarDictionary>() {
                Ok(dict) => Node::Map(entries(&dict)),
                Err(_) => Node::Leaf(str_form(self)),
            },
            VariantType::ARRAY => match self.try_to::<VarArray>() {
                Ok(array) => Node::List(array.iter_shared().collect()),
                // Typed arrays don't convert to an untyped array.
                Err(_) => Node::Leaf(str_form(self)),
            },
            _ => Node::Leaf(str_form(self)),
        }
    }

    fn same_container(&self, other: &Self) -> bool {
        is_same(self, other)
    }
}

fn str_form(variant: &Variant) -> Value {
    Value::String(variant.stringify().to_string())
}

fn entries(dict: &VarDictionary) -> Vec<(String, Variant)> {
    dict.iter_shared()
        .map(|(key, value)| (key.stringify().to_string(), value))
        .collect()
}

pub fn dictionary_to_payload(dict: &VarDictionary) -> Payload {
    map_to_payload(&dict.to_variant(), entries(dict))
}

fn map_to_payload<V: HostValue>(root: &V, entries: Vec<(String, V)>) -> Payload {
    let mut path = vec![root.clone()];
    entries
        .into_iter()
        .map(|(key, value)| {
            let json = to_json(&value, &mut path);
            (key, json)
        })
        .collect()
}

/// `path` holds the containers enclosing `value`, outermost first.
fn to_json<V: HostValue>(value: &V, path: &mut Vec<V>) -> Value {
    let node = value.node();
    if let Node::Leaf(json) = node {
        return json;
    }
    if path.len() >= MAX_PAYLOAD_DEPTH {
        log::warn!("native bridge: dropping value nested deeper than {MAX_PAYLOAD_DEPTH} levels");
        return Value::Null;
    }
    if path.iter().any(|outer| outer.same_container(value)) {
        log::warn!("native bridge: dropping value that contains itself");
        return Value::Null;
    }

    path.push(value.clone());
    let json = match node {
        Node::List(items) => Value::Array(items.iter().map(|item| to_json(item, path)).collect()),
        Node::Map(entries) => Value::Object(
            entries
                .into_iter()
                .map(|(key, item)| {
                    let json = to_json(&item, path);
                    (key, json)
                })
                .collect(),
        ),
        Node::Leaf(json) => json,
    };
    path.pop();
    json
}

pub fn payload_to_dictionary(payload: &Payload) -> VarDictionary {
    let mut dict = VarDictionary::new();
    for (key, value) in payload {
        dict.set(key.as_str(), json_to_variant(value));
    }
    dict
}

fn json_to_variant(value: &Value) -> Variant {
    match value {
        Value::Null => Variant::nil(),
        Value::Bool(b) => b.to_variant(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_variant(),
            None => n.as_f64().map_or_else(Variant::nil, |f| f.to_variant()),
        },
        Value::String(s) => GString::from(s.as_str()).to_variant(),
        Value::Array(items) => {
            let mut array = VarArray::new();
            for item in items {
                array.push(&json_to_variant(item));
            }
            array.to_variant()
        }
        Value::Object(map) => payload_to_dictionary(map).to_variant(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use native_bridge_protocol::codec::{decode_payload, encode_payload};
    use serde_json::json;

    use super::*;

    /// Shared, mutable containers with the same aliasing rules as Godot's.
    #[derive(Clone)]
    enum Fake {
        Int(i64),
        List(Rc<RefCell<Vec<Fake>>>),
        Map(Rc<RefCell<Vec<(String, Fake)>>>),
    }

    impl Fake {
        fn map(entries: Vec<(&str, Fake)>) -> Self {
            let entries = entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
            Fake::Map(Rc::new(RefCell::new(entries)))
        }

        fn insert(&self, key: &str, value: Fake) {
            if let Fake::Map(entries) = self {
                entries.borrow_mut().push((key.to_string(), value));
            }
        }

        fn clear(&self) {
            match self {
                Fake::Map(entries) => entries.borrow_mut().clear(),
                Fake::List(items) => items.borrow_mut().clear(),
                Fake::Int(_) => {}
            }
        }

        fn to_payload(&self) -> Payload {
            match self {
                Fake::Map(entries) => map_to_payload(self, entries.borrow().clone()),
                _ => panic!("root must be a map"),
            }
        }
    }

    impl HostValue for Fake {
        fn node(&self) -> Node<Self> {
            match self {
                Fake::Int(i) => Node::Leaf(Value::from(*i)),
                Fake::List(items) => Node::List(items.borrow().clone()),
                Fake::Map(entries) => Node::Map(entries.borrow().clone()),
            }
        }

        fn same_container(&self, other: &Self) -> bool {
            match (self, other) {
                (Fake::List(a), Fake::List(b)) => Rc::ptr_eq(a, b),
                (Fake::Map(a), Fake::Map(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
        }
    }

    #[test]
    fn nested_containers_convert_structurally() {
        let inner = Fake::map(vec![("n", Fake::Int(2))]);
        let list = Fake::List(Rc::new(RefCell::new(vec![Fake::Int(1), inner])));
        let root = Fake::map(vec![("items", list)]);

        assert_eq!(Value::Object(root.to_payload()), json!({"items": [1, {"n": 2}]}));
    }

    #[test]
    fn self_referential_map_converts_without_recursing() {
        let root = Fake::map(vec![("a", Fake::Int(1))]);
        root.insert("self", root.clone());
        root.insert("again", root.clone());

        let payload = root.to_payload();
        root.clear();

        assert_eq!(Value::Object(payload), json!({"a": 1, "self": null, "again": null}));
    }

    #[test]
    fn cycle_through_a_list_is_cut() {
        let items = Rc::new(RefCell::new(Vec::new()));
        let list = Fake::List(items.clone());
        let root = Fake::map(vec![("list", list.clone())]);
        items.borrow_mut().push(root.clone());
        items.borrow_mut().push(list.clone());

        let payload = root.to_payload();
        list.clear();

        assert_eq!(Value::Object(payload), json!({"list": [null, null]}));
    }

    #[test]
    fn shared_acyclic_child_converts_each_time() {
        let shared = Fake::map(vec![("v", Fake::Int(7))]);
        let root = Fake::map(vec![("left", shared.clone()), ("right", shared)]);

        assert_eq!(
            Value::Object(root.to_payload()),
            json!({"left": {"v": 7}, "right": {"v": 7}})
        );
    }

    #[test]
    fn nesting_past_the_limit_is_cut_and_still_encodes() {
        let mut value = Fake::Int(1);
        for _ in 0..(MAX_PAYLOAD_DEPTH + 50) {
            value = Fake::map(vec![("k", value)]);
        }
        let root = Fake::map(vec![("k", value)]);

        let payload = root.to_payload();
        let text = encode_payload(&payload).unwrap();
        assert_eq!(decode_payload(&text).unwrap(), payload);

        let mut depth = 1;
        let mut cursor = &payload["k"];
        while let Value::Object(map) = cursor {
            depth += 1;
            cursor = &map["k"];
        }
        assert_eq!(depth, MAX_PAYLOAD_DEPTH);
        assert_eq!(*cursor, Value::Null);
    }
}
