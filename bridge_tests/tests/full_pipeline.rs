// End-to-end tests of the dispatch-and-correlate protocol.
//
// Each scenario runs a `TestHost` (real dispatcher, installed as the active
// bridge) either on the local route or against a `FakePlatform` answering
// through the exported C entry point from background threads. The same
// request must produce the same response on both routes.

use std::collections::BTreeMap;

use bridge_tests::{FakePlatform, TestHost};
use native_bridge_protocol::{BridgeResponse, Payload};
use serde_json::{Value, json};

fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => panic!("test payload must be an object"),
    }
}

fn nested_payload() -> Payload {
    payload(json!({
        "x": 1,
        "y": "hi",
        "flag": false,
        "ratio": 0.25,
        "nothing": null,
        "list": [1, "two", [3.5], {"four": 4}],
        "inner": {"deeper": {"deepest": [true, false]}},
    }))
}

#[test]
fn local_echo_scenario() {
    let mut host = TestHost::local();
    host.call("echo", payload(json!({"x": 1, "y": "hi"})), "tag-42");

    assert_eq!(
        host.responses(),
        vec![BridgeResponse::new("echo", payload(json!({"x": 1, "y": "hi"})), "tag-42")]
    );
}

#[test]
fn local_unknown_action_scenario() {
    let mut host = TestHost::local();
    host.call("frobnicate", Payload::new(), "tag-7");

    assert_eq!(
        host.responses(),
        vec![BridgeResponse::new(
            "frobnicate",
            payload(json!({"error": "unknown_action", "message": "Unknown action: frobnicate"})),
            "tag-7",
        )]
    );
}

#[test]
fn remote_echo_matches_local_echo() {
    let mut local = TestHost::local();
    local.call("echo", nested_payload(), "tag-1");
    let local_responses = local.responses();
    drop(local);

    let platform = FakePlatform::default();
    let mut remote = TestHost::with_platform(&platform);
    remote.call("echo", nested_payload(), "tag-1");

    // Nothing until the platform answers and the host pumps.
    assert!(remote.responses().is_empty());
    assert_eq!(platform.pending_count(), 1);

    platform.answer_all_reversed();
    assert_eq!(remote.wait_for_responses(1), local_responses);
}

#[test]
fn remote_unknown_action_matches_local() {
    let platform = FakePlatform::default();
    let mut host = TestHost::with_platform(&platform);
    host.call("frobnicate", Payload::new(), "tag-7");
    platform.answer_all_reversed();

    let responses = host.wait_for_responses(1);
    assert_eq!(responses[0].payload["error"], "unknown_action");
    assert_eq!(responses[0].payload["message"], "Unknown action: frobnicate");
    assert_eq!(responses[0].tag, "tag-7");
}

#[test]
fn tags_survive_reordering() {
    let platform = FakePlatform::default();
    let mut host = TestHost::with_platform(&platform);
    for i in 0..8 {
        host.call("echo", payload(json!({"n": i})), &format!("tag-{i}"));
    }
    platform.answer_all_reversed();

    let responses = host.wait_for_responses(8);
    let tags: Vec<_> = responses.iter().map(|r| r.tag.as_str()).collect();
    assert_eq!(tags.first(), Some(&"tag-7"));
    assert_eq!(tags.last(), Some(&"tag-0"));
    for response in &responses {
        let n = response.payload["n"].as_i64().unwrap();
        assert_eq!(response.tag, format!("tag-{n}"));
    }
}

#[test]
fn tags_survive_concurrent_answers() {
    let platform = FakePlatform::default();
    let mut host = TestHost::with_platform(&platform);
    for i in 0..32 {
        host.call("echo", payload(json!({"n": i})), &format!("tag-{i}"));
    }
    platform.answer_all_concurrently();

    let responses = host.wait_for_responses(32);
    let by_tag: BTreeMap<_, _> = responses
        .iter()
        .map(|r| (r.tag.clone(), r.payload["n"].as_i64().unwrap()))
        .collect();
    assert_eq!(by_tag.len(), 32);
    for (tag, n) in by_tag {
        assert_eq!(tag, format!("tag-{n}"));
    }
}

#[test]
fn interleaved_local_calls_keep_their_tags() {
    let mut host = TestHost::local();
    host.call("echo", payload(json!({"who": "a"})), "A");
    host.call("echo", payload(json!({"who": "b"})), "B");
    host.call("echo", payload(json!({"who": "a2"})), "A");

    let responses = host.responses();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].tag, "A");
    assert_eq!(responses[1].tag, "B");
    assert_eq!(responses[1].payload["who"], "b");
    assert_eq!(responses[2].payload["who"], "a2");
}

#[test]
fn malformed_platform_payload_arrives_empty() {
    let platform = FakePlatform::default();
    let mut host = TestHost::with_platform(&platform);
    platform.send_raw("echo", "{\"unterminated\": ", "tag-bad");

    let responses = host.wait_for_responses(1);
    assert_eq!(responses, vec![BridgeResponse::new("echo", Payload::new(), "tag-bad")]);
}

#[test]
fn non_object_platform_payload_arrives_empty() {
    let platform = FakePlatform::default();
    let mut host = TestHost::with_platform(&platform);
    platform.send_raw("echo", "[1, 2, 3]", "tag-array");

    assert!(host.wait_for_responses(1)[0].payload.is_empty());
}

#[test]
fn platform_answer_after_teardown_is_dropped() {
    let platform = FakePlatform::default();
    let mut host = TestHost::with_platform(&platform);
    host.call("echo", payload(json!({"x": 1})), "tag-late");
    host.teardown();

    platform.answer_all_reversed();
    assert_eq!(host.dispatcher.pump(), 0);
    assert!(host.responses().is_empty());
}

#[test]
fn duplicate_platform_answers_are_all_delivered() {
    // A misbehaving platform may answer twice. Nothing deduplicates.
    let platform = FakePlatform::default();
    let mut host = TestHost::with_platform(&platform);
    platform.send_raw("echo", "{}", "tag-dup");
    platform.send_raw("echo", "{}", "tag-dup");

    let responses = host.wait_for_responses(2);
    assert!(responses.iter().all(|r| r.tag == "tag-dup"));
}

#[test]
fn registered_handler_works_end_to_end() {
    let mut host = TestHost::local();
    host.dispatcher.handlers_mut().register("sum", |_: &str, p: Payload| {
        let total: i64 = p.values().filter_map(Value::as_i64).sum();
        payload(json!({"total": total}))
    });
    host.call("sum", payload(json!({"a": 2, "b": 40, "c": "skip"})), "tag-sum");

    assert_eq!(host.responses()[0].payload["total"], 42);
}
