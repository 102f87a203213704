// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn set_and_get() {
    let mut bag = AttrBag::new();
    bag.set("job-name", "report");
    bag.set("copies", 3i64);
    bag.set("job-is-canceled", false);

    assert_eq!(bag.get_text("job-name"), Some("report"));
    assert_eq!(bag.get_int("copies"), Some(3));
    assert_eq!(bag.get_bool("job-is-canceled"), Some(false));
    assert_eq!(bag.get("missing"), None);
}

#[test]
fn set_replaces_in_place() {
    let mut bag = AttrBag::new();
    bag.set("a", 1i64);
    bag.set("b", 2i64);
    bag.set("a", 10i64);

    let names: Vec<&str> = bag.iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(bag.get_int("a"), Some(10));
}

#[test]
fn insertion_order_preserved() {
    let mut bag = AttrBag::new();
    bag.set("z", 1i64);
    bag.set("a", 2i64);
    bag.set("m", 3i64);

    let names: Vec<&str> = bag.iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["z", "a", "m"]);
}

#[test]
fn apply_with_delete_sentinel() {
    let mut bag = AttrBag::new();
    bag.set("job-priority", 50i64);
    bag.set("job-hold-until", "indefinite");

    let mut patch = AttrBag::new();
    patch.set("job-priority", 75i64);
    patch.set("job-hold-until", DELETE_ATTR);
    bag.apply(&patch);

    assert_eq!(bag.get_int("job-priority"), Some(75));
    assert!(!bag.contains("job-hold-until"));
}

#[test]
fn remove_returns_value() {
    let mut bag = AttrBag::new();
    bag.set("title", "memo");
    assert_eq!(bag.remove("title"), Some(AttrValue::Text("memo".into())));
    assert_eq!(bag.remove("title"), None);
    assert!(bag.is_empty());
}

#[test]
fn group_tag_ordering() {
    assert!(GroupTag::Operation < GroupTag::Job);
    assert!(GroupTag::Job < GroupTag::Printer);
    assert!(GroupTag::Printer < GroupTag::Unsupported);
}

#[test]
fn serde_round_trip() {
    let bag = AttrBag::from([
        ("job-name", AttrValue::from("quarterly")),
        ("copies", AttrValue::from(2i64)),
    ]);
    let json = serde_json::to_string(&bag).unwrap();
    let parsed: AttrBag = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, bag);
}
