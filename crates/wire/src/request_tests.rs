// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pq_core::AttrValue;

fn op_group() -> AttrBag {
    AttrBag::from([
        ("attributes-charset", AttrValue::from("utf-8")),
        ("attributes-natural-language", AttrValue::from("en")),
        ("printer-uri", AttrValue::from("/printers/office")),
    ])
}

#[test]
fn required_attribute_accessors() {
    let req = Request::new(Operation::PrintJob, 7).with_group(GroupTag::Operation, op_group());

    assert_eq!(req.charset(), Some("utf-8"));
    assert_eq!(req.natural_language(), Some("en"));
    assert_eq!(req.printer_uri(), Some("/printers/office"));
    assert_eq!(req.job_uri(), None);
}

#[test]
fn attr_searches_groups_in_order() {
    let mut job_group = AttrBag::new();
    job_group.set("job-priority", 80i64);
    let req = Request::new(Operation::CreateJob, 1)
        .with_group(GroupTag::Operation, op_group())
        .with_group(GroupTag::Job, job_group);

    assert_eq!(req.attr_int("job-priority"), Some(80));
    assert_eq!(req.attr_text("printer-uri"), Some("/printers/office"));
    assert!(req.attr("nonexistent").is_none());
}

#[test]
fn group_order_validation() {
    let ordered = Request::new(Operation::CreateJob, 1)
        .with_group(GroupTag::Operation, AttrBag::new())
        .with_group(GroupTag::Job, AttrBag::new())
        .with_group(GroupTag::Job, AttrBag::new());
    assert!(ordered.groups_ordered());

    let unordered = Request::new(Operation::CreateJob, 1)
        .with_group(GroupTag::Job, AttrBag::new())
        .with_group(GroupTag::Operation, AttrBag::new());
    assert!(!unordered.groups_ordered());
}

#[test]
fn job_id_from_attribute() {
    let mut group = op_group();
    group.set("job-id", 42i64);
    let req = Request::new(Operation::CancelJob, 1).with_group(GroupTag::Operation, group);
    assert_eq!(req.job_id(), Some(42));
}

#[test]
fn job_id_from_uri() {
    let group = AttrBag::from([
        ("attributes-charset", AttrValue::from("utf-8")),
        ("job-uri", AttrValue::from("/jobs/17")),
    ]);
    let req = Request::new(Operation::CancelJob, 1).with_group(GroupTag::Operation, group);
    assert_eq!(req.job_id(), Some(17));
}

#[test]
fn negative_job_id_rejected() {
    let mut group = op_group();
    group.set("job-id", -3i64);
    let req = Request::new(Operation::CancelJob, 1).with_group(GroupTag::Operation, group);
    assert_eq!(req.job_id(), None);
}

#[test]
fn serde_round_trip() {
    let mut req = Request::new(Operation::PrintJob, 9).with_group(GroupTag::Operation, op_group());
    req.body_len = 512;
    req.username = Some("alice".to_string());

    let json = serde_json::to_string(&req).unwrap();
    let parsed: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, req);
}
