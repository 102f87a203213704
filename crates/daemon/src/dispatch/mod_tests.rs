// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::sched::test_support::*;
use crate::sched::Peer;
use pq_core::{AttrValue, GroupTag, JobState, StatusKind};
use pq_wire::{Operation, Request};

fn submit(h: &mut crate::sched::test_support::TestHarness, user: &str) -> u32 {
    let mut req = request(Operation::PrintJob, Some("/printers/Test"), user);
    req.groups[0].1.set("document-format", "application/postscript");
    let staged = h.stage_body(b"%!PS\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::Ok);
    response
        .group(GroupTag::Job)
        .and_then(|g| g.get_int("job-id"))
        .map(|id| id as u32)
        .unwrap()
}

#[test]
fn version_major_must_be_one() {
    let mut h = harness();
    h.add_printer("Test");
    let mut req = request(Operation::GetPrinters, None, "alice");
    req.version = (2, 0);
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::BadRequest);
}

#[test]
fn charset_and_language_required() {
    let mut h = harness();
    h.add_printer("Test");
    let req = Request::new(Operation::GetPrinters, 1);
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::BadRequest);
}

#[test]
fn group_order_enforced() {
    let mut h = harness();
    h.add_printer("Test");
    let mut req = Request::new(Operation::PrintJob, 1)
        .with_group(GroupTag::Job, pq_core::AttrBag::new())
        .with_group(GroupTag::Operation, op_group(Some("/printers/Test")));
    req.username = Some("alice".to_string());
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::BadRequest);
}

#[test]
fn uri_required_except_private_ops() {
    let mut h = harness();
    h.add_printer("Test");

    let req = request(Operation::CancelJob, None, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::BadRequest);

    let req = request(Operation::GetPrinters, None, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
}

#[test]
fn job_creating_ops_need_a_printer_uri() {
    let mut h = harness();
    h.add_printer("Test");

    // print-job addressed by job-uri has no destination to land on
    let mut group = op_group(None);
    group.set("job-uri", "/jobs/1");
    let mut req = Request::new(Operation::PrintJob, 1).with_group(GroupTag::Operation, group);
    req.username = Some("alice".to_string());
    let staged = h.stage_body(b"%!PS\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::BadRequest);

    let req = request(Operation::CreateJob, None, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::BadRequest);
}

#[test]
fn responses_echo_charset_and_language() {
    let mut h = harness();
    h.add_printer("Test");
    let req = request(Operation::GetPrinters, None, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    let op = response.group(GroupTag::Operation).unwrap();
    assert_eq!(op.get_text("attributes-charset"), Some("utf-8"));
    assert_eq!(op.get_text("attributes-natural-language"), Some("en"));
    assert_eq!(op.get_text("status-message"), Some("ok"));
}

#[test]
fn unknown_destination_not_found() {
    let mut h = harness();
    let req = request(Operation::PrintJob, Some("/printers/ghost"), "alice");
    let staged = h.stage_body(b"%!PS\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::NotFound);
}

#[test]
fn rejecting_destination_not_accepting() {
    let mut h = harness();
    h.add_printer("Test");
    h.sched
        .registry
        .with_dest("Test", |d| d.accepting = false)
        .unwrap();
    let req = request(Operation::PrintJob, Some("/printers/Test"), "alice");
    let staged = h.stage_body(b"%!PS\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::NotAccepting);
}

#[test]
fn unsupported_format_rejected() {
    let mut h = harness();
    h.add_printer("Test");
    let mut req = request(Operation::PrintJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("document-format", "video/mp4");
    let staged = h.stage_body(b"....");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::DocumentFormatNotSupported);
}

#[test]
fn owner_enforcement_on_cancel() {
    let mut h = harness();
    h.add_printer("Test");
    let job_id = submit(&mut h, "alice");

    // bob may not cancel alice's job
    let req = job_request(Operation::CancelJob, job_id, "bob");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Forbidden);
    assert_eq!(h.sched.jobs.get(job_id).unwrap().state, JobState::Pending);

    // root may
    let req = job_request(Operation::CancelJob, job_id, "root");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert_eq!(h.sched.jobs.get(job_id).unwrap().state, JobState::Cancelled);
}

#[test]
fn operator_group_may_cancel() {
    let mut h = harness();
    h.add_printer("Test");
    let job_id = submit(&mut h, "alice");
    let req = job_request(Operation::CancelJob, job_id, "op");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
}

#[test]
fn hold_and_release_flow() {
    let mut h = harness();
    h.add_printer("Test");

    let mut req = request(Operation::PrintJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    req.groups[0].1.set("job-hold-until", "indefinite");
    let staged = h.stage_body(b"%!PS\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::Ok);
    let job = response.group(GroupTag::Job).unwrap();
    assert_eq!(job.get_text("job-state"), Some("held"));
    assert_eq!(
        job.get("job-state-reasons"),
        Some(&AttrValue::List(vec!["job-hold-until-specified".to_string()]))
    );

    // Held jobs never admit
    h.sched.tick();
    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Held);

    let req = job_request(Operation::ReleaseJob, 1, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Pending);
}

#[test]
fn hold_job_operation() {
    let mut h = harness();
    h.add_printer("Test");
    let job_id = submit(&mut h, "alice");

    let mut req = job_request(Operation::HoldJob, job_id, "alice");
    req.groups[0].1.set("job-hold-until", "indefinite");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    let job = h.sched.jobs.get(job_id).unwrap();
    assert_eq!(job.state, JobState::Held);
    assert_eq!(job.hold_until, Some(u64::MAX));
}

#[test]
fn bad_hold_value_unsupported() {
    let mut h = harness();
    h.add_printer("Test");
    let job_id = submit(&mut h, "alice");
    let mut req = job_request(Operation::HoldJob, job_id, "alice");
    req.groups[0].1.set("job-hold-until", "sometime-later");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::AttributesNotSupported);
}

#[test]
fn get_job_attributes_matches_store() {
    let mut h = harness();
    h.add_printer("Test");
    let job_id = submit(&mut h, "alice");

    let req = job_request(Operation::GetJobAttributes, job_id, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    let job = response.group(GroupTag::Job).unwrap();
    assert_eq!(job.get_int("job-id"), Some(i64::from(job_id)));
    assert_eq!(job.get_text("job-originating-user-name"), Some("alice"));
    assert_eq!(job.get_text("job-state"), Some("pending"));

    let req = job_request(Operation::GetJobAttributes, 99, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::NotFound);
}

#[test]
fn get_jobs_filters() {
    let mut h = harness();
    h.add_printer("Test");
    let first = submit(&mut h, "alice");
    let _second = submit(&mut h, "bob");
    h.sched.cancel_job(first).unwrap();

    // Default: not-completed
    let req = request(Operation::GetJobs, Some("/printers/Test"), "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.groups_tagged(GroupTag::Job).count(), 1);

    // Completed
    let mut req = request(Operation::GetJobs, Some("/printers/Test"), "alice");
    req.groups[0].1.set("which-jobs", "completed");
    let response = h.sched.process_request(req, &Peer::local(), None);
    let ids: Vec<i64> = response
        .groups_tagged(GroupTag::Job)
        .filter_map(|g| g.get_int("job-id"))
        .collect();
    assert_eq!(ids, vec![i64::from(first)]);

    // my-jobs for bob
    let mut req = request(Operation::GetJobs, Some("/printers/Test"), "bob");
    req.groups[0].1.set("my-jobs", true);
    let response = h.sched.process_request(req, &Peer::local(), None);
    let users: Vec<&str> = response
        .groups_tagged(GroupTag::Job)
        .filter_map(|g| g.get_text("job-originating-user-name"))
        .collect();
    assert_eq!(users, vec!["bob"]);
}

#[test]
fn set_attributes_rules() {
    let mut h = harness();
    h.add_printer("Test");
    let job_id = submit(&mut h, "alice");

    // Priority change while pending is fine
    let mut req = job_request(Operation::SetJobAttributes, job_id, "alice");
    let mut group = pq_core::AttrBag::new();
    group.set("job-priority", 80i64);
    group.set("note", "rush order");
    req.groups.push((GroupTag::Job, group));
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    let job = h.sched.jobs.get(job_id).unwrap();
    assert_eq!(job.priority, 80);
    assert_eq!(job.attrs.get_text("note"), Some("rush order"));

    // Out-of-range priority is unsupported
    let mut req = job_request(Operation::SetJobAttributes, job_id, "alice");
    let mut group = pq_core::AttrBag::new();
    group.set("job-priority", 400i64);
    req.groups.push((GroupTag::Job, group));
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::AttributesNotSupported);

    // Delete sentinel removes an attribute
    let mut req = job_request(Operation::SetJobAttributes, job_id, "alice");
    let mut group = pq_core::AttrBag::new();
    group.set("note", pq_core::DELETE_ATTR);
    req.groups.push((GroupTag::Job, group));
    h.sched.process_request(req, &Peer::local(), None);
    assert!(!h.sched.jobs.get(job_id).unwrap().attrs.contains("note"));

    // Priority is immutable while processing
    h.sched.jobs.get_mut(job_id).unwrap().start(2_000, None).unwrap();
    let mut req = job_request(Operation::SetJobAttributes, job_id, "alice");
    let mut group = pq_core::AttrBag::new();
    group.set("job-priority", 90i64);
    req.groups.push((GroupTag::Job, group));
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::NotPossible);

    // Terminal jobs are immutable
    h.sched.jobs.get_mut(job_id).unwrap().cancel(3_000).unwrap();
    let req = job_request(Operation::SetJobAttributes, job_id, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::NotPossible);
}

#[test]
fn move_job_rebinds_destination() {
    let mut h = harness();
    h.add_printer("Test");
    h.add_printer("Other");
    let job_id = submit(&mut h, "alice");

    let mut req = job_request(Operation::MoveJob, job_id, "root");
    req.groups[0].1.set("job-printer-uri", "/printers/Other");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert_eq!(h.sched.jobs.get(job_id).unwrap().dest, "Other");

    // Unknown target
    let mut req = job_request(Operation::MoveJob, job_id, "root");
    req.groups[0].1.set("job-printer-uri", "/printers/ghost");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::NotFound);
}

#[test]
fn admin_ops_require_operator() {
    let mut h = harness();
    h.add_printer("Test");

    let req = request(Operation::PausePrinter, Some("/printers/Test"), "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Forbidden);

    let req = request(Operation::PausePrinter, Some("/printers/Test"), "op");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert_eq!(
        h.sched.registry.find("Test").unwrap().state,
        pq_core::PrinterState::Stopped
    );

    let req = request(Operation::ResumePrinter, Some("/printers/Test"), "op");
    h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(
        h.sched.registry.find("Test").unwrap().state,
        pq_core::PrinterState::Idle
    );
}

#[test]
fn reject_and_accept_jobs() {
    let mut h = harness();
    h.add_printer("Test");

    let req = request(Operation::RejectJobs, Some("/printers/Test"), "op");
    h.sched.process_request(req, &Peer::local(), None);
    assert!(!h.sched.registry.find("Test").unwrap().accepting);

    let req = request(Operation::AcceptJobs, Some("/printers/Test"), "op");
    h.sched.process_request(req, &Peer::local(), None);
    assert!(h.sched.registry.find("Test").unwrap().accepting);
}

#[test]
fn add_and_delete_printer() {
    let mut h = harness();

    let mut req = request(Operation::AddPrinter, Some("/printers/newp"), "op");
    req.groups[0].1.set("device-uri", "file:///tmp/newp");
    req.groups[0].1.set("printer-info", "fresh");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    let dest = h.sched.registry.find("newp").unwrap();
    assert_eq!(dest.info, "fresh");
    assert_eq!(dest.device_uri.as_deref(), Some("file:///tmp/newp"));

    let req = request(Operation::DeletePrinter, Some("/printers/newp"), "op");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert!(h.sched.registry.find("newp").is_none());
}

#[test]
fn delete_printer_cancels_its_jobs() {
    let mut h = harness();
    h.add_printer("Test");
    let job_id = submit(&mut h, "alice");

    let req = request(Operation::DeletePrinter, Some("/printers/Test"), "op");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert_eq!(h.sched.jobs.get(job_id).unwrap().state, JobState::Cancelled);
}

#[test]
fn add_class_with_members() {
    let mut h = harness();
    h.add_printer("A");
    h.add_printer("B");

    let mut req = request(Operation::AddClass, Some("/classes/C"), "op");
    req.groups[0].1.set(
        "member-uris",
        AttrValue::List(vec!["/printers/A".to_string(), "/printers/B".to_string()]),
    );
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert_eq!(h.sched.registry.find("C").unwrap().members, vec!["A", "B"]);

    // Unknown member fails with not-found
    let mut req = request(Operation::AddClass, Some("/classes/D"), "op");
    req.groups[0].1.set(
        "member-uris",
        AttrValue::List(vec!["/printers/ghost".to_string()]),
    );
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::NotFound);
}

#[test]
fn set_default_and_get_default() {
    let mut h = harness();
    h.add_printer("Test");

    let req = request(Operation::GetDefault, None, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::NotFound);

    let req = request(Operation::SetDefault, Some("/printers/Test"), "op");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);

    let req = request(Operation::GetDefault, None, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    let printer = response.group(GroupTag::Printer).unwrap();
    assert_eq!(printer.get_text("printer-name"), Some("Test"));
}

#[test]
fn printer_attributes_consistent_with_lookup() {
    let mut h = harness();
    h.add_printer("Test");

    let req = request(Operation::GetPrinterAttributes, Some("/printers/Test"), "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    let attrs = response.group(GroupTag::Printer).unwrap();
    assert_eq!(attrs.get_text("printer-name"), Some("Test"));
    assert_eq!(
        attrs.get_text("printer-uri-supported"),
        Some("/printers/Test")
    );
    assert_eq!(attrs, &h.sched.registry.find("Test").unwrap().attr_cache);
}

#[test]
fn get_printers_and_classes_split() {
    let mut h = harness();
    h.add_printer("A");
    h.add_printer("B");
    h.sched
        .registry
        .add_class("C", &["A".to_string()], &crate::registry::DestSettings::default())
        .unwrap();

    let req = request(Operation::GetPrinters, None, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    let names: Vec<&str> = response
        .groups_tagged(GroupTag::Printer)
        .filter_map(|g| g.get_text("printer-name"))
        .collect();
    assert_eq!(names, vec!["A", "B"]);

    let req = request(Operation::GetClasses, None, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    let names: Vec<&str> = response
        .groups_tagged(GroupTag::Printer)
        .filter_map(|g| g.get_text("printer-name"))
        .collect();
    assert_eq!(names, vec!["C"]);
}

#[test]
fn purge_jobs_clears_history() {
    let mut h = harness();
    h.add_printer("Test");
    submit(&mut h, "alice");
    submit(&mut h, "bob");

    let req = request(Operation::PurgeJobs, Some("/printers/Test"), "op");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert!(h.sched.jobs.is_empty());
}

#[test]
fn validate_job_checks_without_side_effects() {
    let mut h = harness();
    h.add_printer("Test");

    let mut req = request(Operation::ValidateJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert!(h.sched.jobs.is_empty());

    let mut req = request(Operation::ValidateJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("document-format", "video/mp4");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::DocumentFormatNotSupported);
}

#[test]
fn create_job_then_send_documents() {
    let mut h = harness();
    h.add_printer("Test");

    let req = request(Operation::CreateJob, Some("/printers/Test"), "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert!(!h.sched.jobs.get(1).unwrap().released);

    // First document
    let mut req = job_request(Operation::SendDocument, 1, "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    let staged = h.stage_body(b"%!PS page 1\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::Ok);
    assert_eq!(h.sched.jobs.get(1).unwrap().files.len(), 1);
    assert!(!h.sched.jobs.get(1).unwrap().released);

    // Second and last document
    let mut req = job_request(Operation::SendDocument, 1, "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    req.groups[0].1.set("last-document", true);
    let staged = h.stage_body(b"%!PS page 2\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::Ok);
    let job = h.sched.jobs.get(1).unwrap();
    assert!(job.released);
    assert_eq!(job.files.len(), 2);

    // Further documents are refused
    let mut req = job_request(Operation::SendDocument, 1, "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    let staged = h.stage_body(b"late\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::NotPossible);
}

#[test]
fn banners_join_the_file_list() {
    let mut h = harness();
    std::fs::write(
        h.sched.config.banner_dir.join("standard.txt"),
        "*** {job-name} for {user} ***\n",
    )
    .unwrap();
    h.sched.banners = crate::banner::BannerIndex::load(&h.sched.config.banner_dir);
    h.add_printer("Test");

    let mut req = request(Operation::PrintJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    req.groups[0].1.set("job-name", "report");
    req.groups[0].1.set(
        "job-sheets",
        AttrValue::List(vec!["standard".to_string(), "standard".to_string()]),
    );
    let staged = h.stage_body(b"%!PS\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::Ok);

    let job = h.sched.jobs.get(1).unwrap();
    // Start banner, document, end banner
    assert_eq!(job.files.len(), 3);
    assert_eq!(job.files[0].mime_type, "text/plain");
    let banner_text = std::fs::read_to_string(&job.files[0].path).unwrap();
    assert_eq!(banner_text, "*** report for alice ***\n");
    assert_eq!(job.files[1].mime_type, "application/postscript");
}

#[test]
fn restart_needs_spool_files() {
    let mut h = harness();
    h.add_printer("Test");
    let job_id = submit(&mut h, "alice");
    {
        let job = h.sched.jobs.get_mut(job_id).unwrap();
        job.start(2_000, None).unwrap();
        job.complete(3_000).unwrap();
    }

    // Files still on disk: restart works
    let req = job_request(Operation::RestartJob, job_id, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::Ok);
    assert_eq!(h.sched.jobs.get(job_id).unwrap().state, JobState::Pending);

    // Remove the files: restart refused
    {
        let job = h.sched.jobs.get_mut(job_id).unwrap();
        job.start(4_000, None).unwrap();
        job.complete(5_000).unwrap();
        crate::jobs::unlink_files(job);
    }
    let req = job_request(Operation::RestartJob, job_id, "alice");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert_eq!(response.status, StatusKind::NotPossible);
}

#[test]
fn per_user_cap_enforced_at_submission() {
    let mut h = harness();
    h.add_printer("Test");
    h.sched.config.max_jobs_per_user = 1;

    submit(&mut h, "alice");
    let mut req = request(Operation::PrintJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    let staged = h.stage_body(b"%!PS\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert_eq!(response.status, StatusKind::NotPossible);

    // Other users are unaffected
    submit(&mut h, "bob");
}
