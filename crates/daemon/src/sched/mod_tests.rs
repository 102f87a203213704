// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::test_support::*;
use super::*;
use crate::mime::FilterTable;
use crate::persist::DirtyKind;
use pq_core::{GroupTag, JobState, PrinterState};
use pq_wire::Operation;
use std::time::Duration;

fn ps_harness() -> TestHarness {
    // Identity chains only: postscript printers accept postscript
    harness_with(FilterTable::new())
}

#[tokio::test]
async fn submit_and_complete() {
    let mut h = ps_harness();
    let out = h.add_printer("Test");
    h.install_file_backend();

    let mut req = request(Operation::PrintJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    let staged = h.stage_body(b"%!PS\nhello\n");

    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert!(response.status.is_ok());
    let job = response.group(GroupTag::Job).unwrap();
    assert_eq!(job.get_int("job-id"), Some(1));
    assert_eq!(job.get_text("job-state"), Some("pending"));

    h.sched.tick();
    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Processing);
    assert_eq!(
        h.sched.registry.find("Test").unwrap().state,
        PrinterState::Processing
    );

    h.pump().await;
    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Completed);
    assert_eq!(h.sched.registry.find("Test").unwrap().state, PrinterState::Idle);
    assert_eq!(std::fs::read(&out).unwrap(), b"%!PS\nhello\n");
}

#[tokio::test]
async fn cancel_processing_job_reaps_children() {
    let mut h = ps_harness();
    h.sched
        .registry
        .add_printer(
            "slowp",
            &crate::registry::DestSettings {
                device_uri: Some("hold://dev".to_string()),
                native_type: Some("application/postscript".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    h.install_backend("hold", "#!/bin/sh\nsleep 30\n");

    let mut req = request(Operation::PrintJob, Some("/printers/slowp"), "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    let staged = h.stage_body(b"%!PS\n");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert!(response.status.is_ok());

    h.sched.tick();
    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Processing);
    assert_eq!(h.sched.pipelines.len(), 1);

    h.sched.cancel_job(1).unwrap();
    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Cancelled);

    h.pump().await;
    assert!(h.sched.pipelines.is_empty());
    assert!(h.sched.procs.is_empty());
    assert_eq!(h.sched.registry.find("slowp").unwrap().state, PrinterState::Idle);
}

#[tokio::test]
async fn class_jobs_spread_across_members() {
    let mut h = ps_harness();
    for name in ["A", "B"] {
        h.sched
            .registry
            .add_printer(
                name,
                &crate::registry::DestSettings {
                    device_uri: Some(format!("hold://{name}")),
                    native_type: Some("application/postscript".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
    }
    h.sched
        .registry
        .add_class(
            "C",
            &["A".to_string(), "B".to_string()],
            &crate::registry::DestSettings::default(),
        )
        .unwrap();
    h.install_backend("hold", "#!/bin/sh\nsleep 30\n");

    for _ in 0..2 {
        let mut req = request(Operation::PrintJob, Some("/classes/C"), "alice");
        req.groups[0].1.set("document-format", "application/postscript");
        let staged = h.stage_body(b"%!PS\n");
        let response = h.sched.process_request(req, &Peer::local(), Some(staged));
        assert!(response.status.is_ok());
    }
    h.sched.tick();

    let assigned: Vec<String> = h
        .sched
        .jobs
        .processing()
        .filter_map(|j| j.assigned_to.clone())
        .collect();
    assert_eq!(assigned.len(), 2);
    assert!(assigned.contains(&"A".to_string()));
    assert!(assigned.contains(&"B".to_string()));

    // A third job has nowhere to run while both members are busy
    let mut req = request(Operation::PrintJob, Some("/classes/C"), "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    let staged = h.stage_body(b"%!PS\n");
    h.sched.process_request(req, &Peer::local(), Some(staged));
    h.sched.tick();
    assert_eq!(h.sched.jobs.get(3).unwrap().state, JobState::Pending);

    for id in [1, 2, 3] {
        let _ = h.sched.cancel_job(id);
    }
    h.pump().await;
}

#[tokio::test]
async fn backend_failure_stops_printer_and_job() {
    let mut h = ps_harness();
    h.sched
        .registry
        .add_printer(
            "flaky",
            &crate::registry::DestSettings {
                device_uri: Some("bad://dev".to_string()),
                native_type: Some("application/postscript".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    h.install_backend("bad", "#!/bin/sh\nexit 1\n");

    let mut req = request(Operation::PrintJob, Some("/printers/flaky"), "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    let staged = h.stage_body(b"%!PS\n");
    h.sched.process_request(req, &Peer::local(), Some(staged));
    h.sched.tick();
    h.pump().await;

    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Stopped);
    let printer = h.sched.registry.find("flaky").unwrap();
    assert_eq!(printer.state, PrinterState::Stopped);
    assert!(printer.state_message.contains("backend failed"));
}

#[tokio::test]
async fn filter_chain_over_limit_defers() {
    let mut table = FilterTable::new();
    table.register("text/plain", "application/postscript", "/bin/cat", 500);
    let mut h = harness_with(table);
    h.add_printer("Test");
    h.install_file_backend();
    h.sched.config.filter_limit = 100;

    let mut req = request(Operation::PrintJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("document-format", "text/plain");
    let staged = h.stage_body(b"plain text");
    let response = h.sched.process_request(req, &Peer::local(), Some(staged));
    assert!(response.status.is_ok());

    h.sched.tick();
    // Deferred, not started and not failed
    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Pending);
    assert!(h.sched.pipelines.is_empty());
}

#[tokio::test]
async fn status_lines_update_job_and_printer() {
    let mut h = ps_harness();
    let _out = h.add_printer("Test");
    h.install_backend(
        "file",
        "#!/bin/sh\n\
         echo 'PAGE: 1 2' >&2\n\
         echo 'STATE: +media-low' >&2\n\
         echo 'ATTR: printer-info=\"status test\"' >&2\n\
         cat > /dev/null\n",
    );

    let mut req = request(Operation::PrintJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("document-format", "application/postscript");
    let staged = h.stage_body(b"%!PS\n");
    h.sched.process_request(req, &Peer::local(), Some(staged));
    h.sched.tick();
    h.pump().await;

    let job = h.sched.jobs.get(1).unwrap();
    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.sheets_completed, 2);
    let printer = h.sched.registry.find("Test").unwrap();
    assert!(printer.state_reasons.contains(&"media-low".to_string()));
    assert_eq!(printer.info, "status test");
}

#[test]
fn next_wakeup_prefers_earliest_deadline() {
    let mut h = ps_harness();
    h.clock.set_epoch_secs(10_000);

    // Nothing to do: a day
    assert_eq!(h.sched.next_wakeup(), Duration::from_secs(86_400));

    // Dirty state flushes after the clean interval (30s default)
    h.sched.dirty.mark(DirtyKind::Printers, 10_000);
    assert_eq!(h.sched.next_wakeup(), Duration::from_secs(31));

    // A held job releasing sooner wins
    h.add_printer("Test");
    let mut req = request(Operation::CreateJob, Some("/printers/Test"), "alice");
    req.groups[0].1.set("job-priority", 50i64);
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert!(response.status.is_ok());
    h.sched.jobs.get_mut(1).unwrap().hold(10_005).unwrap();
    assert_eq!(h.sched.next_wakeup(), Duration::from_secs(6));

    // Pending released work bounds the timeout at 10s
    h.sched.jobs.get_mut(1).unwrap().release().unwrap();
    h.sched.jobs.get_mut(1).unwrap().released = true;
    let wakeup = h.sched.next_wakeup();
    assert!(wakeup <= Duration::from_secs(11));
}

#[test]
fn next_wakeup_clamps_to_one_second() {
    let mut h = ps_harness();
    h.clock.set_epoch_secs(10_000);
    h.sched.dirty.mark(DirtyKind::Jobs, 9_000);
    assert_eq!(h.sched.next_wakeup(), Duration::from_secs(1));
}

#[test]
fn held_jobs_release_on_tick() {
    let mut h = ps_harness();
    h.clock.set_epoch_secs(10_000);
    h.add_printer("Test");

    let req = request(Operation::CreateJob, Some("/printers/Test"), "alice");
    h.sched.process_request(req, &Peer::local(), None);
    h.sched.jobs.get_mut(1).unwrap().hold(10_030).unwrap();

    h.sched.tick();
    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Held);

    h.clock.advance(Duration::from_secs(30));
    h.sched.tick();
    assert_eq!(h.sched.jobs.get(1).unwrap().state, JobState::Pending);
}

#[test]
fn retention_purges_terminal_jobs() {
    let mut h = ps_harness();
    h.clock.set_epoch_secs(10_000);
    h.add_printer("Test");

    let req = request(Operation::CreateJob, Some("/printers/Test"), "alice");
    h.sched.process_request(req, &Peer::local(), None);
    {
        let job = h.sched.jobs.get_mut(1).unwrap();
        job.released = true;
        job.start(10_000, None).unwrap();
        job.complete(10_001).unwrap();
    }

    h.sched.tick();
    assert!(h.sched.jobs.get(1).is_some());

    h.clock.advance(Duration::from_secs(h.sched.config.job_retention.as_secs() + 2));
    h.sched.tick();
    assert!(h.sched.jobs.get(1).is_none());
}

#[test]
fn access_control_refuses_before_dispatch() {
    let mut h = ps_harness();
    h.add_printer("Test");
    // Replace the open rule with a deny-everything-but-10/8 rule
    let mut rule = crate::access::LocationRule::new("/");
    rule.order = crate::access::Order::AllowDeny;
    rule.allow = vec!["10.0.0.0/8".parse().unwrap()];
    h.sched.access = crate::access::AccessControl::new(vec![rule], Vec::new());

    let req = request(Operation::GetPrinters, None, "alice");
    let peer = Peer {
        ip: "192.0.2.1".parse().unwrap(),
        hostname: "evil.example.com".to_string(),
        secure: false,
    };
    let response = h.sched.process_request(req, &peer, None);
    assert_eq!(response.status, pq_core::StatusKind::Forbidden);
}

#[test]
fn browse_packets_feed_registry() {
    let mut h = ps_harness();
    struct Silent;
    impl crate::browse::BrowseTransport for Silent {
        fn send(&self, _packet: &str) {}
    }
    h.sched.browser = Some(crate::browse::Browser::new(Box::new(Silent), 30, 300, 0));

    h.sched.handle_event(SchedEvent::BrowsePacket {
        host: "peer.example.com".to_string(),
        line: "printer idle accepting ipp://peer.example.com/printers/lab \"\" \"\" \"\"".to_string(),
    });
    assert!(h.sched.registry.find("lab").is_some());
}

#[test]
fn reload_waits_for_active_jobs() {
    let mut h = ps_harness();
    h.clock.set_epoch_secs(10_000);

    // Persisted through the reload via the dirty flush
    let mut req = request(Operation::AddPrinter, Some("/printers/Keep"), "op");
    req.groups[0].1.set("device-uri", "file:///tmp/x");
    let response = h.sched.process_request(req, &Peer::local(), None);
    assert!(response.status.is_ok());

    let job = h.sched.jobs.create("alice", "Keep", pq_core::DestKind::LocalPrinter, 10_000);
    job.released = true;
    h.sched.jobs.get_mut(1).unwrap().start(10_000, None).unwrap();

    let drain = h.sched.drain_rx();
    h.sched.begin_reload();
    assert!(*drain.borrow());

    // Active job: the reload waits
    h.sched.maybe_reinitialize().unwrap();
    assert!(*drain.borrow());
    assert!(h.sched.registry.find("Keep").is_some());

    // Job drains; reinitialization completes and reloads persisted state
    h.sched.jobs.get_mut(1).unwrap().complete(10_010).unwrap();
    h.sched.maybe_reinitialize().unwrap();
    assert!(!*drain.borrow());
    assert!(h.sched.registry.find("Keep").is_some());
}

#[test]
fn reload_timeout_forces_reinitialization() {
    let mut h = ps_harness();
    h.clock.set_epoch_secs(10_000);
    let job = h.sched.jobs.create("alice", "X", pq_core::DestKind::LocalPrinter, 10_000);
    job.released = true;
    h.sched.jobs.get_mut(1).unwrap().start(10_000, None).unwrap();

    let drain = h.sched.drain_rx();
    h.sched.begin_reload();
    h.sched.maybe_reinitialize().unwrap();
    assert!(*drain.borrow());

    h.clock.advance(h.sched.config.reload_timeout + Duration::from_secs(1));
    h.sched.maybe_reinitialize().unwrap();
    assert!(!*drain.borrow());
}

#[test]
fn on_demand_daemon_idles_out() {
    let mut h = ps_harness();
    h.clock.set_epoch_secs(10_000);
    h.sched.set_on_demand(true);

    // Any event counts as activity
    h.sched.handle_event(SchedEvent::BrowsePacket {
        host: "x".to_string(),
        line: "junk".to_string(),
    });
    assert_eq!(h.sched.next_wakeup(), Duration::from_secs(61));

    h.sched.tick();
    assert!(!h.sched.stopping());

    h.clock.advance(Duration::from_secs(61));
    h.sched.tick();
    assert!(h.sched.stopping());
}

#[test]
fn unauthorized_response_carries_digest_nonce() {
    let mut h = ps_harness();
    h.add_printer("Test");
    let mut rule = crate::access::LocationRule::new("/");
    rule.auth_type = crate::access::AuthType::Digest;
    rule.require_valid_user = true;
    h.sched.access = crate::access::AccessControl::new(vec![rule], Vec::new());

    let req = request(Operation::GetPrinters, None, "alice");
    let peer = Peer {
        ip: "10.0.0.9".parse().unwrap(),
        hostname: "client.example.com".to_string(),
        secure: false,
    };
    let response = h.sched.process_request(req, &peer, None);
    assert_eq!(response.status, pq_core::StatusKind::Unauthorized);
    let op = response.group(pq_core::GroupTag::Operation).unwrap();
    assert!(op.get_text("digest-nonce").is_some());
}

#[test]
fn request_path_shapes() {
    let req = request(Operation::PrintJob, Some("/printers/office"), "alice");
    assert_eq!(super::request_path(&req), "/printers/office");

    let req = request(Operation::PausePrinter, Some("/printers/office"), "op");
    assert_eq!(super::request_path(&req), "/admin/printers/office");

    let req = job_request(Operation::CancelJob, 9, "alice");
    assert_eq!(super::request_path(&req), "/jobs/9");

    let req = request(Operation::GetPrinters, None, "alice");
    assert_eq!(super::request_path(&req), "/");
}
