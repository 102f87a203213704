// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for scheduler and dispatcher tests.

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use pq_core::{AttrBag, AttrValue, FakeClock, GroupTag};
use pq_wire::{Operation, Request};
use tokio::sync::mpsc;

use super::{SchedEvent, Scheduler};
use crate::access::{AccessControl, LocationRule};
use crate::auth::FakeAuthenticator;
use crate::config::ServerConfig;
use crate::mime::FilterTable;
use crate::registry::DestSettings;

pub(crate) struct TestHarness {
    pub sched: Scheduler<FakeClock>,
    pub clock: FakeClock,
    pub events: mpsc::Receiver<SchedEvent>,
    pub auth: FakeAuthenticator,
    pub dir: tempfile::TempDir,
}

pub(crate) fn harness() -> TestHarness {
    harness_with(FilterTable::new())
}

pub(crate) fn harness_with(mime: FilterTable) -> TestHarness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServerConfig::default();
    config.server_root = dir.path().join("etc");
    config.request_root = dir.path().join("spool");
    config.temp_dir = dir.path().join("spool/tmp");
    config.data_dir = dir.path().join("share");
    config.banner_dir = dir.path().join("share/banners");
    config.server_bin = dir.path().join("lib");
    config.cache_dir = dir.path().join("cache");
    config.state_dir = dir.path().join("run");
    for path in [
        &config.server_root,
        &config.request_root,
        &config.temp_dir,
        &config.banner_dir,
        &config.server_bin.join("backend"),
        &config.cache_dir,
        &config.state_dir,
    ] {
        std::fs::create_dir_all(path).unwrap();
    }

    let auth = FakeAuthenticator::new();
    auth.add_user("alice", "pw", &[]);
    auth.add_user("bob", "pw", &[]);
    auth.add_user("root", "pw", &[]);
    auth.add_user("op", "pw", &["pqadmin"]);

    let access = AccessControl::new(vec![LocationRule::new("/")], Vec::new());
    let clock = FakeClock::new();
    let (tx, events) = mpsc::channel(256);
    let sched = Scheduler::new(
        config,
        access,
        Arc::new(auth.clone()),
        Arc::new(mime),
        None,
        clock.clone(),
        tx,
    );
    TestHarness { sched, clock, events, auth, dir }
}

impl TestHarness {
    /// Add a local printer with a file: device under the temp dir.
    pub fn add_printer(&mut self, name: &str) -> std::path::PathBuf {
        let out = self.dir.path().join(format!("{name}.out"));
        self.sched
            .registry
            .add_printer(
                name,
                &DestSettings {
                    device_uri: Some(format!("file://{}", out.display())),
                    native_type: Some("application/postscript".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        out
    }

    /// Install an executable backend for a device URI scheme.
    pub fn install_backend(&self, scheme: &str, script: &str) {
        let path = self.sched.config.server_bin.join("backend").join(scheme);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Backend that copies its stdin to the file: device path.
    pub fn install_file_backend(&self) {
        self.install_backend("file", "#!/bin/sh\nexec cat > \"${DEVICE_URI#file://}\"\n");
    }

    /// Stage a document body the way the listener would.
    pub fn stage_body(&self, bytes: &[u8]) -> std::path::PathBuf {
        let path = self
            .sched
            .config
            .temp_dir
            .join(format!("req{:06}", bytes.len()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Feed pipeline events back into the scheduler until no pipelines
    /// remain or the timeout passes.
    pub async fn pump(&mut self) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while !self.sched.pipelines.is_empty() {
            assert!(std::time::Instant::now() < deadline, "pipelines never drained");
            match tokio::time::timeout(std::time::Duration::from_secs(5), self.events.recv()).await
            {
                Ok(Some(event)) => self.sched.handle_event(event),
                _ => break,
            }
        }
        self.sched.tick();
    }

    /// Drain any immediately-available events (status lines, exits).
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.sched.handle_event(event);
        }
    }
}

/// An operation group with the required attributes.
pub(crate) fn op_group(printer_uri: Option<&str>) -> AttrBag {
    let mut bag = AttrBag::new();
    bag.set("attributes-charset", "utf-8");
    bag.set("attributes-natural-language", "en");
    if let Some(uri) = printer_uri {
        bag.set("printer-uri", uri);
    }
    bag
}

/// A minimal valid request for an operation.
pub(crate) fn request(op: Operation, printer_uri: Option<&str>, user: &str) -> Request {
    let mut req = Request::new(op, 1).with_group(GroupTag::Operation, op_group(printer_uri));
    req.username = Some(user.to_string());
    req
}

/// A request addressed to a job id.
pub(crate) fn job_request(op: Operation, job_id: u32, user: &str) -> Request {
    let mut group = op_group(None);
    group.set("job-id", AttrValue::Int(i64::from(job_id)));
    let mut req = Request::new(op, 1).with_group(GroupTag::Operation, group);
    req.username = Some(user.to_string());
    req
}
