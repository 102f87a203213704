// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job list: creation, lookup, ordering, and retention.
//!
//! Jobs are kept id-ordered; the scheduler derives a priority-ordered view
//! per admission pass. Spool files follow the stable `c<id>` / `d<id>-<nnn>`
//! naming so presence on disk is the source of truth across restarts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pq_core::{DestKind, Job, JobId, JobState};
use tracing::{debug, warn};

/// The job list and the id counter.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: BTreeMap<JobId, Job>,
    next_id: JobId,
}

impl JobStore {
    pub fn new() -> Self {
        Self { jobs: BTreeMap::new(), next_id: 1 }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Materialize a new job with the next id.
    pub fn create(
        &mut self,
        username: &str,
        dest: &str,
        dest_kind: DestKind,
        now: u64,
    ) -> &mut Job {
        let id = self.next_id;
        self.next_id += 1;
        let job = Job::new(id, username, dest, dest_kind, now);
        debug!(job_id = id, dest, username, "created job");
        self.jobs.entry(id).or_insert(job)
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    /// Jobs still in active scheduling.
    pub fn active(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values().filter(|j| j.state.is_active())
    }

    pub fn processing(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values().filter(|j| j.state == JobState::Processing)
    }

    pub fn active_count_for_user(&self, username: &str) -> usize {
        self.active().filter(|j| j.username == username).count()
    }

    pub fn active_count_for_dest(&self, dest: &str) -> usize {
        self.active().filter(|j| j.dest == dest).count()
    }

    /// Whether a printer is already printing (directly or as class member).
    pub fn printer_busy(&self, printer: &str) -> bool {
        self.processing()
            .any(|j| j.dest == printer || j.assigned_to.as_deref() == Some(printer))
    }

    /// Whether a class already has a job processing on the given member.
    pub fn class_member_busy(&self, class: &str, member: &str) -> bool {
        self.processing()
            .any(|j| j.dest == class && j.assigned_to.as_deref() == Some(member))
    }

    /// Ready pending jobs in admission order: priority high-first, then id.
    pub fn pending_candidates(&self, now: u64) -> Vec<JobId> {
        let mut ready: Vec<&Job> = self.jobs.values().filter(|j| j.ready(now)).collect();
        ready.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));
        ready.into_iter().map(|j| j.id).collect()
    }

    /// Earliest hold-until among held jobs (ignoring indefinite holds).
    pub fn next_hold_release(&self) -> Option<u64> {
        self.jobs
            .values()
            .filter(|j| j.state == JobState::Held)
            .filter_map(|j| j.hold_until)
            .filter(|&t| t != u64::MAX)
            .min()
    }

    /// Move held jobs whose hold-until has elapsed back to pending.
    pub fn release_due(&mut self, now: u64) -> Vec<JobId> {
        let due: Vec<JobId> = self
            .jobs
            .values()
            .filter(|j| {
                j.state == JobState::Held && j.hold_until.is_some_and(|t| t != u64::MAX && t <= now)
            })
            .map(|j| j.id)
            .collect();
        for id in &due {
            if let Some(job) = self.jobs.get_mut(id) {
                if job.release().is_ok() {
                    debug!(job_id = id, "hold-until elapsed; job released");
                }
            }
        }
        due
    }

    /// Whether any pending released work exists (bounds the loop timeout).
    pub fn has_pending(&self) -> bool {
        self.jobs
            .values()
            .any(|j| j.state == JobState::Pending && j.released)
    }

    /// Remove terminal jobs past the retention window; unlink their files.
    pub fn purge_expired(&mut self, now: u64, retention_secs: u64) -> Vec<JobId> {
        let expired: Vec<JobId> = self
            .jobs
            .values()
            .filter(|j| {
                j.state.is_terminal()
                    && j.completed_at
                        .is_some_and(|t| t.saturating_add(retention_secs) <= now)
            })
            .map(|j| j.id)
            .collect();
        for id in &expired {
            if let Some(job) = self.jobs.remove(id) {
                debug!(job_id = id, "retention expired; removing job");
                unlink_files(&job);
            }
        }
        expired
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        self.jobs.remove(&id)
    }

    /// Replace contents wholesale (startup load). Keeps the id counter
    /// above every loaded job.
    pub fn replace(&mut self, jobs: Vec<Job>) {
        self.next_id = jobs.iter().map(|j| j.id + 1).max().unwrap_or(1).max(self.next_id);
        self.jobs = jobs.into_iter().map(|j| (j.id, j)).collect();
    }

    /// Control file path for a job: `c<id>`.
    pub fn control_path(spool: &Path, id: JobId) -> PathBuf {
        spool.join(format!("c{id:05}"))
    }

    /// Data file path for a job's nth document: `d<id>-<nnn>`.
    pub fn data_path(spool: &Path, id: JobId, n: usize) -> PathBuf {
        spool.join(format!("d{id:05}-{n:03}"))
    }
}

/// Unlink a job's spool artifacts, tolerating absence.
pub fn unlink_files(job: &Job) {
    for file in &job.files {
        if let Err(e) = std::fs::remove_file(&file.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %file.path.display(), error = %e, "could not unlink spool file");
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
