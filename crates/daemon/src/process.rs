// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Child process spawning, tracking, and reaping.
//!
//! Children run in their own process group under the configured
//! unprivileged identity. The PID table maps each child back to its job
//! and display name; exits are recorded exactly once and dispatched to
//! the pipeline before the next admission decision.

use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::Stdio;

use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use pq_core::JobId;
use thiserror::Error;
use tracing::{debug, warn};

/// How a child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitInfo {
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        Self { code: status.code(), signal: status.signal() }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn crashed(&self) -> bool {
        self.signal.is_some()
    }
}

/// PID table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcRecord {
    /// 0 for control processes
    pub job: JobId,
    pub name: String,
}

/// Redirections and identity for one child.
pub struct SpawnSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,
    pub cwd: Option<PathBuf>,
    /// Join this process group, or start a new one when zero
    pub process_group: i32,
    /// Keep root privileges (backends talking to raw devices)
    pub run_as_root: bool,
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("could not spawn {program}: {source}")]
    Io {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("spawned child has no pid")]
    NoPid,
}

/// Spawns children and owns the PID table.
pub struct ProcessManager {
    table: HashMap<u32, ProcRecord>,
    run_uid: Option<u32>,
    run_gid: Option<u32>,
    filter_nice: i32,
}

impl ProcessManager {
    pub fn new(run_user: Option<&str>, run_group: Option<&str>, filter_nice: i32) -> Self {
        let run_uid = run_user
            .and_then(|u| nix::unistd::User::from_name(u).ok().flatten())
            .map(|u| u.uid.as_raw());
        let run_gid = run_group
            .and_then(|g| nix::unistd::Group::from_name(g).ok().flatten())
            .map(|g| g.gid.as_raw());
        Self { table: HashMap::new(), run_uid, run_gid, filter_nice }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn record(&self, pid: u32) -> Option<&ProcRecord> {
        self.table.get(&pid)
    }

    pub fn pids_for_job(&self, job: JobId) -> Vec<u32> {
        self.table
            .iter()
            .filter(|(_, r)| r.job == job)
            .map(|(pid, _)| *pid)
            .collect()
    }

    /// Spawn a child per the spec and insert its PID record.
    pub fn spawn(
        &mut self,
        spec: SpawnSpec,
        job: JobId,
        name: &str,
    ) -> Result<tokio::process::Child, SpawnError> {
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .env_clear()
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(spec.stdin)
            .stdout(spec.stdout)
            .stderr(spec.stderr)
            .process_group(spec.process_group);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        if !spec.run_as_root {
            if let Some(gid) = self.run_gid {
                cmd.gid(gid);
            }
            if let Some(uid) = self.run_uid {
                cmd.uid(uid);
            }
        }

        let child = cmd.spawn().map_err(|source| SpawnError::Io {
            program: spec.program.clone(),
            source,
        })?;
        let pid = child.id().ok_or(SpawnError::NoPid)?;

        if self.filter_nice != 0 {
            set_nice(pid, self.filter_nice);
        }

        debug!(pid, job, name, program = %spec.program.display(), "spawned child");
        self.table.insert(pid, ProcRecord { job, name: name.to_string() });
        Ok(child)
    }

    /// Remove a PID record at reap time. Each pid is reaped exactly once.
    pub fn reap(&mut self, pid: u32) -> Option<ProcRecord> {
        let record = self.table.remove(&pid);
        if let Some(r) = &record {
            debug!(pid, job = r.job, name = %r.name, "reaped child");
        }
        record
    }

    /// SIGTERM a whole process group.
    pub fn terminate_group(&self, pgid: u32) {
        signal_group(pgid, Signal::SIGTERM);
    }

    /// SIGKILL a whole process group after the grace window.
    pub fn kill_group(&self, pgid: u32) {
        signal_group(pgid, Signal::SIGKILL);
    }
}

fn signal_group(pgid: u32, signal: Signal) {
    if let Err(e) = killpg(Pid::from_raw(pgid as i32), signal) {
        if e != nix::errno::Errno::ESRCH {
            warn!(pgid, ?signal, error = %e, "could not signal process group");
        }
    }
}

/// Apply FilterNice to a freshly spawned child from the parent side.
fn set_nice(pid: u32, nice: i32) {
    use nix::sys::resource::{setpriority, PriorityWhich};
    if let Err(e) = setpriority(PriorityWhich::Process(Pid::from_raw(pid as i32)), nice) {
        warn!(pid, nice, error = %e, "could not set child priority");
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
