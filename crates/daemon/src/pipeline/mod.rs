// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter/backend pipelines.
//!
//! A pipeline converts one spooled document through a chain of filter
//! children into the destination's native type and hands the result to a
//! backend speaking to the device URI. Children share one process group;
//! every stderr feeds the status pipe; the backend gets a back-channel
//! and a side-channel whose fd numbers travel in its environment.

pub mod status;

use std::os::fd::{AsRawFd, OwnedFd};
use std::process::Stdio;

use pq_core::{Destination, Job, JobId, SpoolFile};
use thiserror::Error;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::env::child_env;
use crate::mime::FilterStep;
use crate::process::{ExitInfo, ProcessManager, SpawnError, SpawnSpec};
use crate::sched::SchedEvent;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("destination {0} has no device URI")]
    NoDeviceUri(String),

    #[error("bad device URI: {0}")]
    BadDeviceUri(String),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error("could not open spool file: {0}")]
    Spool(#[from] std::io::Error),

    #[error("could not take child stdout")]
    NoStdout,

    #[error("could not create channel pipe: {0}")]
    Pipe(nix::errno::Errno),
}

/// Role of one pipeline child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildRole {
    Filter(usize),
    Backend,
}

#[derive(Debug)]
struct PipeChild {
    pid: u32,
    name: String,
    role: ChildRole,
    exit: Option<ExitInfo>,
}

/// Result of a finished pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    Canceled,
    /// A child died on a signal: unretryable
    Crashed { name: String, signal: i32 },
    /// A filter exited nonzero: retryable
    FilterFailed { name: String, code: i32 },
    /// The backend exited nonzero: retryable, printer stops
    BackendFailed { code: i32 },
}

/// A running pipeline for one (job, document) pair.
#[derive(Debug)]
pub struct Pipeline {
    pub job_id: JobId,
    /// Destination actually printing (class member or the printer itself)
    pub printer: String,
    pub file_index: usize,
    children: Vec<PipeChild>,
    pub canceled: bool,
    /// SIGKILL deadline after a SIGTERM
    pub kill_at: Option<u64>,
    /// Stuck-job cancellation deadline
    pub cancel_at: Option<u64>,
    pgid: u32,
}

/// Everything needed to spawn one pipeline.
pub struct PipelineSpec<'a> {
    pub job: &'a Job,
    pub printer: &'a Destination,
    pub file: &'a SpoolFile,
    pub file_index: usize,
    pub chain: Vec<FilterStep>,
    pub config: &'a ServerConfig,
}

impl Pipeline {
    /// Spawn the filter chain and backend for one document.
    pub fn spawn(
        spec: PipelineSpec<'_>,
        procs: &mut ProcessManager,
        events: &mpsc::Sender<SchedEvent>,
        now: u64,
    ) -> Result<Pipeline, PipelineError> {
        let device_uri = spec
            .printer
            .device_uri
            .as_deref()
            .ok_or_else(|| PipelineError::NoDeviceUri(spec.printer.name.clone()))?;
        let scheme = device_uri
            .split(':')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PipelineError::BadDeviceUri(device_uri.to_string()))?;
        let backend_program = spec.config.server_bin.join("backend").join(scheme);

        let base_env = child_env(
            spec.config,
            spec.job,
            &spec.printer.name,
            &spec.file.mime_type,
            Some(device_uri),
            None,
        );
        let copies = spec.job.attrs.get_int("copies").unwrap_or(1);
        let options: Vec<String> = spec
            .job
            .attrs
            .iter()
            .filter_map(|(name, value)| value.as_text().map(|v| format!("{name}={v}")))
            .collect();
        let args = vec![
            spec.job.id.to_string(),
            spec.job.username.clone(),
            spec.job.title.clone(),
            copies.to_string(),
            options.join(" "),
        ];

        // Back channel (device → filter) and side channel (filter → device).
        // The fd numbers are inherited across exec and exported in the
        // children's environment.
        let (back_read, back_write) = nix::unistd::pipe().map_err(PipelineError::Pipe)?;
        let (side_read, side_write) = nix::unistd::pipe().map_err(PipelineError::Pipe)?;

        let mut pipeline = Pipeline {
            job_id: spec.job.id,
            printer: spec.printer.name.clone(),
            file_index: spec.file_index,
            children: Vec::with_capacity(spec.chain.len() + 1),
            canceled: false,
            kill_at: None,
            cancel_at: if spec.config.max_job_time.as_secs() > 0 {
                Some(now + spec.config.max_job_time.as_secs())
            } else {
                None
            },
            pgid: 0,
        };

        let mut prev_stdout: Option<OwnedFd> = None;
        let last_filter = spec.chain.len().checked_sub(1);

        for (i, step) in spec.chain.iter().enumerate() {
            let stdin = match prev_stdout.take() {
                Some(fd) => Stdio::from(fd),
                None => Stdio::from(std::fs::File::open(&spec.file.path)?),
            };
            let mut env = base_env.clone();
            if last_filter == Some(i) {
                env.push(("PRINTQ_BACKCHANNEL_FD".into(), back_read.as_raw_fd().to_string()));
                env.push(("PRINTQ_SIDECHANNEL_FD".into(), side_write.as_raw_fd().to_string()));
            }
            let name = program_name(&step.program);
            let mut child = procs.spawn(
                SpawnSpec {
                    program: step.program.clone(),
                    args: args.clone(),
                    env,
                    stdin,
                    stdout: Stdio::piped(),
                    stderr: Stdio::piped(),
                    cwd: Some(spec.config.temp_dir.clone()),
                    process_group: pipeline.pgid as i32,
                    run_as_root: false,
                },
                spec.job.id,
                &name,
            )?;
            let pid = child.id().ok_or(SpawnError::NoPid)?;
            if pipeline.pgid == 0 {
                pipeline.pgid = pid;
            }
            let stdout = child.stdout.take().ok_or(PipelineError::NoStdout)?;
            prev_stdout = Some(stdout.into_owned_fd()?);
            pipeline.children.push(PipeChild {
                pid,
                name,
                role: ChildRole::Filter(i),
                exit: None,
            });
            watch_child(child, pid, events.clone());
        }

        // The backend reads the last filter's output (or the spool file
        // directly) and owns the other ends of both channels.
        let stdin = match prev_stdout.take() {
            Some(fd) => Stdio::from(fd),
            None => Stdio::from(std::fs::File::open(&spec.file.path)?),
        };
        let mut env = base_env;
        env.push(("PRINTQ_BACKCHANNEL_FD".into(), back_write.as_raw_fd().to_string()));
        env.push(("PRINTQ_SIDECHANNEL_FD".into(), side_read.as_raw_fd().to_string()));
        let name = format!("backend-{scheme}");
        let mut child = procs.spawn(
            SpawnSpec {
                program: backend_program,
                args,
                env,
                stdin,
                stdout: Stdio::null(),
                stderr: Stdio::piped(),
                cwd: Some(spec.config.temp_dir.clone()),
                process_group: pipeline.pgid as i32,
                // Device access may need privileges; the manager drops
                // them for filters only.
                run_as_root: true,
            },
            spec.job.id,
            &name,
        )?;
        let pid = child.id().ok_or(SpawnError::NoPid)?;
        if pipeline.pgid == 0 {
            pipeline.pgid = pid;
        }
        pipeline.children.push(PipeChild { pid, name, role: ChildRole::Backend, exit: None });
        watch_child(child, pid, events.clone());

        // Children hold their copies now; ours close here.
        drop(back_read);
        drop(back_write);
        drop(side_read);
        drop(side_write);

        debug!(
            job_id = spec.job.id,
            printer = %spec.printer.name,
            file_index = spec.file_index,
            children = pipeline.children.len(),
            pgid = pipeline.pgid,
            "pipeline spawned"
        );
        Ok(pipeline)
    }

    /// Record a child exit. Returns true when the pid belongs here.
    pub fn record_exit(&mut self, pid: u32, exit: ExitInfo) -> bool {
        match self.children.iter_mut().find(|c| c.pid == pid) {
            Some(child) => {
                child.exit = Some(exit);
                true
            }
            None => false,
        }
    }

    pub fn owns_pid(&self, pid: u32) -> bool {
        self.children.iter().any(|c| c.pid == pid)
    }

    pub fn all_exited(&self) -> bool {
        self.children.iter().all(|c| c.exit.is_some())
    }

    /// Classify the finished pipeline. Meaningful once all children exited.
    pub fn outcome(&self) -> PipelineOutcome {
        if self.canceled {
            return PipelineOutcome::Canceled;
        }
        for child in &self.children {
            if let Some(exit) = child.exit {
                if let Some(signal) = exit.signal {
                    return PipelineOutcome::Crashed { name: child.name.clone(), signal };
                }
            }
        }
        if let Some(backend) = self.children.iter().find(|c| c.role == ChildRole::Backend) {
            if let Some(exit) = backend.exit {
                if !exit.success() {
                    return PipelineOutcome::BackendFailed { code: exit.code.unwrap_or(-1) };
                }
            }
        }
        for child in &self.children {
            if let ChildRole::Filter(_) = child.role {
                if let Some(exit) = child.exit {
                    if !exit.success() {
                        return PipelineOutcome::FilterFailed {
                            name: child.name.clone(),
                            code: exit.code.unwrap_or(-1),
                        };
                    }
                }
            }
        }
        PipelineOutcome::Completed
    }

    /// Begin termination: SIGTERM the group, arm the SIGKILL deadline.
    pub fn terminate(&mut self, procs: &ProcessManager, now: u64, grace_secs: u64) {
        if self.canceled {
            return;
        }
        self.canceled = true;
        self.kill_at = Some(now + grace_secs);
        debug!(job_id = self.job_id, pgid = self.pgid, "terminating pipeline");
        procs.terminate_group(self.pgid);
    }

    /// Escalate to SIGKILL once the grace window has passed.
    pub fn kill_if_due(&mut self, procs: &ProcessManager, now: u64) {
        if self.kill_at.is_some_and(|t| t <= now) && !self.all_exited() {
            warn!(job_id = self.job_id, pgid = self.pgid, "grace window elapsed; killing pipeline");
            procs.kill_group(self.pgid);
            self.kill_at = None;
        }
    }

    /// Earliest wake-up this pipeline needs (kill or stuck-cancel time).
    pub fn next_deadline(&self) -> Option<u64> {
        match (self.kill_at, self.cancel_at) {
            (Some(k), Some(c)) => Some(k.min(c)),
            (Some(k), None) => Some(k),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        }
    }
}

fn program_name(program: &std::path::Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

/// Forward a child's stderr lines and final exit into the event channel.
///
/// One task per child, reading stderr to EOF before waiting, so every
/// status line is delivered ahead of the exit event.
fn watch_child(mut child: tokio::process::Child, pid: u32, events: mpsc::Sender<SchedEvent>) {
    let stderr = child.stderr.take();
    tokio::spawn(async move {
        if let Some(stderr) = stderr {
            let mut lines = tokio::io::BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if events.send(SchedEvent::StatusLine { pid, line }).await.is_err() {
                    break;
                }
            }
        }
        let exit = match child.wait().await {
            Ok(status) => ExitInfo::from_status(status),
            Err(e) => {
                warn!(pid, error = %e, "wait failed for child");
                ExitInfo { code: Some(-1), signal: None }
            }
        };
        let _ = events.send(SchedEvent::ChildExit { pid, exit }).await;
    });
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
