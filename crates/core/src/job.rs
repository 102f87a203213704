// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job model and state machine.

use crate::attrs::AttrBag;
use crate::dest::DestKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Monotonically assigned positive job number.
pub type JobId = u32;

/// Job lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    /// Eligible for scheduling once hold-until passes
    Pending,
    /// Held until released or hold-until elapses
    Held,
    /// A pipeline is running for this job
    Processing,
    /// Pipeline failed retryably; waiting for operator action
    Stopped,
    /// Cancelled by a user or operator
    Cancelled,
    /// Pipeline failed unretryably
    Aborted,
    /// Printed successfully
    Completed,
}

impl JobState {
    /// Terminal states are kept only for history retention.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Cancelled | JobState::Aborted | JobState::Completed
        )
    }

    /// Active states appear in get-jobs and count against user caps.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobState::Pending | JobState::Held | JobState::Processing | JobState::Stopped
        )
    }
}

crate::simple_display! {
    JobState {
        Pending => "pending",
        Held => "held",
        Processing => "processing",
        Stopped => "stopped",
        Cancelled => "cancelled",
        Aborted => "aborted",
        Completed => "completed",
    }
}

/// A rejected state transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("job cannot go from {from} to {to}")]
pub struct BadTransition {
    pub from: JobState,
    pub to: JobState,
}

/// One spooled document of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoolFile {
    pub path: PathBuf,
    pub mime_type: String,
}

/// A print job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// 1..=100, higher first
    pub priority: u8,
    pub state: JobState,
    pub username: String,
    /// Target destination name; resolved through the registry at use
    pub dest: String,
    pub dest_kind: DestKind,
    /// Class member actually printing this job (set while processing)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub files: Vec<SpoolFile>,
    pub attrs: AttrBag,
    /// Epoch seconds before which the job may not run; `u64::MAX` = indefinite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_until: Option<u64>,
    #[serde(default)]
    pub sheets_completed: u32,
    pub title: String,
    /// True once last-document has been seen; the file list is frozen
    #[serde(default)]
    pub released: bool,
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    #[serde(default)]
    pub state_message: String,
}

impl Job {
    pub fn new(
        id: JobId,
        username: impl Into<String>,
        dest: impl Into<String>,
        dest_kind: DestKind,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            priority: 50,
            state: JobState::Pending,
            username: username.into(),
            dest: dest.into(),
            dest_kind,
            assigned_to: None,
            files: Vec::new(),
            attrs: AttrBag::new(),
            hold_until: None,
            sheets_completed: 0,
            title: String::new(),
            released: false,
            created_at,
            processing_at: None,
            completed_at: None,
            state_message: String::new(),
        }
    }

    /// Whether the job may be picked by admission at `now`.
    pub fn ready(&self, now: u64) -> bool {
        self.state == JobState::Pending
            && self.released
            && self.hold_until.map_or(true, |t| t <= now)
    }

    /// Append a document. The file list is append-only until release.
    pub fn add_file(&mut self, file: SpoolFile) -> Result<(), BadTransition> {
        if self.released || self.state.is_terminal() {
            return Err(BadTransition { from: self.state, to: self.state });
        }
        self.files.push(file);
        Ok(())
    }

    /// Hold the job until the given instant (`u64::MAX` for indefinite).
    pub fn hold(&mut self, until: u64) -> Result<(), BadTransition> {
        match self.state {
            JobState::Pending | JobState::Held => {
                self.state = JobState::Held;
                self.hold_until = Some(until);
                Ok(())
            }
            from => Err(BadTransition { from, to: JobState::Held }),
        }
    }

    /// Release a held (or stopped) job back to pending.
    pub fn release(&mut self) -> Result<(), BadTransition> {
        match self.state {
            JobState::Held | JobState::Stopped | JobState::Pending => {
                self.state = JobState::Pending;
                self.hold_until = None;
                Ok(())
            }
            from => Err(BadTransition { from, to: JobState::Pending }),
        }
    }

    /// Admission picked this job; a pipeline is being spawned.
    pub fn start(&mut self, now: u64, assigned_to: Option<String>) -> Result<(), BadTransition> {
        match self.state {
            JobState::Pending => {
                self.state = JobState::Processing;
                self.processing_at = Some(now);
                self.assigned_to = assigned_to;
                Ok(())
            }
            from => Err(BadTransition { from, to: JobState::Processing }),
        }
    }

    /// Every filter and the backend exited zero.
    pub fn complete(&mut self, now: u64) -> Result<(), BadTransition> {
        match self.state {
            JobState::Processing => {
                self.state = JobState::Completed;
                self.completed_at = Some(now);
                Ok(())
            }
            from => Err(BadTransition { from, to: JobState::Completed }),
        }
    }

    /// Retryable pipeline failure.
    pub fn stop(&mut self, message: impl Into<String>) -> Result<(), BadTransition> {
        match self.state {
            JobState::Processing | JobState::Pending => {
                self.state = JobState::Stopped;
                self.state_message = message.into();
                self.assigned_to = None;
                Ok(())
            }
            from => Err(BadTransition { from, to: JobState::Stopped }),
        }
    }

    /// Unretryable pipeline failure (crash by signal, spawn failure).
    pub fn abort(&mut self, message: impl Into<String>, now: u64) -> Result<(), BadTransition> {
        match self.state {
            JobState::Pending | JobState::Held | JobState::Processing | JobState::Stopped => {
                self.state = JobState::Aborted;
                self.state_message = message.into();
                self.completed_at = Some(now);
                self.assigned_to = None;
                Ok(())
            }
            from => Err(BadTransition { from, to: JobState::Aborted }),
        }
    }

    /// Cancel at user or operator request, or on a terminating signal.
    pub fn cancel(&mut self, now: u64) -> Result<(), BadTransition> {
        if self.state.is_terminal() {
            return Err(BadTransition { from: self.state, to: JobState::Cancelled });
        }
        self.state = JobState::Cancelled;
        self.completed_at = Some(now);
        self.assigned_to = None;
        Ok(())
    }

    /// Restart a terminal or stopped job from the beginning.
    pub fn restart(&mut self) -> Result<(), BadTransition> {
        match self.state {
            JobState::Stopped | JobState::Cancelled | JobState::Aborted | JobState::Completed => {
                self.state = JobState::Pending;
                self.processing_at = None;
                self.completed_at = None;
                self.sheets_completed = 0;
                self.state_message.clear();
                Ok(())
            }
            from => Err(BadTransition { from, to: JobState::Pending }),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
