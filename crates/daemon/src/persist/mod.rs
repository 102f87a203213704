// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred state persistence.
//!
//! Mutations mark a dirty bit; the loop flushes all dirty files together
//! once the clean delay elapses. In-memory state is authoritative between
//! flushes, so a crash between mark and flush only loses the delta.

use std::io::Write;
use std::path::Path;

use pq_core::{Destination, DestKind, Job, JobState, PrinterState};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::directives::{self, Item};
use crate::jobs::JobStore;
use crate::registry::DestRegistry;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("persist io on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] directives::ParseError),

    #[error("bad control file {path}: {message}")]
    BadControl {
        path: std::path::PathBuf,
        message: String,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistError + '_ {
    move |source| PersistError::Io { path: path.to_path_buf(), source }
}

/// Which persisted files have drifted from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyKind {
    Printers,
    Classes,
    Jobs,
}

impl DirtyKind {
    fn bit(self) -> u8 {
        match self {
            DirtyKind::Printers => 1,
            DirtyKind::Classes => 2,
            DirtyKind::Jobs => 4,
        }
    }
}

/// The dirty bits plus the coalescing timer.
#[derive(Debug, Default)]
pub struct DirtySet {
    bits: u8,
    since: Option<u64>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, kind: DirtyKind, now: u64) {
        self.bits |= kind.bit();
        self.since.get_or_insert(now);
    }

    pub fn is_dirty(&self, kind: DirtyKind) -> bool {
        self.bits & kind.bit() != 0
    }

    pub fn any(&self) -> bool {
        self.bits != 0
    }

    /// Absolute flush deadline, if anything is dirty.
    pub fn flush_at(&self, clean_delay_secs: u64) -> Option<u64> {
        self.since.map(|s| s + clean_delay_secs)
    }

    /// Clear and return the kinds that were dirty.
    pub fn take(&mut self) -> Vec<DirtyKind> {
        let mut kinds = Vec::new();
        for kind in [DirtyKind::Printers, DirtyKind::Classes, DirtyKind::Jobs] {
            if self.is_dirty(kind) {
                kinds.push(kind);
            }
        }
        self.bits = 0;
        self.since = None;
        kinds
    }
}

/// Write `printers.conf`: local printers only.
pub fn save_printers(path: &Path, registry: &DestRegistry) -> Result<(), PersistError> {
    let mut out = Vec::new();
    let _ = writeln!(out, "# printers.conf - written by pqd, do not edit");
    let mut printers: Vec<&Destination> = registry
        .iter()
        .filter(|d| d.kind == DestKind::LocalPrinter)
        .collect();
    printers.sort_by(|a, b| a.name.cmp(&b.name));
    let default = registry.default_dest().map(|d| d.name.clone());

    for dest in printers {
        let tag = if default.as_deref() == Some(dest.name.as_str()) {
            "DefaultPrinter"
        } else {
            "Printer"
        };
        let _ = writeln!(out, "<{tag} {}>", dest.name);
        write_dest_body(&mut out, dest);
        let _ = writeln!(out, "</{tag}>");
    }
    write_atomic(path, &out)
}

/// Write `classes.conf`: local classes only.
pub fn save_classes(path: &Path, registry: &DestRegistry) -> Result<(), PersistError> {
    let mut out = Vec::new();
    let _ = writeln!(out, "# classes.conf - written by pqd, do not edit");
    let mut classes: Vec<&Destination> = registry
        .iter()
        .filter(|d| d.kind == DestKind::LocalClass)
        .collect();
    classes.sort_by(|a, b| a.name.cmp(&b.name));
    let default = registry.default_dest().map(|d| d.name.clone());

    for dest in classes {
        let tag = if default.as_deref() == Some(dest.name.as_str()) {
            "DefaultClass"
        } else {
            "Class"
        };
        let _ = writeln!(out, "<{tag} {}>", dest.name);
        write_dest_body(&mut out, dest);
        for member in &dest.members {
            let _ = writeln!(out, "Member {member}");
        }
        let _ = writeln!(out, "</{tag}>");
    }
    write_atomic(path, &out)
}

fn write_dest_body(out: &mut Vec<u8>, dest: &Destination) {
    if let Some(uri) = &dest.device_uri {
        let _ = writeln!(out, "DeviceURI {uri}");
    }
    if !dest.info.is_empty() {
        let _ = writeln!(out, "Info {}", dest.info);
    }
    if !dest.location.is_empty() {
        let _ = writeln!(out, "Location {}", dest.location);
    }
    if !dest.make_model.is_empty() {
        let _ = writeln!(out, "MakeModel {}", dest.make_model);
    }
    let _ = writeln!(out, "NativeType {}", dest.native_type);
    // A mid-pipeline state is transient; persist it as idle
    let state = match dest.state {
        PrinterState::Stopped => "stopped",
        _ => "idle",
    };
    let _ = writeln!(out, "State {state}");
    if !dest.state_message.is_empty() {
        let _ = writeln!(out, "StateMessage {}", dest.state_message);
    }
    let _ = writeln!(out, "Accepting {}", if dest.accepting { "yes" } else { "no" });
    let _ = writeln!(out, "JobSheets {} {}", dest.job_sheets.0, dest.job_sheets.1);
}

/// Parse `printers.conf` / `classes.conf` back into destinations.
///
/// Returns the entries and the default destination name, if any.
pub fn load_dests(path: &Path) -> Result<(Vec<Destination>, Option<String>), PersistError> {
    if !path.exists() {
        return Ok((Vec::new(), None));
    }
    let items = directives::parse_file(path)?;
    let mut dests = Vec::new();
    let mut default = None;

    for item in items {
        let Item::Block { name: tag, arg, items, .. } = item else {
            continue;
        };
        let is_default = tag.eq_ignore_ascii_case("DefaultPrinter")
            || tag.eq_ignore_ascii_case("DefaultClass");
        let is_class =
            tag.eq_ignore_ascii_case("Class") || tag.eq_ignore_ascii_case("DefaultClass");
        let is_printer =
            tag.eq_ignore_ascii_case("Printer") || tag.eq_ignore_ascii_case("DefaultPrinter");
        if !is_class && !is_printer {
            warn!(tag, "unknown block in destinations file; skipping");
            continue;
        }

        let mut dest = if is_class {
            Destination::class(arg.clone(), Vec::new())
        } else {
            Destination::printer(arg.clone())
        };
        for item in items {
            let Item::Directive { name, value, .. } = item else {
                continue;
            };
            match name.to_ascii_lowercase().as_str() {
                "deviceuri" => dest.device_uri = Some(value),
                "info" => dest.info = value,
                "location" => dest.location = value,
                "makemodel" => dest.make_model = value,
                "nativetype" => dest.native_type = value,
                "state" => {
                    dest.state = if value.eq_ignore_ascii_case("stopped") {
                        PrinterState::Stopped
                    } else {
                        PrinterState::Idle
                    };
                }
                "statemessage" => dest.state_message = value,
                "accepting" => dest.accepting = !value.eq_ignore_ascii_case("no"),
                "jobsheets" => {
                    let mut parts = value.split_whitespace();
                    dest.job_sheets = (
                        parts.next().unwrap_or("none").to_string(),
                        parts.next().unwrap_or("none").to_string(),
                    );
                }
                "member" => dest.members.push(value),
                _ => debug!(directive = %name, "unknown destination directive; skipping"),
            }
        }
        if is_default {
            default = Some(dest.name.clone());
        }
        dests.push(dest);
    }
    Ok((dests, default))
}

/// Write every job's control file; remove control files of purged jobs.
pub fn save_jobs(spool: &Path, jobs: &JobStore) -> Result<(), PersistError> {
    let mut keep = Vec::new();
    for job in jobs.iter() {
        let path = JobStore::control_path(spool, job.id);
        let body = serde_json::to_vec_pretty(job).map_err(|e| PersistError::BadControl {
            path: path.clone(),
            message: e.to_string(),
        })?;
        write_atomic(&path, &body)?;
        keep.push(path);
    }

    // Control files for jobs no longer in memory are stale
    if let Ok(entries) = std::fs::read_dir(spool) {
        for entry in entries.flatten() {
            let path = entry.path();
            let is_control = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('c') && n[1..].chars().all(|c| c.is_ascii_digit()));
            if is_control && !keep.contains(&path) {
                let _ = std::fs::remove_file(&path);
            }
        }
    }
    Ok(())
}

/// Load jobs from control files in the spool directory.
///
/// A job that was mid-pipeline at crash time restarts as pending.
pub fn load_jobs(spool: &Path) -> Result<Vec<Job>, PersistError> {
    let mut jobs = Vec::new();
    let Ok(entries) = std::fs::read_dir(spool) else {
        return Ok(jobs);
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with('c') || !name[1..].chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let bytes = std::fs::read(&path).map_err(io_err(&path))?;
        let mut job: Job = match serde_json::from_slice(&bytes) {
            Ok(job) => job,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable control file; skipping");
                continue;
            }
        };
        if job.state == JobState::Processing {
            job.state = JobState::Pending;
            job.assigned_to = None;
        }
        jobs.push(job);
    }
    jobs.sort_by_key(|j| j.id);
    Ok(jobs)
}

/// Write via a temp file and rename so readers never see a torn file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let tmp = path.with_extension("new");
    std::fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
    std::fs::rename(&tmp, path).map_err(io_err(path))?;
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
