// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Banner pages.
//!
//! Banners are templates indexed from a directory at startup. Inserting
//! one renders `{attribute}` tokens from the job's attribute bag into a
//! spool file that joins the job's file list, so the filter pipeline
//! treats it like any other document.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use pq_core::{Job, SpoolFile};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum BannerError {
    #[error("unknown banner: {0}")]
    Unknown(String),

    #[error("banner io: {0}")]
    Io(#[from] std::io::Error),
}

/// One indexed banner template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub name: String,
    pub path: PathBuf,
    pub mime_type: String,
}

/// Banner directory index.
#[derive(Debug, Default)]
pub struct BannerIndex {
    banners: HashMap<String, Banner>,
}

impl BannerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every template in the banner directory.
    ///
    /// File stems become banner names; unreadable directories yield an
    /// empty index (banners are optional equipment).
    pub fn load(dir: &Path) -> Self {
        let mut banners = HashMap::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "no banner directory");
                return Self { banners };
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            // Skip editor and backup files
            let file_name = entry.file_name();
            if file_name.to_string_lossy().starts_with('~') {
                continue;
            }
            let extension = path.extension().and_then(|e| e.to_str());
            if matches!(extension, Some("bck" | "bak" | "sav")) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
            else {
                continue;
            };
            let mime_type = match extension {
                Some("ps") => "application/postscript".to_string(),
                _ => "text/plain".to_string(),
            };
            debug!(name, path = %path.display(), "indexed banner");
            banners.insert(name.clone(), Banner { name, path, mime_type });
        }
        Self { banners }
    }

    pub fn find(&self, name: &str) -> Option<&Banner> {
        self.banners.get(name)
    }

    pub fn len(&self) -> usize {
        self.banners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banners.is_empty()
    }

    /// Render a banner for a job into `out_path`.
    pub fn render(
        &self,
        name: &str,
        job: &Job,
        out_path: &Path,
    ) -> Result<SpoolFile, BannerError> {
        let banner = self
            .find(name)
            .ok_or_else(|| BannerError::Unknown(name.to_string()))?;
        let template = std::fs::read_to_string(&banner.path)?;
        let postscript = banner.mime_type == "application/postscript";

        let mut out = std::fs::File::create(out_path)?;
        for line in template.lines() {
            let rendered = substitute(line, job, postscript);
            writeln!(out, "{rendered}")?;
        }
        Ok(SpoolFile { path: out_path.to_path_buf(), mime_type: banner.mime_type.clone() })
    }
}

/// Substitute `{attribute-name}` tokens and `\c` escapes in one line.
fn substitute(line: &str, job: &Job, postscript: bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // \c passes the next character through verbatim
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    out.push('{');
                    out.push_str(&name);
                    continue;
                }
                match lookup(&name, job) {
                    Some(value) => {
                        if postscript {
                            out.push_str(&ps_quote(&value));
                        } else {
                            out.push_str(&value);
                        }
                    }
                    None => {
                        warn!(attribute = %name, "banner names unknown attribute");
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Resolve a token from the job, with a few built-ins not in the bag.
fn lookup(name: &str, job: &Job) -> Option<String> {
    match name {
        "job-id" => Some(job.id.to_string()),
        "job-name" | "job-title" => Some(job.title.clone()),
        "job-originating-user-name" | "user" => Some(job.username.clone()),
        "printer-name" => Some(job.dest.clone()),
        "job-priority" => Some(job.priority.to_string()),
        _ => job.attrs.get(name).map(|v| match v {
            pq_core::AttrValue::Text(s) => s.clone(),
            pq_core::AttrValue::Int(i) => i.to_string(),
            pq_core::AttrValue::Bool(b) => b.to_string(),
            pq_core::AttrValue::List(items) => items.join(","),
        }),
    }
}

/// PostScript string quoting for parentheses and backslashes.
fn ps_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
#[path = "banner_tests.rs"]
mod tests;
