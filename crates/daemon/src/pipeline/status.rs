// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status pipe line classification.
//!
//! Filters and backends report through stderr with a level prefix.
//! Unprefixed lines default to debug, like the original status buffer.

use crate::config::LogLevel;

/// Classified status line levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Emerg,
    Alert,
    Crit,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
    Debug2,
    /// Sheet accounting
    Page,
    /// printer-state-reasons updates
    State,
    /// Destination attribute updates
    Attr,
    /// PPD refresh request
    Ppd,
}

impl StatusLevel {
    /// Log threshold equivalent for DEBUG-and-below filtering.
    pub fn log_level(&self) -> LogLevel {
        match self {
            StatusLevel::Emerg => LogLevel::Emerg,
            StatusLevel::Alert => LogLevel::Alert,
            StatusLevel::Crit => LogLevel::Crit,
            StatusLevel::Error => LogLevel::Error,
            StatusLevel::Warning => LogLevel::Warn,
            StatusLevel::Notice => LogLevel::Notice,
            StatusLevel::Info => LogLevel::Info,
            StatusLevel::Debug => LogLevel::Debug,
            StatusLevel::Debug2 => LogLevel::Debug2,
            // Accounting lines always pass
            StatusLevel::Page | StatusLevel::State | StatusLevel::Attr | StatusLevel::Ppd => {
                LogLevel::None
            }
        }
    }
}

const PREFIXES: &[(&str, StatusLevel)] = &[
    ("EMERG:", StatusLevel::Emerg),
    ("ALERT:", StatusLevel::Alert),
    ("CRIT:", StatusLevel::Crit),
    ("ERROR:", StatusLevel::Error),
    ("WARNING:", StatusLevel::Warning),
    ("NOTICE:", StatusLevel::Notice),
    ("INFO:", StatusLevel::Info),
    ("DEBUG2:", StatusLevel::Debug2),
    ("DEBUG:", StatusLevel::Debug),
    ("PAGE:", StatusLevel::Page),
    ("STATE:", StatusLevel::State),
    ("ATTR:", StatusLevel::Attr),
    ("PPD:", StatusLevel::Ppd),
];

/// Split a status line into its level and payload.
pub fn classify(line: &str) -> (StatusLevel, &str) {
    for (prefix, level) in PREFIXES {
        if let Some(rest) = line.strip_prefix(prefix) {
            return (*level, rest.trim_start());
        }
    }
    (StatusLevel::Debug, line)
}

/// Parse a PAGE payload into the sheet count to add.
///
/// `PAGE: <page> <copies>` adds copies; `PAGE: total <n>` adds n;
/// a bare page number adds one.
pub fn page_count(payload: &str) -> u32 {
    let mut parts = payload.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("total"), Some(n)) => n.parse().unwrap_or(1),
        (Some(_), Some(copies)) => copies.parse().unwrap_or(1),
        _ => 1,
    }
}

/// A STATE payload: `+reason`, `-reason`, or a bare replacement list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Add(Vec<String>),
    Remove(Vec<String>),
    Replace(Vec<String>),
}

/// Parse a STATE payload.
pub fn state_change(payload: &str) -> StateChange {
    let payload = payload.trim();
    let split = |s: &str| -> Vec<String> {
        s.split([',', ' '])
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    };
    if let Some(rest) = payload.strip_prefix('+') {
        StateChange::Add(split(rest))
    } else if let Some(rest) = payload.strip_prefix('-') {
        StateChange::Remove(split(rest))
    } else {
        StateChange::Replace(split(payload))
    }
}

/// Parse an ATTR payload into name=value pairs.
///
/// Values may be quoted to include spaces.
pub fn attr_pairs(payload: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = payload.trim();
    while let Some(eq) = rest.find('=') {
        let name = rest[..eq].trim().to_string();
        rest = &rest[eq + 1..];
        let value = if let Some(stripped) = rest.strip_prefix('"') {
            match stripped.find('"') {
                Some(end) => {
                    let v = stripped[..end].to_string();
                    rest = stripped[end + 1..].trim_start();
                    v
                }
                None => {
                    let v = stripped.to_string();
                    rest = "";
                    v
                }
            }
        } else {
            match rest.find(char::is_whitespace) {
                Some(end) => {
                    let v = rest[..end].to_string();
                    rest = rest[end..].trim_start();
                    v
                }
                None => {
                    let v = rest.to_string();
                    rest = "";
                    v
                }
            }
        };
        if !name.is_empty() {
            pairs.push((name, value));
        }
    }
    pairs
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
