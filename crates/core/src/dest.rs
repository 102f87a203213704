// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Destination model: printers, classes, and their remote/implicit variants.
//!
//! A destination is either a printer or a class, never both; the registry in
//! the daemon crate enforces naming and collision rules. Classes reference
//! their members weakly by name so the registry stays the single owner.

use crate::attrs::AttrBag;
use serde::{Deserialize, Serialize};

/// What a destination is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DestKind {
    LocalPrinter,
    LocalClass,
    ImplicitClass,
    RemotePrinter,
    RemoteClass,
}

impl DestKind {
    pub fn is_class(&self) -> bool {
        matches!(
            self,
            DestKind::LocalClass | DestKind::ImplicitClass | DestKind::RemoteClass
        )
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, DestKind::RemotePrinter | DestKind::RemoteClass)
    }

    pub fn is_implicit(&self) -> bool {
        matches!(self, DestKind::ImplicitClass)
    }
}

crate::simple_display! {
    DestKind {
        LocalPrinter => "printer",
        LocalClass => "class",
        ImplicitClass => "implicit-class",
        RemotePrinter => "remote-printer",
        RemoteClass => "remote-class",
    }
}

/// Printer state reported to clients and consulted by admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrinterState {
    Idle,
    Processing,
    Stopped,
}

crate::simple_display! {
    PrinterState {
        Idle => "idle",
        Processing => "processing",
        Stopped => "stopped",
    }
}

/// Device capability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub color: bool,
    #[serde(default)]
    pub duplex: bool,
    #[serde(default)]
    pub staple: bool,
    #[serde(default)]
    pub bind: bool,
    #[serde(default)]
    pub punch: bool,
    #[serde(default)]
    pub cover: bool,
    #[serde(default)]
    pub sort: bool,
}

/// A printer or class known to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub name: String,
    pub kind: DestKind,
    /// Resource URI (`/printers/<name>` or `/classes/<name>`)
    pub uri: String,
    /// Device URI (local printers only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_uri: Option<String>,
    /// Origin host (remote destinations only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub more_info: String,
    #[serde(default)]
    pub make_model: String,
    /// Document format the device consumes; filter chains end here
    pub native_type: String,
    /// Default job-sheets: (start banner, end banner)
    pub job_sheets: (String, String),
    pub state: PrinterState,
    #[serde(default)]
    pub state_message: String,
    #[serde(default)]
    pub state_reasons: Vec<String>,
    pub accepting: bool,
    #[serde(default)]
    pub caps: Capabilities,
    /// Opaque bag served by get-attributes; rebuilt after any mutation.
    #[serde(default)]
    pub attr_cache: AttrBag,
    /// Epoch seconds of the last remote announcement (remote/implicit only)
    #[serde(default)]
    pub browse_time: u64,
    /// Member destination names, in configured order (classes only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

impl Destination {
    /// Create a local printer in its initial state.
    pub fn printer(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uri: format!("/printers/{name}"),
            name,
            kind: DestKind::LocalPrinter,
            device_uri: None,
            hostname: None,
            info: String::new(),
            location: String::new(),
            more_info: String::new(),
            make_model: String::new(),
            native_type: "application/octet-stream".to_string(),
            job_sheets: ("none".to_string(), "none".to_string()),
            state: PrinterState::Idle,
            state_message: String::new(),
            state_reasons: Vec::new(),
            accepting: true,
            caps: Capabilities::default(),
            attr_cache: AttrBag::new(),
            browse_time: 0,
            members: Vec::new(),
        }
    }

    /// Create a local class with the given member names.
    pub fn class(name: impl Into<String>, members: Vec<String>) -> Self {
        let name = name.into();
        let mut dest = Self::printer(name.clone());
        dest.kind = DestKind::LocalClass;
        dest.uri = format!("/classes/{name}");
        dest.members = members;
        dest
    }

    /// Create a remote destination announced by `hostname`.
    pub fn remote(name: impl Into<String>, hostname: impl Into<String>, class: bool) -> Self {
        let mut dest = Self::printer(name);
        dest.kind = if class {
            DestKind::RemoteClass
        } else {
            DestKind::RemotePrinter
        };
        if class {
            dest.uri = format!("/classes/{}", dest.name);
        }
        dest.hostname = Some(hostname.into());
        dest
    }

    pub fn is_class(&self) -> bool {
        self.kind.is_class()
    }

    pub fn is_remote(&self) -> bool {
        self.kind.is_remote()
    }

    /// Whether admission may hand this destination a job right now.
    pub fn is_available(&self) -> bool {
        self.state == PrinterState::Idle && self.accepting
    }

    /// Stop the destination with a message. Idempotent.
    pub fn stop(&mut self, message: impl Into<String>) {
        self.state = PrinterState::Stopped;
        self.state_message = message.into();
    }

    /// Return a stopped destination to idle and clear the message.
    pub fn resume(&mut self) {
        self.state = PrinterState::Idle;
        self.state_message.clear();
    }

    /// Set or clear a printer-state-reason keyword (STATE: lines).
    pub fn set_reason(&mut self, reason: &str, present: bool) {
        let exists = self.state_reasons.iter().any(|r| r == reason);
        if present && !exists {
            self.state_reasons.push(reason.to_string());
        } else if !present && exists {
            self.state_reasons.retain(|r| r != reason);
        }
    }

    /// Rename in place, keeping the URI consistent.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.uri = if self.is_class() {
            format!("/classes/{}", self.name)
        } else {
            format!("/printers/{}", self.name)
        };
    }
}

#[cfg(test)]
#[path = "dest_tests.rs"]
mod tests;
