// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol status kinds.
//!
//! Handlers return a [`StatusKind`]; the dispatcher wrapper copies it into
//! the response. Operational failures (pipeline exits, spawn errors) update
//! job state separately and only surface here as `Internal`.

use serde::{Deserialize, Serialize};

/// Outcome of a request, mirrored into the response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusKind {
    /// Request succeeded
    Ok,
    /// Malformed request or missing required attributes
    BadRequest,
    /// Denied by location rules
    Forbidden,
    /// Missing or invalid credentials
    Unauthorized,
    /// TLS mandated but not in use
    UpgradeRequired,
    /// Destination or job does not exist
    NotFound,
    /// Destination is refusing new jobs
    NotAccepting,
    /// Operation not allowed in the current state
    NotPossible,
    /// An attribute or value is not supported
    AttributesNotSupported,
    /// The document format is not supported
    DocumentFormatNotSupported,
    /// Out of memory, spawn failure, or other internal fault
    Internal,
}

impl StatusKind {
    /// Whether this status indicates success.
    pub fn is_ok(&self) -> bool {
        matches!(self, StatusKind::Ok)
    }
}

crate::simple_display! {
    StatusKind {
        Ok => "ok",
        BadRequest => "bad-request",
        Forbidden => "forbidden",
        Unauthorized => "unauthorized",
        UpgradeRequired => "upgrade-required",
        NotFound => "not-found",
        NotAccepting => "not-accepting",
        NotPossible => "not-possible",
        AttributesNotSupported => "attributes-or-values-not-supported",
        DocumentFormatNotSupported => "document-format-not-supported",
        Internal => "internal",
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
