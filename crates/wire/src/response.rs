// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pq_core::{AttrBag, GroupTag, StatusKind};
use serde::{Deserialize, Serialize};

use crate::Request;

/// A response mirroring the request's id and version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub version: (u8, u8),
    pub status: StatusKind,
    pub request_id: u32,
    pub groups: Vec<(GroupTag, AttrBag)>,
}

impl Response {
    /// Build a response for a request. The dispatcher wrapper fills in the
    /// operation group's charset and natural-language before sending.
    pub fn for_request(request: &Request, status: StatusKind) -> Self {
        Self {
            version: request.version,
            status,
            request_id: request.request_id,
            groups: Vec::new(),
        }
    }

    pub fn with_group(mut self, tag: GroupTag, attrs: AttrBag) -> Self {
        self.groups.push((tag, attrs));
        self
    }

    /// Set the status in place (used when a handler downgrades Ok).
    pub fn set_status(&mut self, status: StatusKind) {
        self.status = status;
    }

    pub fn group(&self, tag: GroupTag) -> Option<&AttrBag> {
        self.groups.iter().find(|(t, _)| *t == tag).map(|(_, a)| a)
    }

    /// All groups with the given tag, in order (get-jobs returns one job
    /// group per job).
    pub fn groups_tagged(&self, tag: GroupTag) -> impl Iterator<Item = &AttrBag> {
        self.groups
            .iter()
            .filter(move |(t, _)| *t == tag)
            .map(|(_, a)| a)
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
