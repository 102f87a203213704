// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use pq_core::{AttrBag, AttrValue, GroupTag};
use serde::{Deserialize, Serialize};

use crate::Operation;

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Protocol version; major must be 1
    pub version: (u8, u8),
    pub operation: Operation,
    pub request_id: u32,
    /// Attribute groups in wire order
    pub groups: Vec<(GroupTag, AttrBag)>,
    /// Raw document bytes following this message on the wire
    #[serde(default)]
    pub body_len: u64,
    /// Credentials presented with the request, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Request {
    pub fn new(operation: Operation, request_id: u32) -> Self {
        Self {
            version: (1, 1),
            operation,
            request_id,
            groups: Vec::new(),
            body_len: 0,
            username: None,
            password: None,
        }
    }

    /// Append an attribute group.
    pub fn with_group(mut self, tag: GroupTag, attrs: AttrBag) -> Self {
        self.groups.push((tag, attrs));
        self
    }

    /// First group with the given tag.
    pub fn group(&self, tag: GroupTag) -> Option<&AttrBag> {
        self.groups.iter().find(|(t, _)| *t == tag).map(|(_, a)| a)
    }

    /// First value of a named attribute, searching groups in order.
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.groups.iter().find_map(|(_, bag)| bag.get(name))
    }

    pub fn attr_text(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(AttrValue::as_text)
    }

    pub fn attr_int(&self, name: &str) -> Option<i64> {
        self.attr(name).and_then(AttrValue::as_int)
    }

    /// Whether group tags arrive in non-decreasing order.
    pub fn groups_ordered(&self) -> bool {
        self.groups.windows(2).all(|w| w[0].0 <= w[1].0)
    }

    pub fn charset(&self) -> Option<&str> {
        self.attr_text("attributes-charset")
    }

    pub fn natural_language(&self) -> Option<&str> {
        self.attr_text("attributes-natural-language")
    }

    pub fn printer_uri(&self) -> Option<&str> {
        self.attr_text("printer-uri")
    }

    pub fn job_uri(&self) -> Option<&str> {
        self.attr_text("job-uri")
    }

    /// Job id from `job-id` or from a `/jobs/<id>` job-uri.
    pub fn job_id(&self) -> Option<u32> {
        if let Some(id) = self.attr_int("job-id") {
            return u32::try_from(id).ok();
        }
        let uri = self.job_uri()?;
        uri.rsplit('/').next()?.parse().ok()
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
