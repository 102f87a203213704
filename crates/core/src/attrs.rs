// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered attribute bags.
//!
//! Requests and responses carry groups of named attributes; jobs and
//! destinations keep a bag echoed back by the get-attributes operations.
//! Order is preserved because group order is part of request validation.

use serde::{Deserialize, Serialize};

/// Attribute group tags, in required wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupTag {
    Operation,
    Job,
    Printer,
    Unsupported,
}

crate::simple_display! {
    GroupTag {
        Operation => "operation",
        Job => "job",
        Printer => "printer",
        Unsupported => "unsupported",
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
}

/// Sentinel text value: setting an attribute to this deletes it.
pub const DELETE_ATTR: &str = "delete-attribute";

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this value is the delete-attribute sentinel.
    pub fn is_delete(&self) -> bool {
        matches!(self, AttrValue::Text(s) if s == DELETE_ATTR)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

/// An ordered set of named attributes.
///
/// Insertion order is preserved; setting an existing name replaces the
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrBag {
    entries: Vec<(String, AttrValue)>,
}

impl AttrBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_text)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(AttrValue::as_int)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttrValue::as_bool)
    }

    /// Set an attribute, replacing any existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let idx = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Apply another bag onto this one: delete-sentinel values remove the
    /// attribute, everything else replaces or inserts.
    pub fn apply(&mut self, other: &AttrBag) {
        for (name, value) in &other.entries {
            if value.is_delete() {
                self.remove(name);
            } else {
                self.set(name.clone(), value.clone());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl<const N: usize> From<[(&str, AttrValue); N]> for AttrBag {
    fn from(pairs: [(&str, AttrValue); N]) -> Self {
        let mut bag = AttrBag::new();
        for (name, value) in pairs {
            bag.set(name, value);
        }
        bag
    }
}

#[cfg(test)]
#[path = "attrs_tests.rs"]
mod tests;
