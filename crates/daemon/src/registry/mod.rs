// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The canonical set of printers and classes.
//!
//! Lookups are by name or URI suffix; classes reference members weakly by
//! name. Naming collisions between local, remote, and implicit entries are
//! resolved by renaming per the rules below, and the client-visible
//! attribute cache is rebuilt after any mutation.

use std::collections::HashMap;

use pq_core::{AttrBag, AttrValue, DestKind, Destination, PrinterState, StatusKind};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("destination {0} not found")]
    NotFound(String),

    #[error("class member {0} does not resolve")]
    MemberNotFound(String),

    #[error("{0} exists as a class")]
    IsClass(String),

    #[error("{0} exists as a printer")]
    IsPrinter(String),

    #[error("remote destination {0} is not editable")]
    RemoteReadOnly(String),
}

impl From<&RegistryError> for StatusKind {
    fn from(err: &RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) | RegistryError::MemberNotFound(_) => StatusKind::NotFound,
            RegistryError::IsClass(_) | RegistryError::IsPrinter(_) => StatusKind::NotPossible,
            RegistryError::RemoteReadOnly(_) => StatusKind::Forbidden,
        }
    }
}

/// Settings applied by add-printer / add-class.
#[derive(Debug, Clone, Default)]
pub struct DestSettings {
    pub device_uri: Option<String>,
    pub info: Option<String>,
    pub location: Option<String>,
    pub make_model: Option<String>,
    pub native_type: Option<String>,
    pub job_sheets: Option<(String, String)>,
}

impl DestSettings {
    fn apply(&self, dest: &mut Destination) {
        if let Some(uri) = &self.device_uri {
            dest.device_uri = Some(uri.clone());
        }
        if let Some(info) = &self.info {
            dest.info = info.clone();
        }
        if let Some(location) = &self.location {
            dest.location = location.clone();
        }
        if let Some(mm) = &self.make_model {
            dest.make_model = mm.clone();
        }
        if let Some(nt) = &self.native_type {
            dest.native_type = nt.clone();
        }
        if let Some(sheets) = &self.job_sheets {
            dest.job_sheets = sheets.clone();
        }
    }
}

/// Destination registry; the exclusive owner of all destinations.
#[derive(Debug, Default)]
pub struct DestRegistry {
    dests: HashMap<String, Destination>,
    default_dest: Option<String>,
}

impl DestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.dests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Destination> {
        self.dests.values()
    }

    pub fn find(&self, name: &str) -> Option<&Destination> {
        self.dests.get(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Destination> {
        self.dests.get_mut(name)
    }

    /// Resolve `/printers/<name>` or `/classes/<name>`.
    pub fn find_by_uri_suffix(&self, resource: &str) -> Option<&Destination> {
        let name = resource
            .strip_prefix("/printers/")
            .or_else(|| resource.strip_prefix("/classes/"))?;
        self.dests.get(name)
    }

    pub fn default_dest(&self) -> Option<&Destination> {
        self.default_dest.as_deref().and_then(|n| self.dests.get(n))
    }

    /// Set the exclusive default destination.
    pub fn set_default(&mut self, name: &str) -> Result<(), RegistryError> {
        if !self.dests.contains_key(name) {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.default_dest = Some(name.to_string());
        Ok(())
    }

    /// Add or modify a local printer, resolving collisions by renaming.
    pub fn add_printer(
        &mut self,
        name: &str,
        settings: &DestSettings,
    ) -> Result<&Destination, RegistryError> {
        match self.dests.get(name).map(|d| d.kind) {
            None => {}
            Some(DestKind::LocalPrinter) => {
                // Modify in place
                if let Some(dest) = self.dests.get_mut(name) {
                    settings.apply(dest);
                }
                self.rebuild_cache(name);
                return Ok(&self.dests[name]);
            }
            Some(DestKind::LocalClass) => {
                return Err(RegistryError::IsClass(name.to_string()));
            }
            Some(DestKind::ImplicitClass) => {
                let renamed = format!("Any{name}");
                info!(from = name, to = %renamed, "renaming implicit class shadowed by new printer");
                self.rename_entry(name, &renamed);
            }
            Some(DestKind::RemotePrinter | DestKind::RemoteClass) => {
                let host = self.dests[name]
                    .hostname
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());
                let renamed = format!("{name}@{host}");
                info!(from = name, to = %renamed, "renaming remote entry shadowed by new printer");
                self.rename_entry(name, &renamed);
            }
        }

        let mut dest = Destination::printer(name);
        settings.apply(&mut dest);
        self.dests.insert(name.to_string(), dest);
        self.rebuild_cache(name);
        Ok(&self.dests[name])
    }

    /// Add or modify a local class; member URIs must resolve.
    pub fn add_class(
        &mut self,
        name: &str,
        member_uris: &[String],
        settings: &DestSettings,
    ) -> Result<&Destination, RegistryError> {
        let mut members = Vec::with_capacity(member_uris.len());
        for uri in member_uris {
            let member = self
                .find_by_uri_suffix(uri)
                .or_else(|| self.dests.get(uri.as_str()))
                .ok_or_else(|| RegistryError::MemberNotFound(uri.clone()))?;
            members.push(member.name.clone());
        }

        match self.dests.get(name).map(|d| d.kind) {
            None => {}
            Some(DestKind::LocalClass) => {
                if let Some(dest) = self.dests.get_mut(name) {
                    settings.apply(dest);
                    dest.members = members;
                }
                self.rebuild_cache(name);
                return Ok(&self.dests[name]);
            }
            Some(DestKind::LocalPrinter) => {
                return Err(RegistryError::IsPrinter(name.to_string()));
            }
            Some(DestKind::ImplicitClass) => {
                let renamed = format!("Any{name}");
                self.rename_entry(name, &renamed);
            }
            Some(DestKind::RemotePrinter | DestKind::RemoteClass) => {
                let host = self.dests[name]
                    .hostname
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());
                self.rename_entry(name, &format!("{name}@{host}"));
            }
        }

        let mut dest = Destination::class(name, members);
        settings.apply(&mut dest);
        self.dests.insert(name.to_string(), dest);
        self.rebuild_cache(name);
        Ok(&self.dests[name])
    }

    /// Remove a destination. The caller cancels its jobs first.
    ///
    /// Also removes the entry from every containing class and clears the
    /// default destination if it pointed here.
    pub fn delete(&mut self, name: &str) -> Result<Destination, RegistryError> {
        let dest = self
            .dests
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        let containing: Vec<String> = self
            .dests
            .values()
            .filter(|d| d.members.iter().any(|m| m == name))
            .map(|d| d.name.clone())
            .collect();
        for class in containing {
            if let Some(c) = self.dests.get_mut(&class) {
                c.members.retain(|m| m != name);
            }
            self.rebuild_cache(&class);
        }

        if self.default_dest.as_deref() == Some(name) {
            self.default_dest = None;
        }
        Ok(dest)
    }

    /// Mutate printer state through an operation; rebuilds the cache.
    pub fn with_dest<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Destination) -> R,
    ) -> Result<R, RegistryError> {
        let dest = self
            .dests
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        let result = f(dest);
        self.rebuild_cache(name);
        Ok(result)
    }

    fn rename_entry(&mut self, from: &str, to: &str) {
        if let Some(mut dest) = self.dests.remove(from) {
            dest.rename(to);
            // Fix up member lists that referenced the old name
            for d in self.dests.values_mut() {
                for m in d.members.iter_mut() {
                    if m == from {
                        *m = to.to_string();
                    }
                }
            }
            if self.default_dest.as_deref() == Some(from) {
                self.default_dest = Some(to.to_string());
            }
            self.dests.insert(to.to_string(), dest);
            self.rebuild_cache(to);
        }
    }

    /// Ingest a remote announcement. Returns the name the entry landed on.
    ///
    /// A re-announcement with a changed kind is a delete followed by an
    /// add, never a merge.
    pub fn ingest_remote(
        &mut self,
        name: &str,
        host: &str,
        is_class: bool,
        state: PrinterState,
        accepting: bool,
        settings: &DestSettings,
        now: u64,
    ) -> String {
        let announced_kind = if is_class {
            DestKind::RemoteClass
        } else {
            DestKind::RemotePrinter
        };

        let existing = self
            .dests
            .get(name)
            .map(|d| (d.kind, d.hostname.clone(), d.is_remote()));
        let landed = match existing {
            Some((kind, hostname, true)) => {
                if hostname.as_deref() == Some(host) {
                    if kind != announced_kind {
                        let _ = self.delete(name);
                        self.insert_remote(name, host, is_class, state, accepting, settings, now);
                    } else if let Some(dest) = self.dests.get_mut(name) {
                        dest.state = state;
                        dest.accepting = accepting;
                        settings.apply(dest);
                        dest.browse_time = now;
                    }
                    name.to_string()
                } else {
                    // Same name from a second host: both get @host suffixes
                    let old_host = hostname.unwrap_or_else(|| "unknown".to_string());
                    self.rename_entry(name, &format!("{name}@{old_host}"));
                    let new_name = format!("{name}@{host}");
                    self.insert_remote(&new_name, host, is_class, state, accepting, settings, now);
                    new_name
                }
            }
            Some((_, _, false)) => {
                // Local destination shadows the announcement
                let new_name = format!("{name}@{host}");
                match self.dests.get(&new_name) {
                    Some(_) => {
                        if let Some(dest) = self.dests.get_mut(&new_name) {
                            dest.state = state;
                            dest.accepting = accepting;
                            settings.apply(dest);
                            dest.browse_time = now;
                        }
                    }
                    None => {
                        self.insert_remote(
                            &new_name, host, is_class, state, accepting, settings, now,
                        );
                    }
                }
                new_name
            }
            None => {
                self.insert_remote(name, host, is_class, state, accepting, settings, now);
                name.to_string()
            }
        };

        self.update_implicit_classes(now);
        self.rebuild_cache(&landed);
        landed
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_remote(
        &mut self,
        name: &str,
        host: &str,
        is_class: bool,
        state: PrinterState,
        accepting: bool,
        settings: &DestSettings,
        now: u64,
    ) {
        let mut dest = Destination::remote(name, host, is_class);
        dest.state = state;
        dest.accepting = accepting;
        settings.apply(&mut dest);
        dest.browse_time = now;
        info!(name, host, "added remote destination");
        self.dests.insert(name.to_string(), dest);
    }

    /// Synthesize implicit classes for printers sharing a base name.
    ///
    /// `p@h1` + `p@h2` yields implicit class `p` with both as members;
    /// if a local destination `p` exists the class is named `Anyp`.
    pub fn update_implicit_classes(&mut self, now: u64) {
        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        for dest in self.dests.values() {
            if dest.kind.is_class() {
                continue;
            }
            let Some((base, _host)) = dest.name.split_once('@') else {
                continue;
            };
            groups.entry(base.to_string()).or_default().push(dest.name.clone());
        }

        // Include the bare-named printer itself in its group, if any
        for (base, members) in groups.iter_mut() {
            if let Some(dest) = self.dests.get(base.as_str()) {
                if !dest.kind.is_class() {
                    members.push(base.clone());
                }
            }
            members.sort();
        }

        let mut wanted: HashMap<String, Vec<String>> = HashMap::new();
        for (base, members) in groups {
            if members.len() < 2 {
                continue;
            }
            let shadowed = self
                .dests
                .get(base.as_str())
                .is_some_and(|d| !d.kind.is_implicit());
            let class_name = if shadowed { format!("Any{base}") } else { base };
            wanted.insert(class_name, members);
        }

        // Drop implicit classes that no longer aggregate two members
        let stale: Vec<String> = self
            .dests
            .values()
            .filter(|d| d.kind.is_implicit() && !wanted.contains_key(&d.name))
            .map(|d| d.name.clone())
            .collect();
        for name in stale {
            info!(name, "removing stale implicit class");
            let _ = self.delete(&name);
        }

        for (class_name, members) in wanted {
            match self.dests.get_mut(&class_name) {
                Some(existing) if existing.kind.is_implicit() => {
                    existing.members = members;
                    existing.browse_time = now;
                }
                Some(_) => {} // never displace a real destination
                None => {
                    let mut class = Destination::class(class_name.clone(), members);
                    class.kind = DestKind::ImplicitClass;
                    class.browse_time = now;
                    info!(name = %class_name, "added implicit class");
                    self.dests.insert(class_name.clone(), class);
                }
            }
            self.rebuild_cache(&class_name);
        }
    }

    /// Delete remote entries whose browse-time is past the timeout.
    pub fn age_remote(&mut self, now: u64, timeout_secs: u64) -> Vec<String> {
        let cutoff = now.saturating_sub(timeout_secs);
        let stale: Vec<String> = self
            .dests
            .values()
            .filter(|d| d.is_remote() && d.browse_time < cutoff)
            .map(|d| d.name.clone())
            .collect();
        for name in &stale {
            info!(name, "remote destination timed out; deleting");
            let _ = self.delete(name);
        }
        if !stale.is_empty() {
            self.update_implicit_classes(now);
        }
        stale
    }

    /// Rebuild the get-attributes cache for one destination. Idempotent.
    pub fn rebuild_cache(&mut self, name: &str) {
        let Some(dest) = self.dests.get(name) else {
            return;
        };
        let mut bag = AttrBag::new();
        bag.set("printer-name", dest.name.as_str());
        bag.set("printer-uri-supported", dest.uri.as_str());
        bag.set("printer-state", dest.state.to_string());
        bag.set("printer-state-message", dest.state_message.as_str());
        bag.set("printer-state-reasons", AttrValue::List(dest.state_reasons.clone()));
        bag.set("printer-is-accepting-jobs", dest.accepting);
        bag.set("printer-type", dest.kind.to_string());
        bag.set("printer-info", dest.info.as_str());
        bag.set("printer-location", dest.location.as_str());
        bag.set("printer-more-info", dest.more_info.as_str());
        bag.set("printer-make-and-model", dest.make_model.as_str());
        bag.set("document-format-default", dest.native_type.as_str());
        bag.set(
            "job-sheets-default",
            AttrValue::List(vec![dest.job_sheets.0.clone(), dest.job_sheets.1.clone()]),
        );
        if let Some(device_uri) = &dest.device_uri {
            bag.set("device-uri", device_uri.as_str());
        }
        if let Some(host) = &dest.hostname {
            bag.set("printer-hostname", host.as_str());
        }
        if dest.is_class() {
            bag.set("member-names", AttrValue::List(dest.members.clone()));
        }
        if let Some(dest) = self.dests.get_mut(name) {
            dest.attr_cache = bag;
        }
    }

    /// Rebuild every cache (startup, reload).
    pub fn rebuild_all(&mut self) {
        let names: Vec<String> = self.dests.keys().cloned().collect();
        for name in names {
            self.rebuild_cache(&name);
        }
    }

    /// Replace contents wholesale (startup load).
    pub fn replace(&mut self, dests: Vec<Destination>, default_dest: Option<String>) {
        self.dests = dests.into_iter().map(|d| (d.name.clone(), d)).collect();
        self.default_dest = default_dest.filter(|n| self.dests.contains_key(n));
        self.rebuild_all();
    }

    /// Resolve a class's members to destinations, in member order.
    pub fn members_of<'a>(&'a self, class: &Destination) -> Vec<&'a Destination> {
        class
            .members
            .iter()
            .filter_map(|m| self.dests.get(m))
            .collect()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
