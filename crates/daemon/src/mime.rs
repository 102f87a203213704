// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MIME type detection and converter chain selection.
//!
//! The scheduler treats both as opaque lookups: a [`MimeTypes`]
//! implementation detects a staged file's type and answers
//! (source, destination) chain queries with ordered (program, cost) steps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One converter in a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterStep {
    pub program: PathBuf,
    pub cost: u32,
}

/// Type detection and filter chain selection.
pub trait MimeTypes: Send + Sync {
    /// Cheapest ordered converter chain from `src` to `dst`.
    ///
    /// `Some(vec![])` means the types already match; `None` means no
    /// conversion path exists.
    fn chain(&self, src: &str, dst: &str) -> Option<Vec<FilterStep>>;

    /// Detect a staged file's MIME type, preferring the declared one.
    fn detect(&self, path: &Path, declared: Option<&str>) -> String;
}

/// Table-driven implementation: registered (src, dst, program, cost)
/// edges, chained by cheapest total cost.
#[derive(Debug, Default)]
pub struct FilterTable {
    edges: HashMap<String, Vec<(String, FilterStep)>>,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        src: impl Into<String>,
        dst: impl Into<String>,
        program: impl Into<PathBuf>,
        cost: u32,
    ) {
        self.edges
            .entry(src.into())
            .or_default()
            .push((dst.into(), FilterStep { program: program.into(), cost }));
    }
}

impl MimeTypes for FilterTable {
    fn chain(&self, src: &str, dst: &str) -> Option<Vec<FilterStep>> {
        if src == dst || dst == "application/octet-stream" {
            return Some(Vec::new());
        }

        // Cheapest path by total cost (the tables are tiny; no heap needed)
        let mut best: HashMap<&str, (u32, Vec<FilterStep>)> = HashMap::new();
        best.insert(src, (0, Vec::new()));
        let mut frontier = vec![src];

        while let Some(ty) = frontier.pop() {
            let (cost_here, chain_here) = match best.get(ty) {
                Some(entry) => entry.clone(),
                None => continue,
            };
            let Some(edges) = self.edges.get(ty) else {
                continue;
            };
            for (next, step) in edges {
                let cost = cost_here + step.cost;
                let better = best.get(next.as_str()).is_none_or(|(c, _)| cost < *c);
                if better {
                    let mut chain = chain_here.clone();
                    chain.push(step.clone());
                    best.insert(next.as_str(), (cost, chain));
                    frontier.push(next.as_str());
                }
            }
        }

        best.remove(dst).map(|(_, chain)| chain)
    }

    fn detect(&self, path: &Path, declared: Option<&str>) -> String {
        if let Some(declared) = declared {
            if !declared.is_empty() && declared != "application/octet-stream" {
                return declared.to_string();
            }
        }
        if let Ok(bytes) = std::fs::read(path) {
            let head = &bytes[..bytes.len().min(8)];
            if head.starts_with(b"%!") {
                return "application/postscript".to_string();
            }
            if head.starts_with(b"%PDF") {
                return "application/pdf".to_string();
            }
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("ps") => "application/postscript".to_string(),
            Some("pdf") => "application/pdf".to_string(),
            Some("txt") => "text/plain".to_string(),
            _ => "application/octet-stream".to_string(),
        }
    }
}

/// Total cost of a chain, compared against FilterLimit.
pub fn chain_cost(chain: &[FilterStep]) -> u32 {
    chain.iter().map(|s| s.cost).sum()
}

/// The stock conversion table, using the filters shipped in ServerBin.
pub fn default_filter_table(server_bin: &Path) -> FilterTable {
    let filter = |name: &str| server_bin.join("filter").join(name);
    let mut table = FilterTable::new();
    table.register("text/plain", "application/postscript", filter("texttops"), 100);
    table.register("application/pdf", "application/postscript", filter("pdftops"), 100);
    table.register(
        "application/postscript",
        "application/vnd.pq-raster",
        filter("pstoraster"),
        100,
    );
    table.register("image/png", "application/vnd.pq-raster", filter("imagetoraster"), 100);
    table.register("image/jpeg", "application/vnd.pq-raster", filter("imagetoraster"), 100);
    table
}

#[cfg(test)]
#[path = "mime_tests.rs"]
mod tests;
