// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access and child environment assembly.

use std::path::Path;
use std::time::Duration;

use crate::config::ServerConfig;
use pq_core::Job;

/// Protocol version (from Cargo.toml)
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Software identifier passed to children and reported in responses.
pub const SOFTWARE: &str = concat!("printq/", env!("CARGO_PKG_VERSION"));

/// Default IPC timeout for reading one request frame.
pub fn ipc_timeout() -> Duration {
    std::env::var("PQ_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Server root override: PQ_SERVER_ROOT > compiled default.
pub fn server_root() -> Option<std::path::PathBuf> {
    std::env::var("PQ_SERVER_ROOT").ok().map(Into::into)
}

/// Environment for a filter or backend child.
///
/// Covers the common variables every child sees plus the per-job set.
/// `options` is the space-joined `key=value` rendering of the job
/// attributes the filters care about.
pub fn child_env(
    config: &ServerConfig,
    job: &Job,
    printer: &str,
    content_type: &str,
    device_uri: Option<&str>,
    ppd: Option<&Path>,
) -> Vec<(String, String)> {
    let copies = job.attrs.get_int("copies").unwrap_or(1);
    let options: Vec<String> = job
        .attrs
        .iter()
        .filter_map(|(name, value)| value.as_text().map(|v| format!("{name}={v}")))
        .collect();

    let mut env: Vec<(String, String)> = vec![
        ("PATH".into(), std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".into())),
        ("HOME".into(), config.temp_dir.display().to_string()),
        ("TMPDIR".into(), config.temp_dir.display().to_string()),
        ("LANG".into(), config.default_language.clone()),
        ("CHARSET".into(), config.default_charset.clone()),
        ("SOFTWARE".into(), SOFTWARE.into()),
        ("SERVER_ADMIN".into(), config.server_admin.clone()),
        ("PRINTQ_DATADIR".into(), config.data_dir.display().to_string()),
        ("PRINTQ_SERVERBIN".into(), config.server_bin.display().to_string()),
        ("PRINTQ_SERVERROOT".into(), config.server_root.display().to_string()),
        ("PRINTQ_STATEDIR".into(), config.state_dir.display().to_string()),
        ("PRINTQ_CACHEDIR".into(), config.cache_dir.display().to_string()),
        ("PRINTQ_DOCROOT".into(), config.doc_root.display().to_string()),
        ("PRINTQ_REQUESTROOT".into(), config.request_root.display().to_string()),
        ("PRINTQ_FONTPATH".into(), config.font_path.clone()),
        ("CONTENT_TYPE".into(), content_type.into()),
        ("PRINTER".into(), printer.into()),
        ("JOB_ID".into(), job.id.to_string()),
        ("USER".into(), job.username.clone()),
        ("TITLE".into(), job.title.clone()),
        ("COPIES".into(), copies.to_string()),
        ("OPTIONS".into(), options.join(" ")),
    ];
    if let Some(uri) = device_uri {
        env.push(("DEVICE_URI".into(), uri.into()));
    }
    if let Some(ppd) = ppd {
        env.push(("PPD".into(), ppd.display().to_string()));
    }
    env
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
