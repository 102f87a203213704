// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: configuration, directories, state, sockets.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pq_core::SystemClock;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::LifecycleError;
use crate::access::{local_interfaces, AccessControl};
use crate::auth::UnixAuthenticator;
use crate::browse::{Browser, UdpBroadcast};
use crate::config::ServerConfig;
use crate::listener::Listener;
use crate::mime::default_filter_table;
use crate::sched::{SchedEvent, Scheduler};

/// Flags from the command line that shape startup.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    /// Listeners come from the service supervisor (`-l`)
    pub on_demand: bool,
    /// Sandboxing disabled (`-P`)
    pub no_sandbox: bool,
}

/// A fully wired daemon, ready for [`super::run`].
pub struct StartupResult {
    pub sched: Scheduler<SystemClock>,
    pub events: mpsc::Receiver<SchedEvent>,
    pub listeners: Vec<Listener>,
    pub browse_socket: Option<tokio::net::UdpSocket>,
    pub pid_path: PathBuf,
}

/// Load configuration and assemble the scheduler.
pub async fn startup(
    conf: &Path,
    files_conf: Option<&Path>,
    options: &StartupOptions,
) -> Result<StartupResult, LifecycleError> {
    let config = ServerConfig::load(conf, files_conf)?;
    prepare_directories(&config)?;
    raise_fd_limit();

    let pid_path = config.state_dir.join("pqd.pid");
    if let Err(e) = std::fs::write(&pid_path, format!("{}\n", std::process::id())) {
        warn!(path = %pid_path.display(), error = %e, "could not write pid file");
    }

    let access = AccessControl::new(config.locations.clone(), local_interfaces());
    let mime = Arc::new(default_filter_table(&config.server_bin));
    let (events_tx, events) = mpsc::channel(1024);

    let (browser, browse_socket) = if config.browsing {
        setup_browsing(&config).await
    } else {
        (None, None)
    };

    let mut sched = Scheduler::new(
        config,
        access,
        Arc::new(UnixAuthenticator),
        mime,
        browser,
        SystemClock,
        events_tx,
    );
    sched.conf_path = Some(conf.to_path_buf());
    sched.files_conf_path = files_conf.map(Path::to_path_buf);
    sched.load_state()?;
    info!(
        destinations = sched.registry.len(),
        jobs = sched.jobs.len(),
        "state loaded"
    );

    if options.on_demand {
        // Supervisor-provided sockets are treated like native ones; when
        // activation passes none, fall back to binding ourselves.
        info!("on-demand start requested");
        sched.set_on_demand(true);
    }
    let listeners = Listener::bind_all(&sched.config.listeners).await?;

    Ok(StartupResult { sched, events, listeners, browse_socket, pid_path })
}

/// Spool directories with the ownership modes clients depend on.
fn prepare_directories(config: &ServerConfig) -> Result<(), LifecycleError> {
    let dirs: [(&Path, u32); 5] = [
        (&config.request_root, 0o700),
        (&config.temp_dir, 0o1700),
        (&config.cache_dir, 0o755),
        (&config.state_dir, 0o755),
        (&config.server_root, 0o755),
    ];
    for (path, mode) in dirs {
        std::fs::create_dir_all(path).map_err(|source| LifecycleError::Prepare {
            path: path.to_path_buf(),
            source,
        })?;
        let perms = std::fs::Permissions::from_mode(mode);
        std::fs::set_permissions(path, perms).map_err(|source| LifecycleError::Prepare {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Raise the fd soft limit to the hard limit; clients, pipes, and spool
/// files all draw from it.
fn raise_fd_limit() {
    use nix::sys::resource::{getrlimit, setrlimit, Resource};
    match getrlimit(Resource::RLIMIT_NOFILE) {
        Ok((soft, hard)) if soft < hard => {
            if let Err(e) = setrlimit(Resource::RLIMIT_NOFILE, hard, hard) {
                warn!(error = %e, "could not raise fd limit");
            } else {
                info!(from = soft, to = hard, "raised fd limit");
            }
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "could not read fd limit"),
    }
}

/// Broadcast sender plus the receive socket for peer announcements.
async fn setup_browsing(
    config: &ServerConfig,
) -> (Option<Browser>, Option<tokio::net::UdpSocket>) {
    let target = std::net::SocketAddr::from(([255, 255, 255, 255], 631));
    let browser = match UdpBroadcast::new(target) {
        Ok(transport) => Some(Browser::new(
            Box::new(transport),
            config.browse_interval.as_secs(),
            config.browse_timeout.as_secs(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        )),
        Err(e) => {
            warn!(error = %e, "could not create broadcast socket; browsing disabled");
            None
        }
    };
    let socket = match tokio::net::UdpSocket::bind(("0.0.0.0", 631)).await {
        Ok(socket) => Some(socket),
        Err(e) => {
            warn!(error = %e, "could not bind browse port; ignoring peer announcements");
            None
        }
    };
    (browser, socket)
}
