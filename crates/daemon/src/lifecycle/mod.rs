// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, run, shutdown.

mod startup;

pub use startup::{startup, StartupOptions, StartupResult};

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::sched::SchedError;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("could not prepare {path}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not bind listeners: {0}")]
    Bind(#[from] std::io::Error),

    #[error(transparent)]
    Sched(#[from] SchedError),

    #[error(transparent)]
    Persist(#[from] crate::persist::PersistError),
}

/// Run a started daemon to completion.
///
/// Spawns the listener and browse-receiver tasks, then drives the
/// scheduler loop on this task until SIGTERM or event-channel closure.
pub async fn run(mut startup: StartupResult) -> Result<(), LifecycleError> {
    let ctx = crate::listener::ListenCtx::new(
        startup.sched.events_tx(),
        startup.sched.config.timeout,
        startup.sched.config.temp_dir.clone(),
        startup.sched.config.max_clients,
        startup.sched.drain_rx(),
    );
    for listener in startup.listeners {
        tokio::spawn(listener.run(ctx.clone()));
    }
    if let Some(socket) = startup.browse_socket {
        spawn_browse_receiver(socket, startup.sched.events_tx());
    }

    startup.sched.run(startup.events).await?;
    shutdown(&startup.sched.config, &startup.pid_path);
    Ok(())
}

/// Feed peer browse packets into the scheduler loop.
fn spawn_browse_receiver(
    socket: tokio::net::UdpSocket,
    events: tokio::sync::mpsc::Sender<crate::sched::SchedEvent>,
) {
    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((n, from)) => {
                    let line = String::from_utf8_lossy(&buf[..n]).into_owned();
                    let event = crate::sched::SchedEvent::BrowsePacket {
                        host: from.ip().to_string(),
                        line,
                    };
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "browse receive failed; browsing disabled");
                    return;
                }
            }
        }
    });
}

/// Remove runtime artifacts. State files were flushed by the loop.
pub fn shutdown(config: &crate::config::ServerConfig, pid_path: &std::path::Path) {
    for spec in &config.listeners {
        if let crate::config::ListenAddr::Unix(path) = &spec.addr {
            let _ = std::fs::remove_file(path);
        }
    }
    if let Err(e) = std::fs::remove_file(pid_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(error = %e, "could not remove pid file");
        }
    }
    info!("daemon shutdown complete");
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
