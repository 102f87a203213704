// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener tasks for client connections.
//!
//! Each configured listener accepts in its own task; each connection gets
//! a task that reads framed requests, stages document bodies into the
//! spool temp directory, and forwards the request to the scheduler loop,
//! serializing request/response per client. A semaphore caps concurrent
//! clients: accepting pauses at the cap and resumes as connections close.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pq_wire::ProtocolError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};
use tokio::sync::{mpsc, oneshot, watch, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::{ListenAddr, ListenSpec};
use crate::sched::{ClientRequest, Peer, SchedEvent};

static STAGE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Shared context for connection handlers.
#[derive(Clone)]
pub struct ListenCtx {
    pub events: mpsc::Sender<SchedEvent>,
    /// Client inactivity timeout
    pub timeout: Duration,
    pub temp_dir: PathBuf,
    /// Global client cap, shared by every listener
    pub clients: Arc<Semaphore>,
    /// Flips true while a reload drains clients
    pub drain: watch::Receiver<bool>,
}

impl ListenCtx {
    pub fn new(
        events: mpsc::Sender<SchedEvent>,
        timeout: Duration,
        temp_dir: PathBuf,
        max_clients: usize,
        drain: watch::Receiver<bool>,
    ) -> Self {
        Self {
            events,
            timeout,
            temp_dir,
            clients: Arc::new(Semaphore::new(max_clients.max(1))),
            drain,
        }
    }
}

enum BoundSocket {
    Tcp(TcpListener),
    Unix(UnixListener, PathBuf),
}

/// One bound listener.
pub struct Listener {
    socket: BoundSocket,
    secure: bool,
}

impl Listener {
    /// Bind every configured listener.
    pub async fn bind_all(specs: &[ListenSpec]) -> std::io::Result<Vec<Listener>> {
        let mut listeners = Vec::with_capacity(specs.len());
        for spec in specs {
            let socket = match &spec.addr {
                ListenAddr::Tcp(addr) => {
                    let listener = TcpListener::bind(addr).await?;
                    info!(%addr, secure = spec.secure, "listening");
                    BoundSocket::Tcp(listener)
                }
                ListenAddr::Unix(path) => {
                    if path.exists() {
                        let _ = std::fs::remove_file(path);
                    }
                    let listener = UnixListener::bind(path)?;
                    info!(path = %path.display(), "listening");
                    BoundSocket::Unix(listener, path.clone())
                }
            };
            listeners.push(Listener { socket, secure: spec.secure });
        }
        Ok(listeners)
    }

    /// Accept connections until the process exits.
    ///
    /// Accepting pauses when the client cap is reached and resumes as
    /// connections close, which also keeps fd pressure bounded.
    pub async fn run(self, ctx: ListenCtx) {
        let clients = Arc::clone(&ctx.clients);
        match self.socket {
            BoundSocket::Tcp(listener) => loop {
                let permit = match clients.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        debug!(%addr, "client connected");
                        let ctx = ctx.clone();
                        let secure = self.secure;
                        tokio::spawn(async move {
                            let _permit = permit;
                            let peer = Peer {
                                ip: addr.ip(),
                                hostname: peer_hostname(addr.ip()),
                                secure,
                            };
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, peer, ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "tcp accept error"),
                }
            },
            BoundSocket::Unix(listener, _path) => loop {
                let permit = match clients.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            let _permit = permit;
                            let peer = Peer::local();
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, peer, ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "unix accept error"),
                }
            },
        }
    }
}

/// Peers are identified by address unless a resolver is wired in.
fn peer_hostname(ip: IpAddr) -> String {
    if ip.is_loopback() {
        "localhost".to_string()
    } else {
        ip.to_string()
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        ProtocolError::Timeout => debug!("client timed out"),
        _ => warn!(error = %e, "connection error"),
    }
}

/// Serve one client: requests are serialized, a new request is not read
/// until the prior response has been written.
pub async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    peer: Peer,
    mut ctx: ListenCtx,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    loop {
        if *ctx.drain.borrow() {
            debug!("closing client for reload");
            return Ok(());
        }

        // Wake on either a request or a drain order
        let request = tokio::select! {
            request = pq_wire::read_request(&mut reader, ctx.timeout) => match request {
                Ok(request) => request,
                Err(ProtocolError::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            },
            _ = ctx.drain.changed() => continue,
        };

        let staged = if request.body_len > 0 {
            Some(stage_body(&mut reader, request.body_len, &ctx).await?)
        } else {
            None
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let event = SchedEvent::Client(Box::new(ClientRequest {
            request,
            peer: peer.clone(),
            staged,
            reply: reply_tx,
        }));
        if ctx.events.send(event).await.is_err() {
            // Scheduler is gone; the daemon is shutting down
            return Ok(());
        }
        let Ok(response) = reply_rx.await else {
            return Ok(());
        };

        pq_wire::write_response(&mut writer, &response, ctx.timeout).await?;
    }
}

/// Stream a request body into a unique spool temp file.
async fn stage_body<R>(
    reader: &mut R,
    body_len: u64,
    ctx: &ListenCtx,
) -> Result<PathBuf, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let n = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = ctx.temp_dir.join(format!("req{n:08}"));
    let mut file = tokio::fs::File::create(&path).await?;
    match pq_wire::read_body(reader, &mut file, body_len, ctx.timeout).await {
        Ok(_) => Ok(path),
        Err(e) => {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
