// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Destination browsing: periodic advertisement and peer ingestion.
//!
//! Summaries travel as one-line text packets over a transport
//! collaborator (UDP broadcast in production). Ingested entries become
//! remote destinations; entries that stop re-announcing age out.

use std::net::SocketAddr;

use pq_core::{Destination, PrinterState};
use tracing::{debug, warn};

use crate::registry::{DestRegistry, DestSettings};

/// Sends advertisement packets to peers.
pub trait BrowseTransport: Send + Sync {
    fn send(&self, packet: &str);
}

/// UDP broadcast transport.
pub struct UdpBroadcast {
    socket: std::net::UdpSocket,
    target: SocketAddr,
}

impl UdpBroadcast {
    pub fn new(target: SocketAddr) -> std::io::Result<Self> {
        let socket = std::net::UdpSocket::bind(("0.0.0.0", 0))?;
        socket.set_broadcast(true)?;
        Ok(Self { socket, target })
    }
}

impl BrowseTransport for UdpBroadcast {
    fn send(&self, packet: &str) {
        if let Err(e) = self.socket.send_to(packet.as_bytes(), self.target) {
            warn!(error = %e, "browse send failed");
        }
    }
}

/// A parsed peer announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowsePacket {
    pub is_class: bool,
    pub state: PrinterState,
    pub accepting: bool,
    pub uri: String,
    pub location: String,
    pub info: String,
    pub make_model: String,
}

impl BrowsePacket {
    /// Destination name: the URI's last path segment.
    pub fn name(&self) -> Option<&str> {
        self.uri.rsplit('/').next().filter(|n| !n.is_empty())
    }

    /// Render as a one-line packet.
    pub fn encode(&self) -> String {
        format!(
            "{} {} {} {} \"{}\" \"{}\" \"{}\"",
            if self.is_class { "class" } else { "printer" },
            self.state,
            if self.accepting { "accepting" } else { "rejecting" },
            self.uri,
            self.location,
            self.info,
            self.make_model,
        )
    }

    /// Parse a packet line; None when malformed.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim();
        let mut words = Vec::with_capacity(4);
        for _ in 0..4 {
            let end = rest.find(char::is_whitespace)?;
            words.push(&rest[..end]);
            rest = rest[end..].trim_start();
        }
        let is_class = match words[0] {
            "printer" => false,
            "class" => true,
            _ => return None,
        };
        let state = match words[1] {
            "idle" => PrinterState::Idle,
            "processing" => PrinterState::Processing,
            "stopped" => PrinterState::Stopped,
            _ => return None,
        };
        let accepting = words[2] == "accepting";
        let uri = words[3].to_string();

        let mut quoted = Vec::with_capacity(3);
        for _ in 0..3 {
            rest = rest.trim_start();
            let stripped = rest.strip_prefix('"')?;
            let end = stripped.find('"')?;
            quoted.push(stripped[..end].to_string());
            rest = &stripped[end + 1..];
        }
        let mut it = quoted.into_iter();
        Some(Self {
            is_class,
            state,
            accepting,
            uri,
            location: it.next().unwrap_or_default(),
            info: it.next().unwrap_or_default(),
            make_model: it.next().unwrap_or_default(),
        })
    }

    pub fn for_dest(dest: &Destination) -> Self {
        Self {
            is_class: dest.is_class(),
            state: dest.state,
            accepting: dest.accepting,
            uri: dest.uri.clone(),
            location: dest.location.clone(),
            info: dest.info.clone(),
            make_model: dest.make_model.clone(),
        }
    }
}

/// Periodic advertiser and ager.
pub struct Browser {
    transport: Box<dyn BrowseTransport>,
    interval_secs: u64,
    timeout_secs: u64,
    next_send: u64,
}

impl Browser {
    pub fn new(
        transport: Box<dyn BrowseTransport>,
        interval_secs: u64,
        timeout_secs: u64,
        now: u64,
    ) -> Self {
        Self { transport, interval_secs, timeout_secs, next_send: now + interval_secs }
    }

    /// Next instant this browser wants the loop to wake.
    pub fn next_deadline(&self) -> u64 {
        self.next_send
    }

    /// Emit summaries when due and age out stale remote entries.
    pub fn tick(&mut self, registry: &mut DestRegistry, now: u64) {
        if now >= self.next_send {
            let packets: Vec<String> = registry
                .iter()
                .filter(|d| !d.is_remote() && !d.kind.is_implicit())
                .map(|d| BrowsePacket::for_dest(d).encode())
                .collect();
            for packet in packets {
                debug!(%packet, "browse send");
                self.transport.send(&packet);
            }
            self.next_send = now + self.interval_secs;
        }
        registry.age_remote(now, self.timeout_secs);
    }

    /// Ingest one peer packet.
    pub fn ingest(&self, registry: &mut DestRegistry, host: &str, line: &str, now: u64) {
        let Some(packet) = BrowsePacket::parse(line) else {
            debug!(host, %line, "ignoring malformed browse packet");
            return;
        };
        let Some(name) = packet.name().map(str::to_string) else {
            return;
        };
        let settings = DestSettings {
            info: Some(packet.info.clone()),
            location: Some(packet.location.clone()),
            make_model: Some(packet.make_model.clone()),
            ..Default::default()
        };
        registry.ingest_remote(
            &name,
            host,
            packet.is_class,
            packet.state,
            packet.accepting,
            &settings,
            now,
        );
    }
}

#[cfg(test)]
#[path = "browse_tests.rs"]
mod tests;
