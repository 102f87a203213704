// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Allow/Deny mask entries and their matching rules.

use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// One Allow/Deny entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mask {
    /// Matches every peer
    All,
    /// Loopback or any address of a local interface
    Local,
    /// A specific named interface
    Interface(String),
    /// Exact hostname (case-insensitive)
    Host(String),
    /// Domain suffix, stored with the leading dot
    Domain(String),
    /// Address with prefix length; a bare address is a full-length prefix
    Cidr { net: IpAddr, prefix: u8 },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("bad allow/deny mask: {0}")]
pub struct BadMask(pub String);

impl FromStr for Mask {
    type Err = BadMask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BadMask(s.to_string()));
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(Mask::All);
        }
        if s.eq_ignore_ascii_case("none") {
            // "Deny from none" parses but never matches; modeled as an
            // impossible CIDR would be opaque, so reject it outright.
            return Err(BadMask(s.to_string()));
        }
        if s == "@LOCAL" {
            return Ok(Mask::Local);
        }
        if let Some(name) = s.strip_prefix("@IF(").and_then(|r| r.strip_suffix(')')) {
            return Ok(Mask::Interface(name.to_string()));
        }
        if let Some((addr, prefix)) = s.split_once('/') {
            let net: IpAddr = addr.parse().map_err(|_| BadMask(s.to_string()))?;
            let prefix: u8 = prefix.parse().map_err(|_| BadMask(s.to_string()))?;
            let max = match net {
                IpAddr::V4(_) => 32,
                IpAddr::V6(_) => 128,
            };
            if prefix > max {
                return Err(BadMask(s.to_string()));
            }
            return Ok(Mask::Cidr { net, prefix });
        }
        if let Ok(addr) = s.parse::<IpAddr>() {
            let prefix = match addr {
                IpAddr::V4(_) => 32,
                IpAddr::V6(_) => 128,
            };
            return Ok(Mask::Cidr { net: addr, prefix });
        }
        if let Some(rest) = s.strip_prefix("*.") {
            return Ok(Mask::Domain(format!(".{rest}").to_ascii_lowercase()));
        }
        if s.starts_with('.') {
            return Ok(Mask::Domain(s.to_ascii_lowercase()));
        }
        Ok(Mask::Host(s.to_ascii_lowercase()))
    }
}

/// A local interface's address and prefix, captured at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfaceNet {
    pub name: String,
    pub addr: IpAddr,
    pub prefix: u8,
}

impl Mask {
    /// Whether the peer matches this mask.
    pub fn matches(&self, ip: IpAddr, hostname: &str, ifaces: &[IfaceNet]) -> bool {
        match self {
            Mask::All => true,
            Mask::Local => {
                ip.is_loopback() || ifaces.iter().any(|i| cidr_contains(i.addr, i.prefix, ip))
            }
            Mask::Interface(name) => ifaces
                .iter()
                .filter(|i| &i.name == name)
                .any(|i| cidr_contains(i.addr, i.prefix, ip)),
            Mask::Host(host) => hostname.eq_ignore_ascii_case(host),
            Mask::Domain(suffix) => hostname.to_ascii_lowercase().ends_with(suffix),
            Mask::Cidr { net, prefix } => cidr_contains(*net, *prefix, ip),
        }
    }
}

/// `(addr & netmask) == network`, over the 128-bit mapped form so v4 and
/// v6 peers compare against the same table.
fn cidr_contains(net: IpAddr, prefix: u8, ip: IpAddr) -> bool {
    fn v4_bits(addr: std::net::Ipv4Addr) -> u128 {
        u128::from(u32::from_be_bytes(addr.octets()))
    }

    let (net_bits, ip_bits, width) = match (net, ip) {
        (IpAddr::V4(n), IpAddr::V4(i)) => (v4_bits(n), v4_bits(i), 32u32),
        (IpAddr::V6(n), IpAddr::V6(i)) => {
            (u128::from_be_bytes(n.octets()), u128::from_be_bytes(i.octets()), 128)
        }
        // Mapped v4-in-v6 peers compare against v4 masks
        (IpAddr::V4(n), IpAddr::V6(i)) => match i.to_ipv4_mapped() {
            Some(i4) => (v4_bits(n), v4_bits(i4), 32),
            None => return false,
        },
        (IpAddr::V6(_), IpAddr::V4(_)) => return false,
    };
    if prefix == 0 {
        return true;
    }
    let shift = width.saturating_sub(u32::from(prefix));
    (net_bits >> shift) == (ip_bits >> shift)
}

#[cfg(test)]
#[path = "mask_tests.rs"]
mod tests;
