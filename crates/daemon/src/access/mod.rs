// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request admission: location rules, allow/deny evaluation, credentials.
//!
//! Every request is matched to the best location rule for its resource
//! path and method, the peer is checked against the rule's masks in the
//! rule's order, and credentials are verified when the rule demands them.

mod mask;

pub use mask::{BadMask, IfaceNet, Mask};

use crate::auth::{Authenticator, NonceStore};
use pq_core::StatusKind;
use std::net::IpAddr;
use tracing::debug;

/// HTTP-ish methods carried by requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn bit(self) -> u8 {
        match self {
            Method::Get => 1,
            Method::Post => 2,
            Method::Put => 4,
            Method::Delete => 8,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            _ => None,
        }
    }
}

/// Set of methods a rule covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodMask(u8);

impl MethodMask {
    pub const ALL: MethodMask = MethodMask(0x0f);
    pub const NONE: MethodMask = MethodMask(0);

    pub fn contains(&self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }

    pub fn insert(&mut self, method: Method) {
        self.0 |= method.bit();
    }
}

impl FromIterator<Method> for MethodMask {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        let mut mask = MethodMask::NONE;
        for m in iter {
            mask.insert(m);
        }
        mask
    }
}

/// Order policy for allow/deny evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// `Order deny,allow`: start allowed, deny masks flip, allow masks flip back
    #[default]
    DenyAllow,
    /// `Order allow,deny`: symmetric
    AllowDeny,
}

/// Whether both host and credential checks must pass, or either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Satisfy {
    #[default]
    All,
    Any,
}

/// Credential scheme demanded by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    #[default]
    None,
    Basic,
    Digest,
    BasicDigest,
    Negotiate,
}

/// An access policy attached to a URI path prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRule {
    pub path: String,
    pub methods: MethodMask,
    /// TLS mandated
    pub encryption: bool,
    pub auth_type: AuthType,
    /// `Require valid-user`
    pub require_valid_user: bool,
    /// `Require group NAME...`
    pub require_groups: Vec<String>,
    pub order: Order,
    pub allow: Vec<Mask>,
    pub deny: Vec<Mask>,
    pub satisfy: Satisfy,
}

impl LocationRule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: MethodMask::ALL,
            encryption: false,
            auth_type: AuthType::None,
            require_valid_user: false,
            require_groups: Vec::new(),
            order: Order::default(),
            allow: Vec::new(),
            deny: Vec::new(),
            satisfy: Satisfy::default(),
        }
    }

    fn requires_auth(&self) -> bool {
        self.auth_type != AuthType::None
            && (self.require_valid_user || !self.require_groups.is_empty())
    }
}

/// Credentials presented with a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    pub username: Option<&'a str>,
    /// Password for basic, digest response for digest
    pub secret: Option<&'a str>,
}

/// The rule table plus the local interface networks captured at startup.
#[derive(Debug, Default)]
pub struct AccessControl {
    rules: Vec<LocationRule>,
    ifaces: Vec<IfaceNet>,
}

impl AccessControl {
    pub fn new(rules: Vec<LocationRule>, ifaces: Vec<IfaceNet>) -> Self {
        Self { rules, ifaces }
    }

    pub fn rules(&self) -> &[LocationRule] {
        &self.rules
    }

    /// Longest-path rule whose method mask covers the request.
    pub fn find_best(&self, path: &str, method: Method) -> Option<&LocationRule> {
        self.rules
            .iter()
            .filter(|r| r.methods.contains(method) && path.starts_with(r.path.as_str()))
            .max_by_key(|r| r.path.len())
    }

    /// Full admission decision for a request.
    ///
    /// Digest credentials verify against the peer host's outstanding
    /// nonce; a response with no nonce issued never authenticates.
    pub fn authorize(
        &self,
        path: &str,
        method: Method,
        peer_ip: IpAddr,
        peer_host: &str,
        secure: bool,
        creds: Credentials<'_>,
        auth: &dyn Authenticator,
        nonces: &NonceStore,
    ) -> StatusKind {
        let Some(rule) = self.find_best(path, method) else {
            debug!(path, "no matching location rule");
            return StatusKind::Forbidden;
        };

        let host_allowed = self.host_allowed(rule, peer_ip, peer_host);

        if !host_allowed && rule.satisfy == Satisfy::All {
            return StatusKind::Forbidden;
        }

        if rule.encryption && !secure {
            return StatusKind::UpgradeRequired;
        }

        if !rule.requires_auth() {
            return StatusKind::Ok;
        }

        let Some(username) = creds.username.filter(|u| !u.is_empty()) else {
            // Anonymous: Satisfy any lets a host-allowed peer through
            return if rule.satisfy == Satisfy::All || !host_allowed {
                StatusKind::Unauthorized
            } else {
                StatusKind::Ok
            };
        };

        let secret = creds.secret.unwrap_or("");
        let check_digest = || match nonces.take(peer_host) {
            Some(nonce) => auth.check_digest(username, &nonce, secret),
            None => {
                debug!(peer_host, "digest response without an issued nonce");
                false
            }
        };
        let verified = match rule.auth_type {
            AuthType::None => true,
            AuthType::Basic => auth.check_password(username, secret),
            AuthType::Digest => check_digest(),
            AuthType::BasicDigest => auth.check_password(username, secret) || check_digest(),
            AuthType::Negotiate => auth.check_negotiate(username, secret),
        };
        if !verified {
            debug!(username, "credential check failed");
            return StatusKind::Unauthorized;
        }

        // Root bypasses group membership checks
        if !rule.require_groups.is_empty() && username != "root" {
            let member = rule
                .require_groups
                .iter()
                .any(|g| auth.in_group(username, g));
            if !member {
                debug!(username, "not in any required group");
                return StatusKind::Unauthorized;
            }
        }

        StatusKind::Ok
    }

    /// Evaluate the rule's masks against the peer, per the order policy.
    fn host_allowed(&self, rule: &LocationRule, ip: IpAddr, hostname: &str) -> bool {
        // Access from localhost is always allowed
        if ip.is_loopback() || hostname.eq_ignore_ascii_case("localhost") {
            return true;
        }

        // No allow/deny lines means access is allowed
        if rule.allow.is_empty() && rule.deny.is_empty() {
            return true;
        }

        let deny_hit = rule.deny.iter().any(|m| m.matches(ip, hostname, &self.ifaces));
        let allow_hit = rule.allow.iter().any(|m| m.matches(ip, hostname, &self.ifaces));

        match rule.order {
            Order::DenyAllow => {
                let mut allowed = true;
                if deny_hit {
                    allowed = false;
                }
                if allow_hit {
                    allowed = true;
                }
                allowed
            }
            Order::AllowDeny => {
                let mut allowed = false;
                if allow_hit {
                    allowed = true;
                }
                if deny_hit {
                    allowed = false;
                }
                allowed
            }
        }
    }
}

/// Capture the local interface networks for `@LOCAL` / `@IF(name)` masks.
pub fn local_interfaces() -> Vec<IfaceNet> {
    let Ok(addrs) = nix::ifaddrs::getifaddrs() else {
        return Vec::new();
    };
    let mut nets = Vec::new();
    for ifa in addrs {
        let Some(addr) = ifa.address.as_ref().and_then(sockaddr_ip) else {
            continue;
        };
        let prefix = ifa
            .netmask
            .as_ref()
            .and_then(sockaddr_ip)
            .map(netmask_prefix)
            .unwrap_or(match addr {
                IpAddr::V4(_) => 32,
                IpAddr::V6(_) => 128,
            });
        nets.push(IfaceNet { name: ifa.interface_name.clone(), addr, prefix });
    }
    nets
}

fn sockaddr_ip(addr: &nix::sys::socket::SockaddrStorage) -> Option<IpAddr> {
    if let Some(v4) = addr.as_sockaddr_in() {
        return Some(IpAddr::V4(v4.ip()));
    }
    if let Some(v6) = addr.as_sockaddr_in6() {
        return Some(IpAddr::V6(v6.ip()));
    }
    None
}

fn netmask_prefix(mask: IpAddr) -> u8 {
    match mask {
        IpAddr::V4(m) => u32::from_be_bytes(m.octets()).count_ones() as u8,
        IpAddr::V6(m) => u128::from_be_bytes(m.octets()).count_ones() as u8,
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
