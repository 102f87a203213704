// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System credential checks.
//!
//! The scheduler never handles password hashing itself: it hands the
//! username and secret to an [`Authenticator`] and gets a yes/no back.
//! Digest nonces are bound to the peer host and verified through the same
//! trait so the cryptographic side stays a collaborator.

use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Verifies credentials and group membership.
pub trait Authenticator: Send + Sync {
    /// Basic: check a cleartext password.
    fn check_password(&self, username: &str, password: &str) -> bool;

    /// Digest: check a response computed over the issued nonce.
    fn check_digest(&self, username: &str, nonce: &str, response: &str) -> bool;

    /// Negotiate: check an opaque token.
    fn check_negotiate(&self, _username: &str, _token: &str) -> bool {
        false
    }

    /// Supplementary group membership lookup.
    fn in_group(&self, username: &str, group: &str) -> bool;
}

/// Per-peer digest nonces.
///
/// A nonce is issued per host and replaced after each successful or failed
/// verification attempt, so responses cannot be replayed.
#[derive(Default)]
pub struct NonceStore {
    nonces: Mutex<HashMap<String, String>>,
    counter: Mutex<u64>,
}

impl NonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue (or reuse) the nonce for a host.
    pub fn issue(&self, host: &str) -> String {
        let mut nonces = self.nonces.lock();
        if let Some(nonce) = nonces.get(host) {
            return nonce.clone();
        }
        let nonce = self.generate(host);
        nonces.insert(host.to_string(), nonce.clone());
        nonce
    }

    /// Take the host's nonce, invalidating it.
    pub fn take(&self, host: &str) -> Option<String> {
        self.nonces.lock().remove(host)
    }

    fn generate(&self, host: &str) -> String {
        let mut counter = self.counter.lock();
        *counter += 1;
        let mut hasher = DefaultHasher::new();
        host.hash(&mut hasher);
        counter.hash(&mut hasher);
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

/// Authenticator backed by the system user and group databases.
///
/// Password verification requires a privileged credential service and is
/// delegated out of process in deployments; this implementation answers
/// group membership from the local databases and refuses password checks.
#[derive(Default)]
pub struct UnixAuthenticator;

impl Authenticator for UnixAuthenticator {
    fn check_password(&self, _username: &str, _password: &str) -> bool {
        false
    }

    fn check_digest(&self, _username: &str, _nonce: &str, _response: &str) -> bool {
        false
    }

    fn in_group(&self, username: &str, group: &str) -> bool {
        let Ok(Some(grp)) = nix::unistd::Group::from_name(group) else {
            return false;
        };
        if grp.mem.iter().any(|m| m == username) {
            return true;
        }
        // Primary group membership is not listed in the member array
        match nix::unistd::User::from_name(username) {
            Ok(Some(user)) => user.gid == grp.gid,
            _ => false,
        }
    }
}

/// In-memory authenticator for tests and single-user deployments.
#[derive(Clone, Default)]
pub struct FakeAuthenticator {
    users: Arc<Mutex<HashMap<String, (String, Vec<String>)>>>,
}

impl FakeAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, password: &str, groups: &[&str]) {
        self.users.lock().insert(
            username.to_string(),
            (password.to_string(), groups.iter().map(|g| g.to_string()).collect()),
        );
    }
}

impl Authenticator for FakeAuthenticator {
    fn check_password(&self, username: &str, password: &str) -> bool {
        self.users
            .lock()
            .get(username)
            .is_some_and(|(pw, _)| pw == password)
    }

    fn check_digest(&self, username: &str, _nonce: &str, response: &str) -> bool {
        // Digest math lives in the credential service; the fake accepts
        // the password itself as the response.
        self.check_password(username, response)
    }

    fn in_group(&self, username: &str, group: &str) -> bool {
        self.users
            .lock()
            .get(username)
            .is_some_and(|(_, groups)| groups.iter().any(|g| g == group))
    }
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
