// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox profile collaborator.
//!
//! When sandboxing is enabled and the daemon runs as root, a profile is
//! generated for each child before exec and released afterwards. The
//! policy content is platform-specific and supplied from outside; a
//! missing provider is a no-op, not an error.

/// Generates per-child confinement profiles.
pub trait SandboxProfile: Send + Sync {
    /// A profile token for the next child, or None to run unconfined.
    fn generate(&self, root_in_use: bool) -> Option<String>;

    /// Release a token after exec.
    fn release(&self, _token: String) {}
}

/// The no-op provider.
#[derive(Default)]
pub struct NoSandbox;

impl SandboxProfile for NoSandbox {
    fn generate(&self, _root_in_use: bool) -> Option<String> {
        None
    }
}

/// Render the active profile for `pqd -T`.
pub fn describe(provider: &dyn SandboxProfile) -> String {
    match provider.generate(nix::unistd::Uid::effective().is_root()) {
        Some(profile) => profile,
        None => "sandboxing disabled (no profile provider)".to_string(),
    }
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
