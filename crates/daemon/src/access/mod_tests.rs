// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::auth::{FakeAuthenticator, NonceStore};
use std::net::IpAddr;

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn admin_rule() -> LocationRule {
    let mut rule = LocationRule::new("/admin");
    rule.order = Order::DenyAllow;
    rule.deny = vec!["all".parse().unwrap()];
    rule.allow = vec!["10.0.0.0/8".parse().unwrap()];
    rule.auth_type = AuthType::Basic;
    rule.require_groups = vec!["pqadmin".to_string()];
    rule
}

fn open_rule() -> LocationRule {
    LocationRule::new("/")
}

fn authenticator() -> FakeAuthenticator {
    let auth = FakeAuthenticator::new();
    auth.add_user("carol", "secret", &["pqadmin"]);
    auth.add_user("dave", "hunter2", &[]);
    auth
}

fn control() -> AccessControl {
    AccessControl::new(vec![open_rule(), admin_rule()], Vec::new())
}

/// authorize() with a fresh nonce store (digest tests keep their own).
fn decide(
    ac: &AccessControl,
    path: &str,
    ip_addr: IpAddr,
    host: &str,
    secure: bool,
    creds: Credentials<'_>,
    auth: &FakeAuthenticator,
) -> StatusKind {
    ac.authorize(
        path,
        Method::Post,
        ip_addr,
        host,
        secure,
        creds,
        auth,
        &NonceStore::new(),
    )
}

#[test]
fn longest_path_wins() {
    let ac = control();
    let rule = ac.find_best("/admin/printers", Method::Post).unwrap();
    assert_eq!(rule.path, "/admin");

    let rule = ac.find_best("/printers/office", Method::Post).unwrap();
    assert_eq!(rule.path, "/");
}

#[test]
fn method_mask_filters_rules() {
    let mut narrow = LocationRule::new("/admin");
    narrow.methods = [Method::Get].into_iter().collect();
    let ac = AccessControl::new(vec![open_rule(), narrow], Vec::new());

    // POST to /admin falls back to the root rule
    assert_eq!(ac.find_best("/admin", Method::Post).unwrap().path, "/");
    assert_eq!(ac.find_best("/admin", Method::Get).unwrap().path, "/admin");
}

#[test]
fn no_matching_rule_is_forbidden() {
    let ac = AccessControl::new(vec![admin_rule()], Vec::new());
    let status = decide(
        &ac,
        "/printers/office",
        ip("10.1.2.3"),
        "",
        false,
        Credentials::default(),
        &authenticator(),
    );
    assert_eq!(status, StatusKind::Forbidden);
}

#[test]
fn deny_then_allow_outside_network_forbidden() {
    let ac = control();
    let status = decide(
        &ac,
        "/admin/printers",
        ip("192.0.2.1"),
        "",
        false,
        Credentials::default(),
        &authenticator(),
    );
    assert_eq!(status, StatusKind::Forbidden);
}

#[test]
fn inside_network_demands_credentials() {
    let ac = control();
    let status = decide(
        &ac,
        "/admin/printers",
        ip("10.1.2.3"),
        "",
        false,
        Credentials::default(),
        &authenticator(),
    );
    assert_eq!(status, StatusKind::Unauthorized);
}

#[test]
fn valid_credentials_in_group_succeed() {
    let ac = control();
    let status = decide(
        &ac,
        "/admin/printers",
        ip("10.1.2.3"),
        "",
        false,
        Credentials { username: Some("carol"), secret: Some("secret") },
        &authenticator(),
    );
    assert_eq!(status, StatusKind::Ok);
}

#[test]
fn wrong_password_unauthorized() {
    let ac = control();
    let status = decide(
        &ac,
        "/admin/printers",
        ip("10.1.2.3"),
        "",
        false,
        Credentials { username: Some("carol"), secret: Some("wrong") },
        &authenticator(),
    );
    assert_eq!(status, StatusKind::Unauthorized);
}

#[test]
fn valid_user_outside_group_unauthorized() {
    let ac = control();
    let status = decide(
        &ac,
        "/admin/printers",
        ip("10.1.2.3"),
        "",
        false,
        Credentials { username: Some("dave"), secret: Some("hunter2") },
        &authenticator(),
    );
    assert_eq!(status, StatusKind::Unauthorized);
}

#[test]
fn root_bypasses_group_check() {
    let auth = authenticator();
    auth.add_user("root", "toor", &[]);
    let ac = control();
    let status = decide(
        &ac,
        "/admin/printers",
        ip("10.1.2.3"),
        "",
        false,
        Credentials { username: Some("root"), secret: Some("toor") },
        &auth,
    );
    assert_eq!(status, StatusKind::Ok);
}

#[test]
fn loopback_always_allowed() {
    let mut rule = admin_rule();
    rule.auth_type = AuthType::None;
    rule.require_groups.clear();
    let ac = AccessControl::new(vec![rule], Vec::new());
    let status = decide(
        &ac,
        "/admin/printers",
        ip("127.0.0.1"),
        "localhost",
        false,
        Credentials::default(),
        &authenticator(),
    );
    assert_eq!(status, StatusKind::Ok);
}

#[test]
fn allow_then_deny_default_denies() {
    let mut rule = LocationRule::new("/");
    rule.order = Order::AllowDeny;
    rule.allow = vec!["10.0.0.0/8".parse().unwrap()];
    let ac = AccessControl::new(vec![rule], Vec::new());
    let auth = authenticator();

    let ok = decide(&ac, "/x", ip("10.0.0.1"), "", false, Credentials::default(), &auth);
    assert_eq!(ok, StatusKind::Ok);

    let denied = decide(&ac, "/x", ip("192.0.2.1"), "", false, Credentials::default(), &auth);
    assert_eq!(denied, StatusKind::Forbidden);
}

#[test]
fn deny_wins_under_allow_then_deny() {
    let mut rule = LocationRule::new("/");
    rule.order = Order::AllowDeny;
    rule.allow = vec!["10.0.0.0/8".parse().unwrap()];
    rule.deny = vec!["10.5.0.0/16".parse().unwrap()];
    let ac = AccessControl::new(vec![rule], Vec::new());

    let denied = decide(
        &ac,
        "/x",
        ip("10.5.1.1"),
        "",
        false,
        Credentials::default(),
        &authenticator(),
    );
    assert_eq!(denied, StatusKind::Forbidden);
}

#[test]
fn encryption_required_demands_tls() {
    let mut rule = LocationRule::new("/");
    rule.encryption = true;
    let ac = AccessControl::new(vec![rule], Vec::new());
    let auth = authenticator();

    let plain = decide(&ac, "/x", ip("10.0.0.1"), "", false, Credentials::default(), &auth);
    assert_eq!(plain, StatusKind::UpgradeRequired);

    let tls = decide(&ac, "/x", ip("10.0.0.1"), "", true, Credentials::default(), &auth);
    assert_eq!(tls, StatusKind::Ok);
}

#[test]
fn satisfy_any_allows_host_without_credentials() {
    let mut rule = admin_rule();
    rule.satisfy = Satisfy::Any;
    let ac = AccessControl::new(vec![rule], Vec::new());

    let status = decide(
        &ac,
        "/admin/x",
        ip("10.1.2.3"),
        "",
        false,
        Credentials::default(),
        &authenticator(),
    );
    assert_eq!(status, StatusKind::Ok);
}

#[test]
fn digest_requires_an_issued_nonce() {
    let mut rule = LocationRule::new("/");
    rule.auth_type = AuthType::Digest;
    rule.require_valid_user = true;
    let ac = AccessControl::new(vec![rule], Vec::new());
    let auth = authenticator();
    let nonces = NonceStore::new();
    let creds = Credentials { username: Some("carol"), secret: Some("secret") };

    // No nonce outstanding for this host: refused
    let status = ac.authorize(
        "/x",
        Method::Post,
        ip("10.0.0.1"),
        "client.example.com",
        false,
        creds,
        &auth,
        &nonces,
    );
    assert_eq!(status, StatusKind::Unauthorized);

    // Issue a nonce, then the response verifies (and consumes it)
    nonces.issue("client.example.com");
    let status = ac.authorize(
        "/x",
        Method::Post,
        ip("10.0.0.1"),
        "client.example.com",
        false,
        creds,
        &auth,
        &nonces,
    );
    assert_eq!(status, StatusKind::Ok);
    assert_eq!(nonces.take("client.example.com"), None);
}

#[test]
fn decisions_are_deterministic() {
    let ac = control();
    let auth = authenticator();
    let first = decide(
        &ac,
        "/admin/printers",
        ip("10.1.2.3"),
        "host.example.com",
        false,
        Credentials { username: Some("carol"), secret: Some("secret") },
        &auth,
    );
    for _ in 0..10 {
        let again = decide(
            &ac,
            "/admin/printers",
            ip("10.1.2.3"),
            "host.example.com",
            false,
            Credentials { username: Some("carol"), secret: Some("secret") },
            &auth,
        );
        assert_eq!(again, first);
    }
}
