// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn no_sandbox_is_a_noop() {
    let provider = NoSandbox;
    assert_eq!(provider.generate(true), None);
    assert_eq!(provider.generate(false), None);
}

#[test]
fn describe_reports_absence() {
    assert!(describe(&NoSandbox).contains("disabled"));
}

#[test]
fn custom_provider_round_trips() {
    struct Fixed;
    impl SandboxProfile for Fixed {
        fn generate(&self, root_in_use: bool) -> Option<String> {
            root_in_use.then(|| "(deny default)".to_string())
        }
    }
    let provider = Fixed;
    assert_eq!(provider.generate(true).as_deref(), Some("(deny default)"));
    assert_eq!(provider.generate(false), None);
    provider.release("(deny default)".to_string());
}
