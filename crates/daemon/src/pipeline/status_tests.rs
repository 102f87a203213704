// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    emerg = { "EMERG: power failure", StatusLevel::Emerg, "power failure" },
    alert = { "ALERT: head crash", StatusLevel::Alert, "head crash" },
    crit = { "CRIT: fuser over temperature", StatusLevel::Crit, "fuser over temperature" },
    error = { "ERROR: no toner", StatusLevel::Error, "no toner" },
    warning = { "WARNING: low toner", StatusLevel::Warning, "low toner" },
    notice = { "NOTICE: tray refilled", StatusLevel::Notice, "tray refilled" },
    info = { "INFO: printing page 3", StatusLevel::Info, "printing page 3" },
    debug = { "DEBUG: wrote 4096 bytes", StatusLevel::Debug, "wrote 4096 bytes" },
    debug2 = { "DEBUG2: raster line 220", StatusLevel::Debug2, "raster line 220" },
    page = { "PAGE: 1 2", StatusLevel::Page, "1 2" },
    state = { "STATE: +media-empty", StatusLevel::State, "+media-empty" },
    attr = { "ATTR: printer-info=Lobby", StatusLevel::Attr, "printer-info=Lobby" },
    ppd = { "PPD: refresh", StatusLevel::Ppd, "refresh" },
)]
fn classify_prefixes(line: &str, level: StatusLevel, payload: &str) {
    assert_eq!(classify(line), (level, payload));
}

#[test]
fn unprefixed_line_defaults_to_debug() {
    assert_eq!(classify("something odd"), (StatusLevel::Debug, "something odd"));
}

#[test]
fn debug2_not_swallowed_by_debug() {
    let (level, _) = classify("DEBUG2: x");
    assert_eq!(level, StatusLevel::Debug2);
}

#[parameterized(
    page_and_copies = { "3 2", 2 },
    total = { "total 7", 7 },
    bare_page = { "5", 1 },
    garbage = { "", 1 },
    bad_copies = { "3 lots", 1 },
)]
fn page_counts(payload: &str, expected: u32) {
    assert_eq!(page_count(payload), expected);
}

#[test]
fn state_add_remove_replace() {
    assert_eq!(
        state_change("+media-empty,cover-open"),
        StateChange::Add(vec!["media-empty".into(), "cover-open".into()])
    );
    assert_eq!(
        state_change("-media-empty"),
        StateChange::Remove(vec!["media-empty".into()])
    );
    assert_eq!(
        state_change("toner-low media-jam"),
        StateChange::Replace(vec!["toner-low".into(), "media-jam".into()])
    );
    assert_eq!(state_change(""), StateChange::Replace(vec![]));
}

#[test]
fn attr_pairs_with_quotes() {
    let pairs = attr_pairs("printer-info=\"Front Lobby\" printer-location=2F");
    assert_eq!(
        pairs,
        vec![
            ("printer-info".to_string(), "Front Lobby".to_string()),
            ("printer-location".to_string(), "2F".to_string()),
        ]
    );
}

#[test]
fn attr_pairs_unterminated_quote() {
    let pairs = attr_pairs("printer-info=\"half open");
    assert_eq!(pairs, vec![("printer-info".to_string(), "half open".to_string())]);
}

#[test]
fn accounting_levels_always_pass_filtering() {
    assert_eq!(StatusLevel::Page.log_level(), crate::config::LogLevel::None);
    assert_eq!(StatusLevel::State.log_level(), crate::config::LogLevel::None);
}
