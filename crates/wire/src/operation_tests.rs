// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    get_default = { Operation::GetDefault },
    get_printers = { Operation::GetPrinters },
    get_classes = { Operation::GetClasses },
    get_devices = { Operation::GetDevices },
    get_ppds = { Operation::GetPpds },
)]
fn private_ops_need_no_uri(op: Operation) {
    assert!(op.is_private());
}

#[test]
fn job_ops_are_not_private() {
    assert!(!Operation::PrintJob.is_private());
    assert!(!Operation::CancelJob.is_private());
}

#[parameterized(
    pause = { Operation::PausePrinter },
    resume = { Operation::ResumePrinter },
    purge = { Operation::PurgeJobs },
    add_printer = { Operation::AddPrinter },
    delete_class = { Operation::DeleteClass },
    set_default = { Operation::SetDefault },
    move_job = { Operation::MoveJob },
)]
fn admin_ops(op: Operation) {
    assert!(op.is_admin());
}

#[test]
fn user_ops_are_not_admin() {
    assert!(!Operation::PrintJob.is_admin());
    assert!(!Operation::CancelJob.is_admin());
    assert!(!Operation::HoldJob.is_admin());
}

#[test]
fn job_creating_ops() {
    assert!(Operation::PrintJob.creates_job());
    assert!(Operation::CreateJob.creates_job());
    assert!(!Operation::SendDocument.creates_job());
}

#[test]
fn serde_kebab_case() {
    let json = serde_json::to_string(&Operation::GetPrinterAttributes).unwrap();
    assert_eq!(json, "\"get-printer-attributes\"");
    let parsed: Operation = serde_json::from_str("\"send-document\"").unwrap();
    assert_eq!(parsed, Operation::SendDocument);
}

#[test]
fn display_matches_serde() {
    assert_eq!(Operation::ReleaseJob.to_string(), "release-job");
}
