// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Operation codes accepted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    PrintJob,
    ValidateJob,
    CreateJob,
    SendDocument,
    CancelJob,
    GetJobAttributes,
    GetJobs,
    GetPrinterAttributes,
    HoldJob,
    ReleaseJob,
    RestartJob,
    PausePrinter,
    ResumePrinter,
    PurgeJobs,
    SetJobAttributes,
    GetDefault,
    GetPrinters,
    GetClasses,
    AddPrinter,
    DeletePrinter,
    AddClass,
    DeleteClass,
    AcceptJobs,
    RejectJobs,
    SetDefault,
    GetDevices,
    GetPpds,
    MoveJob,
}

impl Operation {
    /// Private operations carry neither printer-uri nor job-uri.
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            Operation::GetDefault
                | Operation::GetPrinters
                | Operation::GetClasses
                | Operation::GetDevices
                | Operation::GetPpds
        )
    }

    /// Operations reserved for operators (admin group or root).
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Operation::PausePrinter
                | Operation::ResumePrinter
                | Operation::PurgeJobs
                | Operation::AddPrinter
                | Operation::DeletePrinter
                | Operation::AddClass
                | Operation::DeleteClass
                | Operation::AcceptJobs
                | Operation::RejectJobs
                | Operation::SetDefault
                | Operation::MoveJob
        )
    }

    /// Operations that materialize a new job entry.
    pub fn creates_job(&self) -> bool {
        matches!(self, Operation::PrintJob | Operation::CreateJob)
    }

    /// Operations addressed to an existing job rather than a destination.
    pub fn targets_job(&self) -> bool {
        matches!(
            self,
            Operation::SendDocument
                | Operation::CancelJob
                | Operation::GetJobAttributes
                | Operation::HoldJob
                | Operation::ReleaseJob
                | Operation::RestartJob
                | Operation::SetJobAttributes
                | Operation::MoveJob
        )
    }
}

pq_core::simple_display! {
    Operation {
        PrintJob => "print-job",
        ValidateJob => "validate-job",
        CreateJob => "create-job",
        SendDocument => "send-document",
        CancelJob => "cancel-job",
        GetJobAttributes => "get-job-attributes",
        GetJobs => "get-jobs",
        GetPrinterAttributes => "get-printer-attributes",
        HoldJob => "hold-job",
        ReleaseJob => "release-job",
        RestartJob => "restart-job",
        PausePrinter => "pause-printer",
        ResumePrinter => "resume-printer",
        PurgeJobs => "purge-jobs",
        SetJobAttributes => "set-job-attributes",
        GetDefault => "get-default",
        GetPrinters => "get-printers",
        GetClasses => "get-classes",
        AddPrinter => "add-printer",
        DeletePrinter => "delete-printer",
        AddClass => "add-class",
        DeleteClass => "delete-class",
        AcceptJobs => "accept-jobs",
        RejectJobs => "reject-jobs",
        SetDefault => "set-default",
        GetDevices => "get-devices",
        GetPpds => "get-ppds",
        MoveJob => "move-job",
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
