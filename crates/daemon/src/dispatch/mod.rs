// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatch: validation wrapper, operation routing, and the
//! per-operation authorization sub-checks.
//!
//! Handlers return `Result<Response, StatusKind>`; the wrapper turns
//! either into a response whose operation group carries the request's
//! charset and natural language plus a status message.

mod admin;
mod jobs;
mod printers;

use std::path::PathBuf;

use pq_core::{AttrBag, Clock, GroupTag, Job, JobState, StatusKind};
use pq_wire::{Operation, Request, Response};
use tracing::debug;

use crate::config::ServerConfig;
use crate::sched::Scheduler;

type HandlerResult = Result<Response, StatusKind>;

/// Validate and route one authorized request.
pub fn dispatch<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    staged: Option<PathBuf>,
) -> Response {
    if let Err(kind) = validate(request) {
        if let Some(path) = &staged {
            let _ = std::fs::remove_file(path);
        }
        return plain_response(request, kind, &sched.config);
    }

    let requester = requester(request);
    debug!(op = %request.operation, request_id = request.request_id, %requester, "dispatching");

    let result = match request.operation {
        Operation::PrintJob => jobs::print_job(sched, request, &requester, staged.clone()),
        Operation::ValidateJob => jobs::validate_job(sched, request),
        Operation::CreateJob => jobs::create_job(sched, request, &requester),
        Operation::SendDocument => jobs::send_document(sched, request, &requester, staged.clone()),
        Operation::CancelJob => jobs::cancel_job(sched, request, &requester),
        Operation::GetJobAttributes => jobs::get_job_attributes(sched, request),
        Operation::GetJobs => jobs::get_jobs(sched, request, &requester),
        Operation::HoldJob => jobs::hold_job(sched, request, &requester),
        Operation::ReleaseJob => jobs::release_job(sched, request, &requester),
        Operation::RestartJob => jobs::restart_job(sched, request, &requester),
        Operation::SetJobAttributes => jobs::set_job_attributes(sched, request, &requester),
        Operation::MoveJob => jobs::move_job(sched, request, &requester),
        Operation::GetPrinterAttributes => printers::get_printer_attributes(sched, request),
        Operation::GetPrinters => printers::get_printers(sched, request),
        Operation::GetClasses => printers::get_classes(sched, request),
        Operation::GetDefault => printers::get_default(sched, request),
        Operation::GetDevices => printers::get_devices(sched, request),
        Operation::GetPpds => printers::get_ppds(sched, request),
        Operation::PausePrinter => admin::pause_printer(sched, request, &requester),
        Operation::ResumePrinter => admin::resume_printer(sched, request, &requester),
        Operation::AcceptJobs => admin::accept_jobs(sched, request, &requester),
        Operation::RejectJobs => admin::reject_jobs(sched, request, &requester),
        Operation::AddPrinter => admin::add_printer(sched, request, &requester),
        Operation::DeletePrinter => admin::delete_printer(sched, request, &requester),
        Operation::AddClass => admin::add_class(sched, request, &requester),
        Operation::DeleteClass => admin::delete_class(sched, request, &requester),
        Operation::SetDefault => admin::set_default(sched, request, &requester),
        Operation::PurgeJobs => admin::purge_jobs(sched, request, &requester),
    };

    match result {
        Ok(mut response) => {
            fill_operation_group(&mut response, request, &sched.config);
            response
        }
        Err(kind) => {
            if let Some(path) = &staged {
                let _ = std::fs::remove_file(path);
            }
            plain_response(request, kind, &sched.config)
        }
    }
}

/// Required-attribute validation per the dispatcher contract.
fn validate(request: &Request) -> Result<(), StatusKind> {
    if request.version.0 != 1 {
        return Err(StatusKind::BadRequest);
    }
    if request.charset().is_none() || request.natural_language().is_none() {
        return Err(StatusKind::BadRequest);
    }
    if !request.groups_ordered() {
        return Err(StatusKind::BadRequest);
    }
    if request.operation.is_private() {
        return Ok(());
    }
    // Job-creating operations address a destination; job operations may
    // also come in as printer-uri plus job-id.
    if request.operation.creates_job() {
        if request.printer_uri().is_none() {
            return Err(StatusKind::BadRequest);
        }
    } else if request.operation.targets_job() {
        if request.job_id().is_none() && request.printer_uri().is_none() {
            return Err(StatusKind::BadRequest);
        }
    } else if request.printer_uri().is_none() && request.job_uri().is_none() {
        return Err(StatusKind::BadRequest);
    }
    Ok(())
}

/// The username an operation is attributed to.
fn requester(request: &Request) -> String {
    request
        .username
        .clone()
        .or_else(|| request.attr_text("requesting-user-name").map(str::to_string))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// A bare response carrying only the operation group.
pub fn plain_response(request: &Request, status: StatusKind, config: &ServerConfig) -> Response {
    let mut response = Response::for_request(request, status);
    fill_operation_group(&mut response, request, config);
    response
}

/// Ensure the first group is an operation group with charset, language,
/// and a status message.
fn fill_operation_group(response: &mut Response, request: &Request, config: &ServerConfig) {
    let charset = request
        .charset()
        .unwrap_or(config.default_charset.as_str())
        .to_string();
    let language = request
        .natural_language()
        .unwrap_or(config.default_language.as_str())
        .to_string();
    let status = response.status;

    let has_op_group = matches!(response.groups.first(), Some((GroupTag::Operation, _)));
    if !has_op_group {
        response.groups.insert(0, (GroupTag::Operation, AttrBag::new()));
    }
    if let Some((_, bag)) = response.groups.first_mut() {
        bag.set("attributes-charset", charset);
        bag.set("attributes-natural-language", language);
        if !bag.contains("status-message") {
            bag.set("status-message", status.to_string());
        }
    }
}

// ----------------------------------------------------------------------
// Shared handler helpers
// ----------------------------------------------------------------------

/// Resolve the destination a request addresses.
fn resolve_dest<'a, C: Clock>(
    sched: &'a Scheduler<C>,
    request: &Request,
) -> Result<&'a pq_core::Destination, StatusKind> {
    let uri = request.printer_uri().ok_or(StatusKind::BadRequest)?;
    let resource = strip_authority(uri);
    sched
        .registry
        .find_by_uri_suffix(resource)
        .or_else(|| sched.registry.find(resource.trim_start_matches('/')))
        .ok_or(StatusKind::NotFound)
}

/// Drop a `scheme://host` prefix, leaving the resource path.
fn strip_authority(uri: &str) -> &str {
    match uri.find("://") {
        Some(idx) => {
            let rest = &uri[idx + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash..],
                None => "/",
            }
        }
        None => uri,
    }
}

fn resolve_job<'a, C: Clock>(
    sched: &'a Scheduler<C>,
    request: &Request,
) -> Result<&'a Job, StatusKind> {
    let id = request.job_id().ok_or(StatusKind::BadRequest)?;
    sched.jobs.get(id).ok_or(StatusKind::NotFound)
}

/// Whether the requester may administer the scheduler.
fn is_operator<C: Clock>(sched: &Scheduler<C>, requester: &str) -> bool {
    requester == "root" || sched.auth.in_group(requester, &sched.config.system_group)
}

/// Owner, operator, or root; everyone else is forbidden.
fn check_owner<C: Clock>(
    sched: &Scheduler<C>,
    job: &Job,
    requester: &str,
) -> Result<(), StatusKind> {
    if job.username == requester || is_operator(sched, requester) {
        Ok(())
    } else {
        Err(StatusKind::Forbidden)
    }
}

fn check_operator<C: Clock>(sched: &Scheduler<C>, requester: &str) -> Result<(), StatusKind> {
    if is_operator(sched, requester) {
        Ok(())
    } else {
        Err(StatusKind::Forbidden)
    }
}

/// The response attribute group for one job.
fn job_attrs(job: &Job) -> AttrBag {
    let mut bag = AttrBag::new();
    bag.set("job-id", i64::from(job.id));
    bag.set("job-uri", format!("/jobs/{}", job.id));
    bag.set("job-state", job.state.to_string());
    bag.set("job-state-reasons", pq_core::AttrValue::List(job_state_reasons(job)));
    if !job.state_message.is_empty() {
        bag.set("job-state-message", job.state_message.as_str());
    }
    bag.set("job-name", job.title.as_str());
    bag.set("job-originating-user-name", job.username.as_str());
    bag.set("job-printer-uri", job.dest.as_str());
    bag.set("job-priority", i64::from(job.priority));
    bag.set("job-media-sheets-completed", i64::from(job.sheets_completed));
    bag.set("number-of-documents", job.files.len() as i64);
    bag.set("time-at-creation", job.created_at as i64);
    if let Some(t) = job.processing_at {
        bag.set("time-at-processing", t as i64);
    }
    if let Some(t) = job.completed_at {
        bag.set("time-at-completed", t as i64);
    }
    if let Some(hold) = job.hold_until {
        if hold == u64::MAX {
            bag.set("job-hold-until", "indefinite");
        } else {
            bag.set("job-hold-until", hold as i64);
        }
    }
    // Echo the stored attribute bag
    for (name, value) in job.attrs.iter() {
        if !bag.contains(name) {
            bag.set(name, value.clone());
        }
    }
    bag
}

fn job_state_reasons(job: &Job) -> Vec<String> {
    let reason = match job.state {
        JobState::Pending => "none",
        JobState::Held => "job-hold-until-specified",
        JobState::Processing => "job-printing",
        JobState::Stopped => "job-stopped",
        JobState::Cancelled => "job-canceled-by-user",
        JobState::Aborted => "aborted-by-system",
        JobState::Completed => "job-completed-successfully",
    };
    vec![reason.to_string()]
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
