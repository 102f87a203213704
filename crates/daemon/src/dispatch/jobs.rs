// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job operations: submission, documents, lifecycle, queries.

use std::path::PathBuf;

use pq_core::{
    AttrValue, Clock, Destination, GroupTag, HoldUntil, JobState, StatusKind,
};
use pq_wire::{Request, Response};
use tracing::{debug, info};

use super::{check_owner, job_attrs, resolve_dest, resolve_job, HandlerResult};
use crate::jobs::JobStore;
use crate::persist::DirtyKind;
use crate::sched::Scheduler;

pub(super) fn print_job<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
    staged: Option<PathBuf>,
) -> HandlerResult {
    let dest = resolve_dest(sched, request)?.clone();
    submission_checks(sched, &dest, requester)?;
    let staged = staged.ok_or(StatusKind::BadRequest)?;

    let declared = request.attr_text("document-format");
    let format = sched.mime.detect(&staged, declared);
    check_format(sched, &format, &dest)?;

    let job_id = new_job(sched, request, requester, &dest)?;
    stage_document(sched, job_id, &staged, &format)?;
    release_job_for_scheduling(sched, job_id)?;

    let now = sched.now();
    sched.dirty.mark(DirtyKind::Jobs, now);
    info!(job_id, dest = %dest.name, requester, "print-job accepted");
    respond_with_job(sched, request, job_id)
}

pub(super) fn validate_job<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
) -> HandlerResult {
    let dest = resolve_dest(sched, request)?.clone();
    if !dest.accepting {
        return Err(StatusKind::NotAccepting);
    }
    if let Some(format) = request.attr_text("document-format") {
        check_format(sched, format, &dest)?;
    }
    Ok(Response::for_request(request, StatusKind::Ok))
}

pub(super) fn create_job<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    let dest = resolve_dest(sched, request)?.clone();
    submission_checks(sched, &dest, requester)?;

    let job_id = new_job(sched, request, requester, &dest)?;
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Jobs, now);
    info!(job_id, dest = %dest.name, requester, "create-job accepted");
    respond_with_job(sched, request, job_id)
}

pub(super) fn send_document<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
    staged: Option<PathBuf>,
) -> HandlerResult {
    let job = resolve_job(sched, request)?;
    check_owner(sched, job, requester)?;
    let job_id = job.id;
    if job.released || job.state.is_terminal() {
        return Err(StatusKind::NotPossible);
    }

    if let Some(staged) = staged {
        let declared = request.attr_text("document-format");
        let format = sched.mime.detect(&staged, declared);
        stage_document(sched, job_id, &staged, &format)?;
    }

    let last = request
        .attr("last-document")
        .and_then(AttrValue::as_bool)
        .unwrap_or(false);
    if last {
        release_job_for_scheduling(sched, job_id)?;
    }

    let now = sched.now();
    sched.dirty.mark(DirtyKind::Jobs, now);
    respond_with_job(sched, request, job_id)
}

pub(super) fn cancel_job<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    let job = resolve_job(sched, request)?;
    check_owner(sched, job, requester)?;
    let job_id = job.id;
    sched.cancel_job(job_id)?;
    info!(job_id, requester, "job cancelled");
    respond_with_job(sched, request, job_id)
}

pub(super) fn get_job_attributes<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
) -> HandlerResult {
    let job = resolve_job(sched, request)?;
    Ok(Response::for_request(request, StatusKind::Ok).with_group(GroupTag::Job, job_attrs(job)))
}

pub(super) fn get_jobs<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    let which_completed = match request.attr_text("which-jobs") {
        Some("completed") => true,
        Some("not-completed") | None => false,
        Some(_) => return Err(StatusKind::AttributesNotSupported),
    };
    let my_jobs = request
        .attr("my-jobs")
        .and_then(AttrValue::as_bool)
        .unwrap_or(false);
    let limit = request.attr_int("limit").unwrap_or(i64::MAX).max(0) as usize;
    let dest_filter = match request.printer_uri() {
        Some(_) => Some(resolve_dest(sched, request)?.name.clone()),
        None => None,
    };

    let mut response = Response::for_request(request, StatusKind::Ok);
    for job in sched.jobs.iter() {
        if job.state.is_terminal() != which_completed {
            continue;
        }
        if my_jobs && job.username != requester {
            continue;
        }
        if let Some(dest) = &dest_filter {
            if &job.dest != dest {
                continue;
            }
        }
        if response.groups.len() >= limit {
            break;
        }
        response.groups.push((GroupTag::Job, job_attrs(job)));
    }
    Ok(response)
}

pub(super) fn hold_job<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    let job = resolve_job(sched, request)?;
    check_owner(sched, job, requester)?;
    let job_id = job.id;

    let value = request.attr_text("job-hold-until").unwrap_or("indefinite");
    let hold: HoldUntil = value
        .parse()
        .map_err(|_| StatusKind::AttributesNotSupported)?;
    let until = hold.next_release(chrono::Local::now()).unwrap_or(u64::MAX);

    let job = sched.jobs.get_mut(job_id).ok_or(StatusKind::NotFound)?;
    job.hold(until).map_err(|_| StatusKind::NotPossible)?;
    job.attrs.set("job-hold-until", value);
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Jobs, now);
    respond_with_job(sched, request, job_id)
}

pub(super) fn release_job<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    let job = resolve_job(sched, request)?;
    check_owner(sched, job, requester)?;
    let job_id = job.id;

    let job = sched.jobs.get_mut(job_id).ok_or(StatusKind::NotFound)?;
    job.release().map_err(|_| StatusKind::NotPossible)?;
    job.attrs.remove("job-hold-until");
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Jobs, now);
    respond_with_job(sched, request, job_id)
}

pub(super) fn restart_job<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    let job = resolve_job(sched, request)?;
    check_owner(sched, job, requester)?;
    let job_id = job.id;

    // Without the spool files there is nothing to print again
    if job.files.is_empty() || !job.files.iter().all(|f| f.path.exists()) {
        return Err(StatusKind::NotPossible);
    }

    let job = sched.jobs.get_mut(job_id).ok_or(StatusKind::NotFound)?;
    job.restart().map_err(|_| StatusKind::NotPossible)?;
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Jobs, now);
    respond_with_job(sched, request, job_id)
}

pub(super) fn set_job_attributes<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    let job = resolve_job(sched, request)?;
    check_owner(sched, job, requester)?;
    let job_id = job.id;
    let state = job.state;
    if !matches!(state, JobState::Pending | JobState::Held | JobState::Processing) {
        return Err(StatusKind::NotPossible);
    }
    let Some(group) = request.group(GroupTag::Job).cloned() else {
        return respond_with_job(sched, request, job_id);
    };

    for (name, value) in group.iter() {
        match name {
            "job-priority" => {
                if state == JobState::Processing {
                    return Err(StatusKind::NotPossible);
                }
                let priority = value.as_int().ok_or(StatusKind::AttributesNotSupported)?;
                if !(1..=100).contains(&priority) {
                    return Err(StatusKind::AttributesNotSupported);
                }
                if let Some(job) = sched.jobs.get_mut(job_id) {
                    job.priority = priority as u8;
                }
            }
            "job-hold-until" => {
                if value.is_delete() {
                    if let Some(job) = sched.jobs.get_mut(job_id) {
                        let _ = job.release();
                        job.attrs.remove("job-hold-until");
                    }
                    continue;
                }
                let text = value.as_text().ok_or(StatusKind::AttributesNotSupported)?;
                let hold: HoldUntil =
                    text.parse().map_err(|_| StatusKind::AttributesNotSupported)?;
                let until = hold.next_release(chrono::Local::now()).unwrap_or(u64::MAX);
                if let Some(job) = sched.jobs.get_mut(job_id) {
                    job.hold(until).map_err(|_| StatusKind::NotPossible)?;
                    job.attrs.set("job-hold-until", text);
                }
            }
            _ => {
                if let Some(job) = sched.jobs.get_mut(job_id) {
                    if value.is_delete() {
                        job.attrs.remove(name);
                    } else {
                        job.attrs.set(name, value.clone());
                    }
                }
            }
        }
    }

    let now = sched.now();
    sched.dirty.mark(DirtyKind::Jobs, now);
    respond_with_job(sched, request, job_id)
}

pub(super) fn move_job<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    let job = resolve_job(sched, request)?;
    check_owner(sched, job, requester)?;
    let job_id = job.id;
    if job.state.is_terminal() || job.state == JobState::Processing {
        return Err(StatusKind::NotPossible);
    }

    let target_uri = request
        .attr_text("job-printer-uri")
        .ok_or(StatusKind::BadRequest)?;
    let resource = super::strip_authority(target_uri);
    let target = sched
        .registry
        .find_by_uri_suffix(resource)
        .or_else(|| sched.registry.find(resource.trim_start_matches('/')))
        .ok_or(StatusKind::NotFound)?;
    let (target_name, target_kind) = (target.name.clone(), target.kind);

    if let Some(job) = sched.jobs.get_mut(job_id) {
        job.dest = target_name.clone();
        job.dest_kind = target_kind;
        job.assigned_to = None;
    }
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Jobs, now);
    info!(job_id, target = %target_name, requester, "job moved");
    respond_with_job(sched, request, job_id)
}

// ----------------------------------------------------------------------
// Submission plumbing
// ----------------------------------------------------------------------

fn submission_checks<C: Clock>(
    sched: &Scheduler<C>,
    dest: &Destination,
    requester: &str,
) -> Result<(), StatusKind> {
    if !dest.accepting {
        return Err(StatusKind::NotAccepting);
    }
    let active_total = sched.jobs.active().count();
    if sched.config.max_jobs > 0 && active_total >= sched.config.max_jobs {
        return Err(StatusKind::NotPossible);
    }
    if sched.config.max_jobs_per_user > 0
        && sched.jobs.active_count_for_user(requester) >= sched.config.max_jobs_per_user
    {
        return Err(StatusKind::NotPossible);
    }
    if sched.config.max_jobs_per_printer > 0
        && sched.jobs.active_count_for_dest(&dest.name) >= sched.config.max_jobs_per_printer
    {
        return Err(StatusKind::NotPossible);
    }
    Ok(())
}

fn check_format<C: Clock>(
    sched: &Scheduler<C>,
    format: &str,
    dest: &Destination,
) -> Result<(), StatusKind> {
    if sched.mime.chain(format, &dest.native_type).is_none() {
        debug!(format, native = %dest.native_type, "unsupported document format");
        return Err(StatusKind::DocumentFormatNotSupported);
    }
    Ok(())
}

/// Create the job entry with priority, title, attributes, hold state,
/// and the start banner.
fn new_job<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
    dest: &Destination,
) -> Result<u32, StatusKind> {
    let now = sched.now();

    let priority = match request.attr_int("job-priority") {
        Some(p) if (1..=100).contains(&p) => p as u8,
        Some(_) => return Err(StatusKind::AttributesNotSupported),
        None => 50,
    };
    let hold_text = request.attr_text("job-hold-until").map(str::to_string);
    let hold = match &hold_text {
        Some(text) => Some(
            text.parse::<HoldUntil>()
                .map_err(|_| StatusKind::AttributesNotSupported)?,
        ),
        None => None,
    };
    let sheets = job_sheets(request, dest);

    let job = sched.jobs.create(requester, &dest.name, dest.kind, now);
    let job_id = job.id;
    job.priority = priority;
    job.title = request
        .attr_text("job-name")
        .unwrap_or("untitled")
        .to_string();
    if let Some(group) = request.group(GroupTag::Job) {
        job.attrs.apply(group);
    }
    job.attrs.set(
        "job-sheets",
        AttrValue::List(vec![sheets.0.clone(), sheets.1.clone()]),
    );
    if let Some(text) = &hold_text {
        job.attrs.set("job-hold-until", text.as_str());
    }

    if let Some(hold) = hold {
        if let Some(until) = hold.next_release(chrono::Local::now()) {
            let job = sched.jobs.get_mut(job_id).ok_or(StatusKind::Internal)?;
            job.hold(until).map_err(|_| StatusKind::Internal)?;
        }
    }

    // Start banner joins the file list ahead of the documents
    if sheets.0 != "none" {
        add_banner(sched, job_id, &sheets.0)?;
    }
    Ok(job_id)
}

/// The (start, end) job-sheets for a submission.
fn job_sheets(request: &Request, dest: &Destination) -> (String, String) {
    match request.attr("job-sheets") {
        Some(AttrValue::List(items)) => {
            let start = items.first().cloned().unwrap_or_else(|| "none".to_string());
            let end = items.get(1).cloned().unwrap_or_else(|| "none".to_string());
            (start, end)
        }
        Some(AttrValue::Text(s)) => (s.clone(), "none".to_string()),
        _ => dest.job_sheets.clone(),
    }
}

fn add_banner<C: Clock>(
    sched: &mut Scheduler<C>,
    job_id: u32,
    banner: &str,
) -> Result<(), StatusKind> {
    let job = sched.jobs.get(job_id).ok_or(StatusKind::Internal)?.clone();
    let n = job.files.len() + 1;
    let out = JobStore::data_path(&sched.config.request_root, job_id, n);
    let file = sched
        .banners
        .render(banner, &job, &out)
        .map_err(|_| StatusKind::AttributesNotSupported)?;
    let job = sched.jobs.get_mut(job_id).ok_or(StatusKind::Internal)?;
    job.add_file(file).map_err(|_| StatusKind::NotPossible)?;
    Ok(())
}

/// Move a staged body into its spool slot and append it to the job.
fn stage_document<C: Clock>(
    sched: &mut Scheduler<C>,
    job_id: u32,
    staged: &PathBuf,
    format: &str,
) -> Result<(), StatusKind> {
    let n = sched
        .jobs
        .get(job_id)
        .ok_or(StatusKind::NotFound)?
        .files
        .len()
        + 1;
    let dest_path = JobStore::data_path(&sched.config.request_root, job_id, n);
    std::fs::rename(staged, &dest_path).map_err(|_| StatusKind::Internal)?;
    let job = sched.jobs.get_mut(job_id).ok_or(StatusKind::NotFound)?;
    job.add_file(pq_core::SpoolFile { path: dest_path, mime_type: format.to_string() })
        .map_err(|_| StatusKind::NotPossible)?;
    Ok(())
}

/// Last document seen: append the end banner and open the job to
/// scheduling.
fn release_job_for_scheduling<C: Clock>(
    sched: &mut Scheduler<C>,
    job_id: u32,
) -> Result<(), StatusKind> {
    let end_sheet = sched
        .jobs
        .get(job_id)
        .and_then(|j| j.attrs.get("job-sheets").cloned())
        .and_then(|v| match v {
            AttrValue::List(items) => items.get(1).cloned(),
            _ => None,
        })
        .unwrap_or_else(|| "none".to_string());
    if end_sheet != "none" {
        add_banner(sched, job_id, &end_sheet)?;
    }
    let job = sched.jobs.get_mut(job_id).ok_or(StatusKind::NotFound)?;
    job.released = true;
    Ok(())
}

fn respond_with_job<C: Clock>(
    sched: &Scheduler<C>,
    request: &Request,
    job_id: u32,
) -> HandlerResult {
    let job = sched.jobs.get(job_id).ok_or(StatusKind::NotFound)?;
    Ok(Response::for_request(request, StatusKind::Ok).with_group(GroupTag::Job, job_attrs(job)))
}
