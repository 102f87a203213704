// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator operations: printer/class administration.

use pq_core::{AttrValue, Clock, StatusKind};
use pq_wire::{Request, Response};
use tracing::info;

use super::{check_operator, resolve_dest, strip_authority, HandlerResult};
use crate::persist::DirtyKind;
use crate::registry::DestSettings;
use crate::sched::Scheduler;

pub(super) fn pause_printer<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    check_operator(sched, requester)?;
    let name = resolve_dest(sched, request)?.name.clone();
    let reason = request
        .attr_text("printer-state-message")
        .unwrap_or("Paused")
        .to_string();
    sched
        .registry
        .with_dest(&name, |d| d.stop(reason))
        .map_err(|e| StatusKind::from(&e))?;
    mark_dest_dirty(sched, &name);
    info!(printer = %name, requester, "printer paused");
    Ok(Response::for_request(request, StatusKind::Ok))
}

pub(super) fn resume_printer<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    check_operator(sched, requester)?;
    let name = resolve_dest(sched, request)?.name.clone();
    sched
        .registry
        .with_dest(&name, |d| d.resume())
        .map_err(|e| StatusKind::from(&e))?;
    mark_dest_dirty(sched, &name);
    info!(printer = %name, requester, "printer resumed");
    Ok(Response::for_request(request, StatusKind::Ok))
}

pub(super) fn accept_jobs<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    set_accepting(sched, request, requester, true)
}

pub(super) fn reject_jobs<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    set_accepting(sched, request, requester, false)
}

fn set_accepting<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
    accepting: bool,
) -> HandlerResult {
    check_operator(sched, requester)?;
    let name = resolve_dest(sched, request)?.name.clone();
    sched
        .registry
        .with_dest(&name, |d| {
            d.accepting = accepting;
            if !accepting {
                d.state_message = request
                    .attr_text("printer-state-message")
                    .unwrap_or("Rejecting Jobs")
                    .to_string();
            }
        })
        .map_err(|e| StatusKind::from(&e))?;
    mark_dest_dirty(sched, &name);
    Ok(Response::for_request(request, StatusKind::Ok))
}

pub(super) fn add_printer<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    check_operator(sched, requester)?;
    let name = dest_name_from_uri(request, "/printers/")?;
    let settings = settings_from_request(request);
    sched
        .registry
        .add_printer(&name, &settings)
        .map_err(|e| StatusKind::from(&e))?;
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Printers, now);
    info!(printer = %name, requester, "printer added or modified");
    Ok(Response::for_request(request, StatusKind::Ok))
}

pub(super) fn delete_printer<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    check_operator(sched, requester)?;
    let name = resolve_dest(sched, request)?.name.clone();
    cancel_jobs_for(sched, &name);
    sched
        .registry
        .delete(&name)
        .map_err(|e| StatusKind::from(&e))?;
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Printers, now);
    sched.dirty.mark(DirtyKind::Classes, now);
    info!(printer = %name, requester, "printer deleted");
    Ok(Response::for_request(request, StatusKind::Ok))
}

pub(super) fn add_class<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    check_operator(sched, requester)?;
    let name = dest_name_from_uri(request, "/classes/")?;
    let members = match request.attr("member-uris") {
        Some(AttrValue::List(uris)) => uris.clone(),
        Some(AttrValue::Text(uri)) => vec![uri.clone()],
        None => Vec::new(),
        Some(_) => return Err(StatusKind::BadRequest),
    };
    let members: Vec<String> = members
        .iter()
        .map(|u| strip_authority(u).to_string())
        .collect();
    let settings = settings_from_request(request);
    sched
        .registry
        .add_class(&name, &members, &settings)
        .map_err(|e| StatusKind::from(&e))?;
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Classes, now);
    info!(class = %name, requester, "class added or modified");
    Ok(Response::for_request(request, StatusKind::Ok))
}

pub(super) fn delete_class<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    check_operator(sched, requester)?;
    let name = resolve_dest(sched, request)?.name.clone();
    cancel_jobs_for(sched, &name);
    sched
        .registry
        .delete(&name)
        .map_err(|e| StatusKind::from(&e))?;
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Classes, now);
    info!(class = %name, requester, "class deleted");
    Ok(Response::for_request(request, StatusKind::Ok))
}

pub(super) fn set_default<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    check_operator(sched, requester)?;
    let name = resolve_dest(sched, request)?.name.clone();
    sched
        .registry
        .set_default(&name)
        .map_err(|e| StatusKind::from(&e))?;
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Printers, now);
    sched.dirty.mark(DirtyKind::Classes, now);
    info!(dest = %name, requester, "default destination set");
    Ok(Response::for_request(request, StatusKind::Ok))
}

pub(super) fn purge_jobs<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
    requester: &str,
) -> HandlerResult {
    check_operator(sched, requester)?;
    let dest_filter = match request.printer_uri() {
        Some(_) => Some(resolve_dest(sched, request)?.name.clone()),
        None => None,
    };

    let targets: Vec<u32> = sched
        .jobs
        .iter()
        .filter(|j| dest_filter.as_deref().is_none_or(|d| j.dest == d))
        .map(|j| j.id)
        .collect();
    for job_id in &targets {
        let _ = sched.cancel_job(*job_id);
        if let Some(job) = sched.jobs.remove(*job_id) {
            crate::jobs::unlink_files(&job);
        }
    }
    let now = sched.now();
    sched.dirty.mark(DirtyKind::Jobs, now);
    info!(count = targets.len(), requester, "jobs purged");
    Ok(Response::for_request(request, StatusKind::Ok))
}

// ----------------------------------------------------------------------

/// Cancel every active job targeting a destination about to vanish.
fn cancel_jobs_for<C: Clock>(sched: &mut Scheduler<C>, dest: &str) {
    let targets: Vec<u32> = sched
        .jobs
        .active()
        .filter(|j| j.dest == dest)
        .map(|j| j.id)
        .collect();
    for job_id in targets {
        let _ = sched.cancel_job(job_id);
    }
}

/// New-destination names come from the URI, not from a lookup.
fn dest_name_from_uri(request: &Request, prefix: &str) -> Result<String, StatusKind> {
    let uri = request.printer_uri().ok_or(StatusKind::BadRequest)?;
    let resource = strip_authority(uri);
    let name = resource
        .strip_prefix(prefix)
        .filter(|n| !n.is_empty() && !n.contains('/'))
        .ok_or(StatusKind::BadRequest)?;
    Ok(name.to_string())
}

fn settings_from_request(request: &Request) -> DestSettings {
    DestSettings {
        device_uri: request.attr_text("device-uri").map(str::to_string),
        info: request.attr_text("printer-info").map(str::to_string),
        location: request.attr_text("printer-location").map(str::to_string),
        make_model: request
            .attr_text("printer-make-and-model")
            .map(str::to_string),
        native_type: request
            .attr_text("document-format-default")
            .map(str::to_string),
        job_sheets: match request.attr("job-sheets-default") {
            Some(AttrValue::List(items)) => Some((
                items.first().cloned().unwrap_or_else(|| "none".to_string()),
                items.get(1).cloned().unwrap_or_else(|| "none".to_string()),
            )),
            _ => None,
        },
    }
}

fn mark_dest_dirty<C: Clock>(sched: &mut Scheduler<C>, name: &str) {
    let now = sched.now();
    let is_class = sched.registry.find(name).is_some_and(|d| d.is_class());
    if is_class {
        sched.dirty.mark(DirtyKind::Classes, now);
    } else {
        sched.dirty.mark(DirtyKind::Printers, now);
    }
}
