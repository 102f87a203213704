// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Destination queries.

use pq_core::{Clock, GroupTag, StatusKind};
use pq_wire::{Request, Response};

use super::{resolve_dest, HandlerResult};
use crate::sched::Scheduler;

pub(super) fn get_printer_attributes<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
) -> HandlerResult {
    let dest = resolve_dest(sched, request)?;
    Ok(Response::for_request(request, StatusKind::Ok)
        .with_group(GroupTag::Printer, dest.attr_cache.clone()))
}

pub(super) fn get_printers<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
) -> HandlerResult {
    list_destinations(sched, request, false)
}

pub(super) fn get_classes<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
) -> HandlerResult {
    list_destinations(sched, request, true)
}

fn list_destinations<C: Clock>(
    sched: &Scheduler<C>,
    request: &Request,
    classes: bool,
) -> HandlerResult {
    let limit = request.attr_int("limit").unwrap_or(i64::MAX).max(0) as usize;
    let mut dests: Vec<_> = sched
        .registry
        .iter()
        .filter(|d| d.is_class() == classes)
        .collect();
    dests.sort_by(|a, b| a.name.cmp(&b.name));

    let mut response = Response::for_request(request, StatusKind::Ok);
    for dest in dests.into_iter().take(limit) {
        response
            .groups
            .push((GroupTag::Printer, dest.attr_cache.clone()));
    }
    Ok(response)
}

pub(super) fn get_default<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
) -> HandlerResult {
    let dest = sched.registry.default_dest().ok_or(StatusKind::NotFound)?;
    Ok(Response::for_request(request, StatusKind::Ok)
        .with_group(GroupTag::Printer, dest.attr_cache.clone()))
}

pub(super) fn get_devices<C: Clock>(
    sched: &mut Scheduler<C>,
    request: &Request,
) -> HandlerResult {
    let mut response = Response::for_request(request, StatusKind::Ok);
    for device in sched.devices.devices() {
        response.groups.push((GroupTag::Printer, device));
    }
    Ok(response)
}

pub(super) fn get_ppds<C: Clock>(sched: &mut Scheduler<C>, request: &Request) -> HandlerResult {
    let mut response = Response::for_request(request, StatusKind::Ok);
    for ppd in sched.devices.ppds() {
        response.groups.push((GroupTag::Printer, ppd));
    }
    Ok(response)
}
