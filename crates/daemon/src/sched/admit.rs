// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The admission pass: pick runnable jobs and hand them to printers.

use pq_core::Clock;
use tracing::debug;

use super::Scheduler;
use crate::mime::chain_cost;
use crate::persist::DirtyKind;

impl<C: Clock> Scheduler<C> {
    /// One admission pass.
    ///
    /// Candidates come priority-then-id ordered; each is matched to an
    /// idle accepting printer (for classes, an idle accepting member not
    /// already printing). Per-user and per-printer caps and the
    /// FilterLimit deferral apply here.
    pub fn admit(&mut self) {
        let now = self.now();
        for job_id in self.jobs.pending_candidates(now) {
            let Some(job) = self.jobs.get(job_id) else {
                continue;
            };
            let username = job.username.clone();
            let dest_name = job.dest.clone();

            if self.config.max_jobs_per_user > 0 {
                let running = self
                    .jobs
                    .processing()
                    .filter(|j| j.username == username)
                    .count();
                if running >= self.config.max_jobs_per_user {
                    debug!(job_id, %username, "user at MaxJobsPerUser; skipping");
                    continue;
                }
            }
            if self.config.max_jobs_per_printer > 0 {
                let running = self
                    .jobs
                    .processing()
                    .filter(|j| j.dest == dest_name)
                    .count();
                if running >= self.config.max_jobs_per_printer {
                    debug!(job_id, dest = %dest_name, "destination at MaxJobsPerPrinter; skipping");
                    continue;
                }
            }

            let Some(dest) = self.registry.find(&dest_name) else {
                debug!(job_id, dest = %dest_name, "destination vanished; job stays pending");
                continue;
            };

            let printer_name = if dest.is_class() {
                if !dest.accepting {
                    continue;
                }
                let class = dest.clone();
                let member = self
                    .registry
                    .members_of(&class)
                    .into_iter()
                    .find(|m| {
                        !m.is_class()
                            && m.is_available()
                            && m.device_uri.is_some()
                            && !self.jobs.printer_busy(&m.name)
                            && !self.jobs.class_member_busy(&dest_name, &m.name)
                    })
                    .map(|m| m.name.clone());
                match member {
                    Some(name) => name,
                    None => continue,
                }
            } else {
                if !dest.is_available() || self.jobs.printer_busy(&dest_name) {
                    continue;
                }
                if dest.device_uri.is_none() {
                    debug!(job_id, dest = %dest_name, "no device URI; job stays pending");
                    continue;
                }
                dest_name.clone()
            };

            let (src, native) = {
                let Some(job) = self.jobs.get(job_id) else {
                    continue;
                };
                let Some(file) = job.files.first() else {
                    continue;
                };
                let Some(printer) = self.registry.find(&printer_name) else {
                    continue;
                };
                (file.mime_type.clone(), printer.native_type.clone())
            };

            let Some(chain) = self.mime.chain(&src, &native) else {
                self.abort_job(job_id, format!("no filter to convert {src} to {native}"), now);
                self.dirty.mark(DirtyKind::Jobs, now);
                continue;
            };
            if self.config.filter_limit > 0 && chain_cost(&chain) > self.config.filter_limit {
                debug!(
                    job_id,
                    cost = chain_cost(&chain),
                    limit = self.config.filter_limit,
                    "filter cost over limit; deferring"
                );
                continue;
            }

            let _ = self.start_job(job_id, &printer_name, chain);
        }
    }
}
