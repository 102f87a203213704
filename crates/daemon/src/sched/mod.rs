// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler: owns all mutable state and the event loop.
//!
//! Listener tasks, pipeline watchers, and the browse receiver funnel
//! events into one mpsc channel; every mutation of destinations, jobs,
//! and pipelines happens here. Signal handlers only set flags observed
//! by the loop. The loop sleeps until the earliest pending deadline:
//! dirty flush, held release, pipeline kill/cancel, pending admission,
//! browse interval, or retention expiry.

mod admit;

use std::path::PathBuf;
use std::sync::Arc;

use pq_core::{Clock, StatusKind, SystemClock};
use pq_wire::{Request, Response};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::access::{AccessControl, Credentials, Method};
use crate::auth::{Authenticator, NonceStore};
use crate::banner::BannerIndex;
use crate::browse::Browser;
use crate::config::ServerConfig;
use crate::dispatch;
use crate::jobs::JobStore;
use crate::mime::{FilterStep, MimeTypes};
use crate::persist::{self, DirtyKind, DirtySet};
use crate::pipeline::{status, Pipeline, PipelineOutcome, PipelineSpec};
use crate::process::{ExitInfo, ProcessManager};
use crate::registry::DestRegistry;

/// Peer identity attached to each client request.
#[derive(Debug, Clone)]
pub struct Peer {
    pub ip: std::net::IpAddr,
    pub hostname: String,
    pub secure: bool,
}

impl Peer {
    pub fn local() -> Self {
        Self {
            ip: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            hostname: "localhost".to_string(),
            secure: false,
        }
    }
}

/// A request forwarded from a listener task, with its reply slot.
pub struct ClientRequest {
    pub request: Request,
    pub peer: Peer,
    /// Staged document body, already in the spool temp directory
    pub staged: Option<PathBuf>,
    pub reply: oneshot::Sender<Response>,
}

/// Everything the loop wakes for.
pub enum SchedEvent {
    Client(Box<ClientRequest>),
    ChildExit { pid: u32, exit: ExitInfo },
    StatusLine { pid: u32, line: String },
    BrowsePacket { host: String, line: String },
}

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("signal setup failed: {0}")]
    Signals(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Persist(#[from] persist::PersistError),
}

/// Why a job could not be started (admission keeps going).
#[derive(Debug, Error)]
pub(crate) enum StartError {
    #[error("no filter chain from {src} to {dst}")]
    NoChain { src: String, dst: String },

    #[error(transparent)]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("job vanished")]
    JobGone,

    #[error("destination vanished")]
    DestGone,
}

/// The scheduler value owned by the run loop.
pub struct Scheduler<C: Clock = SystemClock> {
    pub config: ServerConfig,
    /// Config file paths for reload (None for in-process schedulers)
    pub conf_path: Option<PathBuf>,
    pub files_conf_path: Option<PathBuf>,
    pub access: AccessControl,
    pub registry: DestRegistry,
    pub jobs: JobStore,
    pub procs: ProcessManager,
    pub pipelines: Vec<Pipeline>,
    pub banners: BannerIndex,
    pub mime: Arc<dyn MimeTypes>,
    pub auth: Arc<dyn Authenticator>,
    pub devices: Arc<dyn crate::lookup::DeviceLookup>,
    pub nonces: NonceStore,
    pub dirty: DirtySet,
    pub browser: Option<Browser>,
    pub clock: C,
    stop: bool,
    reload: bool,
    reload_deadline: Option<u64>,
    /// Exit when idle (on-demand starts only)
    on_demand: bool,
    last_activity: u64,
    drain: watch::Sender<bool>,
    events_tx: mpsc::Sender<SchedEvent>,
}

/// How long an on-demand daemon lingers with nothing to do.
const IDLE_EXIT_SECS: u64 = 60;

impl<C: Clock> Scheduler<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ServerConfig,
        access: AccessControl,
        auth: Arc<dyn Authenticator>,
        mime: Arc<dyn MimeTypes>,
        browser: Option<Browser>,
        clock: C,
        events_tx: mpsc::Sender<SchedEvent>,
    ) -> Self {
        let clock_now = clock.epoch_secs();
        let banners = BannerIndex::load(&config.banner_dir);
        let procs = ProcessManager::new(
            config.user.as_deref(),
            config.group.as_deref(),
            config.filter_nice,
        );
        let (drain, _) = watch::channel(false);
        Self {
            config,
            conf_path: None,
            files_conf_path: None,
            access,
            registry: DestRegistry::new(),
            jobs: JobStore::new(),
            procs,
            pipelines: Vec::new(),
            banners,
            mime,
            auth,
            devices: Arc::new(crate::lookup::EmptyLookup),
            nonces: NonceStore::new(),
            dirty: DirtySet::new(),
            browser,
            clock,
            stop: false,
            reload: false,
            reload_deadline: None,
            on_demand: false,
            last_activity: clock_now,
            drain,
            events_tx,
        }
    }

    /// Arm the idle-exit deadline for supervisor-activated daemons.
    pub fn set_on_demand(&mut self, enabled: bool) {
        self.on_demand = enabled;
    }

    pub fn now(&self) -> u64 {
        self.clock.epoch_secs()
    }

    /// Sender for pipeline watchers and external feeders.
    pub fn events_tx(&self) -> mpsc::Sender<SchedEvent> {
        self.events_tx.clone()
    }

    /// Listener-side handle that flips true while a reload drains clients.
    pub fn drain_rx(&self) -> watch::Receiver<bool> {
        self.drain.subscribe()
    }

    pub fn request_stop(&mut self) {
        self.stop = true;
    }

    pub fn stopping(&self) -> bool {
        self.stop
    }

    /// Run until stop. Signal handlers set flags; the loop observes them.
    pub async fn run(&mut self, mut events: mpsc::Receiver<SchedEvent>) -> Result<(), SchedError> {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sighup = signal(SignalKind::hangup())?;
        let mut sigchld = signal(SignalKind::child())?;

        info!("scheduler running");
        loop {
            let sleep_for = self.next_wakeup();
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                _ = tokio::time::sleep(sleep_for) => {}
                _ = sigterm.recv() => {
                    info!("SIGTERM received; stopping");
                    self.stop = true;
                }
                _ = sighup.recv() => {
                    info!("SIGHUP received; reloading");
                    self.begin_reload();
                }
                // Exits arrive as ChildExit events from the watchers; the
                // signal only serves as a wake-up.
                _ = sigchld.recv() => {}
            }

            // Buffered events force a zero timeout: drain them all before
            // timers and admission run.
            while let Ok(event) = events.try_recv() {
                self.handle_event(event);
            }

            self.tick();

            if self.stop {
                break;
            }
            if self.reload {
                self.maybe_reinitialize()?;
            }
        }

        self.flush_dirty();
        info!("scheduler stopped");
        Ok(())
    }

    pub fn handle_event(&mut self, event: SchedEvent) {
        self.last_activity = self.now();
        match event {
            SchedEvent::Client(cr) => {
                let ClientRequest { request, peer, staged, reply } = *cr;
                let response = self.process_request(request, &peer, staged);
                let _ = reply.send(response);
            }
            SchedEvent::ChildExit { pid, exit } => self.handle_child_exit(pid, exit),
            SchedEvent::StatusLine { pid, line } => self.handle_status_line(pid, &line),
            SchedEvent::BrowsePacket { host, line } => {
                let now = self.now();
                if let Some(browser) = &self.browser {
                    browser.ingest(&mut self.registry, &host, &line, now);
                }
            }
        }
    }

    /// Access control, then dispatch.
    pub fn process_request(
        &mut self,
        request: Request,
        peer: &Peer,
        staged: Option<PathBuf>,
    ) -> Response {
        let path = request_path(&request);
        let creds = Credentials {
            username: request.username.as_deref(),
            secret: request.password.as_deref(),
        };
        let status = self.access.authorize(
            &path,
            Method::Post,
            peer.ip,
            &peer.hostname,
            peer.secure,
            creds,
            self.auth.as_ref(),
            &self.nonces,
        );
        if !status.is_ok() {
            debug!(%path, peer = %peer.ip, %status, "request refused by access control");
            discard_staged(&staged);
            let mut response = dispatch::plain_response(&request, status, &self.config);
            if status == StatusKind::Unauthorized {
                // Hand the peer a digest nonce for its next attempt
                let nonce = self.nonces.issue(&peer.hostname);
                if let Some((_, bag)) = response.groups.first_mut() {
                    bag.set("digest-nonce", nonce);
                }
            }
            return response;
        }
        dispatch::dispatch(self, &request, staged)
    }

    /// Timers: release holds, kill overdue pipelines, cancel stuck jobs,
    /// browse, flush, purge, then admit. Reaping already happened via the
    /// drained ChildExit events, so admission sees final state.
    pub fn tick(&mut self) {
        let now = self.now();

        if !self.jobs.release_due(now).is_empty() {
            self.dirty.mark(DirtyKind::Jobs, now);
        }

        let mut stuck: Vec<u32> = Vec::new();
        for pipeline in &mut self.pipelines {
            pipeline.kill_if_due(&self.procs, now);
            if !pipeline.canceled && pipeline.cancel_at.is_some_and(|t| t <= now) {
                stuck.push(pipeline.job_id);
            }
        }
        for job_id in stuck {
            warn!(job_id, "job exceeded MaxJobTime; cancelling");
            let _ = self.cancel_job(job_id);
        }

        if let Some(mut browser) = self.browser.take() {
            browser.tick(&mut self.registry, now);
            self.browser = Some(browser);
        }

        if self
            .dirty
            .flush_at(self.config.dirty_clean_interval.as_secs())
            .is_some_and(|t| t <= now)
        {
            self.flush_dirty();
        }

        if !self
            .jobs
            .purge_expired(now, self.config.job_retention.as_secs())
            .is_empty()
        {
            self.dirty.mark(DirtyKind::Jobs, now);
        }

        if self.on_demand
            && self.pipelines.is_empty()
            && self.jobs.active().next().is_none()
            && now >= self.last_activity + IDLE_EXIT_SECS
        {
            info!("idle-exit deadline reached; stopping on-demand daemon");
            self.stop = true;
        }

        self.admit();
    }

    /// Earliest of every pending deadline, clamped to [1s, 1 day].
    pub fn next_wakeup(&self) -> std::time::Duration {
        let now = self.now();
        let mut timeout = now + 86_400;
        let mut why = "do nothing";

        if let Some(deadline) = self.reload_deadline {
            if deadline < timeout {
                timeout = deadline;
                why = "force reload";
            }
        }
        if let Some(flush) = self.dirty.flush_at(self.config.dirty_clean_interval.as_secs()) {
            if flush < timeout {
                timeout = flush;
                why = "write dirty state files";
            }
        }
        for pipeline in &self.pipelines {
            if let Some(deadline) = pipeline.next_deadline() {
                if deadline < timeout {
                    timeout = deadline;
                    why = "kill or cancel jobs";
                }
            }
        }
        if let Some(release) = self.jobs.next_hold_release() {
            if release < timeout {
                timeout = release;
                why = "release held jobs";
            }
        }
        if self.jobs.has_pending() && now + 10 < timeout {
            timeout = now + 10;
            why = "start pending jobs";
        }
        if let Some(browser) = &self.browser {
            if browser.next_deadline() < timeout {
                timeout = browser.next_deadline();
                why = "send browse list";
            }
        }
        if let Some(expiry) = self
            .jobs
            .iter()
            .filter(|j| j.state.is_terminal())
            .filter_map(|j| j.completed_at)
            .map(|t| t + self.config.job_retention.as_secs())
            .min()
        {
            if expiry < timeout {
                timeout = expiry;
                why = "purge job history";
            }
        }
        if self.on_demand {
            let idle_exit = self.last_activity + IDLE_EXIT_SECS;
            if idle_exit < timeout {
                timeout = idle_exit;
                why = "exit when idle";
            }
        }

        let secs = (timeout.saturating_sub(now) + 1).clamp(1, 86_400);
        debug!(seconds = secs, why, "computed loop timeout");
        std::time::Duration::from_secs(secs)
    }

    // ------------------------------------------------------------------
    // Pipelines
    // ------------------------------------------------------------------

    fn handle_child_exit(&mut self, pid: u32, exit: ExitInfo) {
        let record = self.procs.reap(pid);
        if record.is_none() {
            debug!(pid, "exit for unknown pid");
        }
        let Some(idx) = self.pipelines.iter().position(|p| p.owns_pid(pid)) else {
            return;
        };
        self.pipelines[idx].record_exit(pid, exit);
        if self.pipelines[idx].all_exited() {
            self.finalize_pipeline(idx);
        }
    }

    fn finalize_pipeline(&mut self, idx: usize) {
        let pipeline = self.pipelines.remove(idx);
        let now = self.now();
        let outcome = pipeline.outcome();
        let job_id = pipeline.job_id;
        let printer = pipeline.printer.clone();
        debug!(job_id, %printer, ?outcome, "pipeline finished");

        let mut printer_stopped = None;
        match outcome {
            PipelineOutcome::Completed => {
                let next_index = pipeline.file_index + 1;
                let more = self.jobs.get(job_id).is_some_and(|j| next_index < j.files.len());
                if more {
                    match self.start_file(job_id, &printer, next_index) {
                        Ok(()) => return, // printer stays processing
                        Err(e) => {
                            error!(job_id, error = %e, "could not start next document");
                            self.abort_job(job_id, e.to_string(), now);
                        }
                    }
                } else if let Some(job) = self.jobs.get_mut(job_id) {
                    if job.complete(now).is_ok() {
                        info!(job_id, %printer, "job completed");
                    }
                    if !self.config.preserve_job_files {
                        crate::jobs::unlink_files(job);
                    }
                }
            }
            PipelineOutcome::Canceled => {
                // Job state was set when the cancel was requested
                info!(job_id, "pipeline cancelled");
            }
            PipelineOutcome::Crashed { name, signal } => {
                self.abort_job(job_id, format!("{name} crashed on signal {signal}"), now);
            }
            PipelineOutcome::FilterFailed { name, code } => {
                let message = format!("{name} failed with status {code}");
                warn!(job_id, %message, "filter failure");
                if let Some(job) = self.jobs.get_mut(job_id) {
                    let _ = job.stop(message);
                }
            }
            PipelineOutcome::BackendFailed { code } => {
                let message = format!("backend failed with status {code}");
                warn!(job_id, %printer, %message, "backend failure");
                if let Some(job) = self.jobs.get_mut(job_id) {
                    let _ = job.stop(message.clone());
                }
                printer_stopped = Some(message);
            }
        }

        let _ = self.registry.with_dest(&printer, |d| match &printer_stopped {
            Some(message) => d.stop(message.clone()),
            None => {
                if d.state == pq_core::PrinterState::Processing {
                    d.state = pq_core::PrinterState::Idle;
                }
            }
        });
        self.dirty.mark(DirtyKind::Jobs, now);
        if printer_stopped.is_some() {
            self.dirty.mark(DirtyKind::Printers, now);
        }
    }

    fn abort_job(&mut self, job_id: u32, message: String, now: u64) {
        error!(job_id, %message, "aborting job");
        if let Some(job) = self.jobs.get_mut(job_id) {
            let _ = job.abort(message, now);
            if !self.config.preserve_job_files {
                crate::jobs::unlink_files(job);
            }
        }
    }

    /// Start one job on a printer with a precomputed chain for file 0.
    pub(crate) fn start_job(
        &mut self,
        job_id: u32,
        printer_name: &str,
        chain: Vec<FilterStep>,
    ) -> Result<(), StartError> {
        let now = self.now();
        let is_class = {
            let job = self.jobs.get(job_id).ok_or(StartError::JobGone)?;
            job.dest != printer_name
        };
        {
            let job = self.jobs.get_mut(job_id).ok_or(StartError::JobGone)?;
            let assigned = is_class.then(|| printer_name.to_string());
            if job.start(now, assigned).is_err() {
                return Err(StartError::JobGone);
            }
        }
        let _ = self.registry.with_dest(printer_name, |d| {
            d.state = pq_core::PrinterState::Processing;
        });

        match self.spawn_pipeline(job_id, printer_name, 0, chain) {
            Ok(()) => {
                self.dirty.mark(DirtyKind::Jobs, now);
                Ok(())
            }
            Err(e) => {
                self.abort_job(job_id, e.to_string(), now);
                let _ = self.registry.with_dest(printer_name, |d| {
                    if d.state == pq_core::PrinterState::Processing {
                        d.state = pq_core::PrinterState::Idle;
                    }
                });
                Err(e)
            }
        }
    }

    /// Start a later document of an already-processing job.
    fn start_file(
        &mut self,
        job_id: u32,
        printer_name: &str,
        index: usize,
    ) -> Result<(), StartError> {
        let (src, dst) = {
            let job = self.jobs.get(job_id).ok_or(StartError::JobGone)?;
            let file = job.files.get(index).ok_or(StartError::JobGone)?;
            let printer = self.registry.find(printer_name).ok_or(StartError::DestGone)?;
            (file.mime_type.clone(), printer.native_type.clone())
        };
        let chain = self
            .mime
            .chain(&src, &dst)
            .ok_or(StartError::NoChain { src, dst })?;
        self.spawn_pipeline(job_id, printer_name, index, chain)
    }

    fn spawn_pipeline(
        &mut self,
        job_id: u32,
        printer_name: &str,
        index: usize,
        chain: Vec<FilterStep>,
    ) -> Result<(), StartError> {
        let now = self.now();
        let job = self.jobs.get(job_id).ok_or(StartError::JobGone)?;
        let file = job.files.get(index).ok_or(StartError::JobGone)?;
        let printer = self.registry.find(printer_name).ok_or(StartError::DestGone)?;
        let pipeline = Pipeline::spawn(
            PipelineSpec {
                job,
                printer,
                file,
                file_index: index,
                chain,
                config: &self.config,
            },
            &mut self.procs,
            &self.events_tx,
            now,
        )?;
        self.pipelines.push(pipeline);
        Ok(())
    }

    /// Cancel a job; terminates its pipeline when one is running.
    pub fn cancel_job(&mut self, job_id: u32) -> Result<(), StatusKind> {
        let now = self.now();
        let job = self.jobs.get_mut(job_id).ok_or(StatusKind::NotFound)?;
        job.cancel(now).map_err(|_| StatusKind::NotPossible)?;
        if !self.config.preserve_job_files {
            if let Some(job) = self.jobs.get(job_id) {
                crate::jobs::unlink_files(job);
            }
        }
        let grace = self.config.job_kill_delay.as_secs();
        if let Some(pipeline) = self.pipelines.iter_mut().find(|p| p.job_id == job_id) {
            pipeline.terminate(&self.procs, now, grace);
        }
        self.dirty.mark(DirtyKind::Jobs, now);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Status pipe
    // ------------------------------------------------------------------

    fn handle_status_line(&mut self, pid: u32, line: &str) {
        let Some(record) = self.procs.record(pid) else {
            debug!(pid, line, "status line from reaped pid");
            return;
        };
        let job_id = record.job;
        let child = record.name.clone();
        let (level, payload) = status::classify(line);
        let now = self.now();

        match level {
            status::StatusLevel::Page => {
                if let Some(job) = self.jobs.get_mut(job_id) {
                    job.sheets_completed += status::page_count(payload);
                    self.dirty.mark(DirtyKind::Jobs, now);
                }
            }
            status::StatusLevel::State => {
                let change = status::state_change(payload);
                if let Some(printer) = self.printer_for_job(job_id) {
                    let _ = self.registry.with_dest(&printer, |d| match &change {
                        status::StateChange::Add(reasons) => {
                            for r in reasons {
                                d.set_reason(r, true);
                            }
                        }
                        status::StateChange::Remove(reasons) => {
                            for r in reasons {
                                d.set_reason(r, false);
                            }
                        }
                        status::StateChange::Replace(reasons) => {
                            d.state_reasons = reasons.clone();
                        }
                    });
                }
            }
            status::StatusLevel::Attr => {
                let pairs = status::attr_pairs(payload);
                if let Some(printer) = self.printer_for_job(job_id) {
                    let _ = self.registry.with_dest(&printer, |d| {
                        for (name, value) in pairs {
                            match name.as_str() {
                                "printer-info" => d.info = value,
                                "printer-location" => d.location = value,
                                "printer-make-and-model" => d.make_model = value,
                                "printer-state-message" => d.state_message = value,
                                _ => debug!(attr = %name, "ignoring unknown ATTR update"),
                            }
                        }
                    });
                    self.dirty.mark(DirtyKind::Printers, now);
                }
            }
            status::StatusLevel::Ppd => {
                info!(job_id, %child, "PPD refresh requested");
            }
            _ => {
                if level.log_level() <= self.config.log_level {
                    log_status(level, job_id, &child, payload);
                }
            }
        }
    }

    fn printer_for_job(&self, job_id: u32) -> Option<String> {
        self.pipelines
            .iter()
            .find(|p| p.job_id == job_id)
            .map(|p| p.printer.clone())
    }

    // ------------------------------------------------------------------
    // Persistence and reload
    // ------------------------------------------------------------------

    pub fn printers_conf(&self) -> PathBuf {
        self.config.server_root.join("printers.conf")
    }

    pub fn classes_conf(&self) -> PathBuf {
        self.config.server_root.join("classes.conf")
    }

    /// Flush every dirty file now.
    pub fn flush_dirty(&mut self) {
        for kind in self.dirty.take() {
            let result = match kind {
                DirtyKind::Printers => persist::save_printers(&self.printers_conf(), &self.registry),
                DirtyKind::Classes => persist::save_classes(&self.classes_conf(), &self.registry),
                DirtyKind::Jobs => persist::save_jobs(&self.config.request_root, &self.jobs),
            };
            if let Err(e) = result {
                error!(?kind, error = %e, "state flush failed");
            }
        }
    }

    /// Load persisted destinations and jobs (startup and reload).
    pub fn load_state(&mut self) -> Result<(), SchedError> {
        let (mut dests, mut default) = persist::load_dests(&self.printers_conf())?;
        let (classes, class_default) = persist::load_dests(&self.classes_conf())?;
        dests.extend(classes);
        default = default.or(class_default);
        self.registry.replace(dests, default);
        self.jobs.replace(persist::load_jobs(&self.config.request_root)?);
        Ok(())
    }

    fn begin_reload(&mut self) {
        self.reload = true;
        self.reload_deadline = Some(self.now() + self.config.reload_timeout.as_secs());
        // Idle clients close at their next read; active jobs drain
        let _ = self.drain.send(true);
    }

    /// Reinitialize once active jobs drain or the reload timeout passes.
    fn maybe_reinitialize(&mut self) -> Result<(), SchedError> {
        let now = self.now();
        let jobs_active = self.jobs.processing().next().is_some();
        let deadline_passed = self.reload_deadline.is_some_and(|t| t <= now);
        if jobs_active && !deadline_passed {
            return Ok(());
        }

        info!("reinitializing from configuration");
        self.flush_dirty();
        if let Some(conf) = self.conf_path.clone() {
            match ServerConfig::load(&conf, self.files_conf_path.as_deref()) {
                Ok(config) => self.config = config,
                Err(e) => error!(error = %e, "reload kept previous configuration"),
            }
        }
        self.access = AccessControl::new(
            self.config.locations.clone(),
            crate::access::local_interfaces(),
        );
        self.banners = BannerIndex::load(&self.config.banner_dir);
        self.load_state()?;
        self.reload = false;
        self.reload_deadline = None;
        let _ = self.drain.send(false);
        Ok(())
    }
}

/// Resource path a request is judged against.
///
/// Operator requests are judged under `/admin`; queries and job
/// operations under their resource URI; private operations at the root.
fn request_path(request: &Request) -> String {
    let resource = if let Some(uri) = request.printer_uri() {
        uri.to_string()
    } else if let Some(id) = request.job_id() {
        format!("/jobs/{id}")
    } else {
        "/".to_string()
    };
    if request.operation.is_admin() {
        format!("/admin{resource}")
    } else {
        resource
    }
}

fn discard_staged(staged: &Option<PathBuf>) {
    if let Some(path) = staged {
        let _ = std::fs::remove_file(path);
    }
}

fn log_status(level: status::StatusLevel, job_id: u32, child: &str, payload: &str) {
    use status::StatusLevel as L;
    match level {
        L::Emerg | L::Alert | L::Crit | L::Error => error!(job_id, child, "{payload}"),
        L::Warning => warn!(job_id, child, "{payload}"),
        L::Notice | L::Info => info!(job_id, child, "{payload}"),
        _ => debug!(job_id, child, "{payload}"),
    }
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
