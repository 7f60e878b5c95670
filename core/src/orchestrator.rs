// Run orchestration
//
// One run, start to finish: protect the system disks, pick the candidates,
// get the operator's go-ahead, admit every disk against the inventory, wipe
// the admitted ones in parallel and wrap up.

use crate::config::{InventorySettings, RunContext};
use crate::drives::{DiskSelector, Host, ProbeOptions, SafetyFilter};
use crate::inventory::{Inventory, InventoryError};
use crate::reconcile::{Admission, Reconciler, Rejection};
use crate::ui::progress::format_elapsed;
use crate::ui::{Console, Prompt};
use crate::wipe::{log_path_for, WipeCoordinator, WipeOutcome, WipeState, WorkerCommand, WorkerJob};
use crate::{is_interrupted, set_wipe_active, DiskRecord, WipeError, WipeResult};
use chrono::{DateTime, Local};
use std::fs;
use std::io::{BufRead, Write};
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// How a run ended when no fatal error occurred
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// No disk qualified; nothing was asked and nothing was touched
    NothingToDo,
    /// The operator said no
    Declined,
}

/// What happened to every disk of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub simulated: bool,
    pub rejected: Vec<(DiskRecord, Rejection)>,
    pub outcomes: Vec<WipeOutcome>,
    /// Items removed again by a simulated run
    pub released: usize,
    /// An interrupt arrived while the run was in progress
    pub interrupted: bool,
    pub halted: bool,
}

impl RunSummary {
    pub fn admitted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn clean(&self) -> usize {
        self.count(|s| *s == WipeState::Clean)
    }

    pub fn dirty(&self) -> usize {
        self.count(|s| matches!(s, WipeState::Dirty { .. }))
    }

    /// Bad disks the inventory does not know about yet
    pub fn unreported(&self) -> usize {
        self.count(|s| *s == WipeState::Dirty { reported: false })
    }

    pub fn not_wiped(&self) -> usize {
        self.count(|s| matches!(s, WipeState::InfraFailure(_)))
    }

    fn count(&self, pred: impl Fn(&WipeState) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.state)).count()
    }

    fn print(&self, console: &Console) {
        console.section("Summary");
        for outcome in &self.outcomes {
            console.info(format!(
                "  {} ({}): {} after {}",
                outcome.device_path,
                outcome.code,
                outcome.state,
                format_elapsed(outcome.elapsed)
            ));
            if let Some(log) = outcome.bad_block_log() {
                console.notice(format!(
                    "  Bad blocks of {} are listed in {}",
                    outcome.device_path,
                    log.display()
                ));
            }
        }
        for (disk, reason) in &self.rejected {
            console.info(format!(
                "  {} (serial {}): skipped, {}",
                disk.device_path, disk.serial, reason
            ));
        }

        console.notice(format!(
            "Run {} finished at {}: {} clean, {} with bad blocks ({} not reported), {} not wiped, {} skipped",
            self.run_id,
            self.finished_at.format("%Y-%m-%d %H:%M:%S"),
            self.clean(),
            self.dirty(),
            self.unreported(),
            self.not_wiped(),
            self.rejected.len()
        ));
    }
}

pub struct Orchestrator<'a, H: Host + ?Sized, R, W> {
    ctx: &'a RunContext,
    host: &'a H,
    prompt: &'a mut Prompt<R, W>,
    worker: WorkerCommand,
    console: Console,
}

impl<'a, H, R, W> Orchestrator<'a, H, R, W>
where
    H: Host + ?Sized,
    R: BufRead,
    W: Write,
{
    pub fn new(
        ctx: &'a RunContext,
        host: &'a H,
        prompt: &'a mut Prompt<R, W>,
        worker: WorkerCommand,
    ) -> Self {
        Self {
            ctx,
            host,
            prompt,
            worker,
            console: Console::new(ctx.options.quiet),
        }
    }

    /// Execute one full run. `connect` opens the inventory session once
    /// the operator has confirmed.
    pub async fn run<I, C>(&mut self, connect: C) -> WipeResult<RunOutcome>
    where
        I: Inventory,
        C: FnOnce(&InventorySettings) -> Result<I, InventoryError>,
    {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "run",
            %run_id,
            simulate = self.ctx.options.simulate,
            usb = self.ctx.options.usb_allowed
        );
        self.run_inner(run_id, connect).instrument(span).await
    }

    async fn run_inner<I, C>(&mut self, run_id: Uuid, connect: C) -> WipeResult<RunOutcome>
    where
        I: Inventory,
        C: FnOnce(&InventorySettings) -> Result<I, InventoryError>,
    {
        let ctx = self.ctx;
        let options = ctx.options;
        let settings = &ctx.settings;
        let started_at = Local::now();
        tracing::info!(?options, "Run started");

        self.console.section("Looking for system disks");
        let exclude = SafetyFilter::scan(self.host, self.prompt, &self.console)?;

        self.console.section("Looking for disks to wipe");
        let probe_options = ProbeOptions {
            interactive: !options.quiet,
            usb_allowed: options.usb_allowed,
            exclude: &exclude,
        };
        let disks = DiskSelector::select(self.host, &probe_options)?;
        if disks.is_empty() {
            self.console.notice("No disks to wipe.");
            return Ok(RunOutcome::NothingToDo);
        }

        if !DiskSelector::confirm(&disks, self.prompt)? {
            self.console.notice("Nothing was wiped.");
            return Ok(RunOutcome::Declined);
        }

        self.console.section("Connecting to the inventory");
        let inventory = connect(&settings.inventory).map_err(WipeError::InventoryConnection)?;
        let reconciler = Reconciler::new(&inventory, &settings.inventory.location);

        self.console.section("Updating inventory");
        let (admitted, rejected) = self.admit_all(&reconciler, disks);

        let mut released = 0;
        let outcomes = if admitted.is_empty() {
            self.console.notice("No disk could be admitted, nothing to wipe.");
            Vec::new()
        } else if options.simulate {
            self.console.section("Wiping disks (simulation)");
            let outcomes = self.simulate(&admitted);
            released = admitted.iter().filter(|d| reconciler.release(d)).count();
            outcomes
        } else {
            self.console.section("Wiping disks");
            fs::create_dir_all(&settings.wipe.log_dir)?;
            let jobs = admitted
                .into_iter()
                .map(|disk| WorkerJob::new(disk, &settings.wipe, &settings.inventory, options.quiet))
                .collect();

            set_wipe_active(true);
            let outcomes = WipeCoordinator::new(self.worker.clone(), options.quiet)
                .run(jobs)
                .await;
            set_wipe_active(false);
            outcomes
        };

        let mut summary = RunSummary {
            run_id,
            started_at,
            finished_at: Local::now(),
            simulated: options.simulate,
            rejected,
            outcomes,
            released,
            interrupted: is_interrupted(),
            halted: false,
        };
        summary.print(&self.console);
        tracing::info!(
            clean = summary.clean(),
            dirty = summary.dirty(),
            not_wiped = summary.not_wiped(),
            skipped = summary.rejected.len(),
            "Run finished"
        );

        if options.shutdown {
            summary.halted = self.shutdown(&summary);
        }

        self.console.notice("Done.");
        Ok(RunOutcome::Completed(summary))
    }

    /// Admission happens for every disk before any wipe starts. Rejected
    /// disks are reported and left alone.
    fn admit_all<I: Inventory>(
        &self,
        reconciler: &Reconciler<'_, I>,
        disks: Vec<DiskRecord>,
    ) -> (Vec<DiskRecord>, Vec<(DiskRecord, Rejection)>) {
        let mut admitted = Vec::new();
        let mut rejected = Vec::new();

        for mut disk in disks {
            match reconciler.sync_and_admit(&mut disk) {
                Admission::Created(code) => {
                    self.console.info(format!("{}: created item {}", disk.device_path, code));
                    admitted.push(disk);
                }
                Admission::Existing(code) => {
                    self.console.info(format!("{}: found item {}", disk.device_path, code));
                    admitted.push(disk);
                }
                Admission::Rejected(reason) => {
                    self.console.warn(format!(
                        "Skipping {} (serial {}): {}",
                        disk.device_path, disk.serial, reason
                    ));
                    rejected.push((disk, reason));
                }
            }
        }

        (admitted, rejected)
    }

    /// Go through the motions without running the wipe tool
    fn simulate(&self, admitted: &[DiskRecord]) -> Vec<WipeOutcome> {
        admitted
            .iter()
            .map(|disk| {
                self.console.info(format!("Started cleaning {}", disk.device_path));
                self.console.info(format!(
                    "Ended cleaning {} after {}: {}",
                    disk.device_path,
                    format_elapsed(Duration::ZERO),
                    WipeState::Clean
                ));
                WipeOutcome {
                    device_path: disk.device_path.clone(),
                    serial: disk.serial.clone(),
                    code: disk.log_stem().to_string(),
                    state: WipeState::Clean,
                    log_path: log_path_for(&self.ctx.settings.wipe.log_dir, disk),
                    elapsed: Duration::ZERO,
                }
            })
            .collect()
    }

    /// Power off when asked to, unless the run was simulated or interrupted.
    /// Returns whether the machine is going down.
    fn shutdown(&self, summary: &RunSummary) -> bool {
        if summary.simulated {
            self.console.notice("System halted by the user.");
            return false;
        }
        if summary.interrupted {
            self.console.warn("Interrupted during the run, not shutting down");
            return false;
        }

        self.console.notice("Shutting down.");
        match self.host.shutdown() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Shutdown failed: {}", e);
                self.console.failure(e);
                false
            }
        }
    }
}
