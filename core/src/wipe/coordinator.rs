use super::{WipeOutcome, WipeState, WorkerJob};
use crate::ui::progress::{format_elapsed, WipeProgress};
use futures::future::join_all;
use indicatif::ProgressBar;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

/// How to start a worker process
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    /// This very binary, in worker mode
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self {
            program: std::env::current_exe()?,
            args: vec!["worker".to_string()],
        })
    }
}

struct Slot {
    job: WorkerJob,
    state: WipeState,
    started: Instant,
    child: Option<Child>,
    bar: Option<ProgressBar>,
}

/// Fans out one worker process per disk and waits for all of them
pub struct WipeCoordinator {
    worker: WorkerCommand,
    progress: WipeProgress,
}

impl WipeCoordinator {
    pub fn new(worker: WorkerCommand, quiet: bool) -> Self {
        Self {
            worker,
            progress: WipeProgress::new(quiet),
        }
    }

    /// Launch every job, then wait for every worker to finish. Launch order
    /// is job order; completion order is whatever the disks take.
    pub async fn run(&self, jobs: Vec<WorkerJob>) -> Vec<WipeOutcome> {
        let mut slots: Vec<Slot> = jobs
            .into_iter()
            .map(|job| Slot {
                job,
                state: WipeState::Pending,
                started: Instant::now(),
                child: None,
                bar: None,
            })
            .collect();

        for slot in slots.iter_mut() {
            self.launch(slot).await;
        }

        join_all(slots.into_iter().map(|slot| self.finish(slot))).await
    }

    async fn launch(&self, slot: &mut Slot) {
        let device = slot.job.disk.device_path.clone();

        let payload = match serde_json::to_vec(&slot.job) {
            Ok(payload) => payload,
            Err(e) => {
                slot.state = WipeState::InfraFailure(format!("cannot encode worker job: {}", e));
                return;
            }
        };

        let mut command = Command::new(&self.worker.program);
        command
            .args(&self.worker.args)
            .stdin(Stdio::piped())
            // Own process group: a Ctrl+C on the terminal must not reach a
            // running wipe
            .process_group(0);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(device = %device, "Failed to launch worker: {}", e);
                slot.state = WipeState::InfraFailure(format!("failed to launch worker: {}", e));
                return;
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&payload).await {
                tracing::warn!(device = %device, "Failed to hand job to worker: {}", e);
            }
            // Dropping stdin closes the pipe so the worker sees end of input
        }

        tracing::info!(device = %device, pid = ?child.id(), "Worker started");
        self.progress.println(&format!("Started cleaning {}", device));

        slot.started = Instant::now();
        slot.bar = Some(self.progress.start(&device, &slot.job.disk.log_stem()));
        slot.child = Some(child);
        slot.state = WipeState::Running;
    }

    async fn finish(&self, mut slot: Slot) -> WipeOutcome {
        let device = slot.job.disk.device_path.clone();

        if let Some(mut child) = slot.child.take() {
            slot.state = match child.wait().await {
                Ok(status) => WipeState::from_exit_code(status.code()),
                Err(e) => WipeState::InfraFailure(format!("failed to wait for worker: {}", e)),
            };
        }

        let elapsed = slot.started.elapsed();
        if let Some(bar) = slot.bar.take() {
            bar.finish_with_message(slot.state.to_string());
        }

        self.progress.println(&format!(
            "Ended cleaning {} after {}: {}",
            device,
            format_elapsed(elapsed),
            slot.state
        ));
        tracing::info!(device = %device, state = %slot.state, "Worker finished");

        WipeOutcome {
            device_path: device,
            serial: slot.job.disk.serial.clone(),
            code: slot.job.disk.log_stem().to_string(),
            state: slot.state,
            log_path: slot.job.log_path,
            elapsed,
        }
    }
}
