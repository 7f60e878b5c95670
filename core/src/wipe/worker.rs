use super::{WipeState, WorkerJob};
use crate::config::InventorySettings;
use crate::inventory::{Inventory, InventoryError};
use crate::reconcile::Reconciler;
use std::fs;
use std::io;
use std::process::Command;

pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Argument list for the wipe tool with `{device}` and `{log}` filled in
pub(crate) fn tool_args(job: &WorkerJob) -> Vec<String> {
    let log = job.log_path.to_string_lossy();
    job.wipe
        .args
        .iter()
        .map(|arg| {
            arg.replace("{device}", &job.disk.device_path)
                .replace("{log}", &log)
        })
        .collect()
}

/// Wipe and verify one disk. Runs inside the worker process; blocks until
/// the tool exits, however long that takes.
///
/// `connect` is only called when the disk turns out to be bad and has to be
/// flagged in the inventory.
pub fn execute_job<I, C>(job: &WorkerJob, connect: C) -> WipeState
where
    I: Inventory,
    C: FnOnce(&InventorySettings) -> Result<I, InventoryError>,
{
    let device = &job.disk.device_path;

    if job.wipe.require_root && !is_root() {
        tracing::error!(device = %device, "Wipe tool needs root privileges");
        return WipeState::InfraFailure("missing root privileges".to_string());
    }

    let args = tool_args(job);
    tracing::info!(device = %device, program = %job.wipe.program, ?args, "Launching wipe tool");

    let status = match Command::new(&job.wipe.program).args(&args).status() {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(device = %device, "Could not launch {}: {}", job.wipe.program, e);
            return WipeState::InfraFailure(format!(
                "could not launch {}: {}",
                job.wipe.program, e
            ));
        }
    };

    if status.success() {
        match fs::remove_file(&job.log_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                device = %device,
                log = %job.log_path.display(),
                "Could not remove empty bad-block log: {}",
                e
            ),
        }
        tracing::info!(device = %device, "Disk verified clean");
        return WipeState::Clean;
    }

    // Killed by a signal: the tool never reached a verdict about the disk
    if status.code().is_none() {
        tracing::error!(device = %device, %status, "Wipe tool terminated before finishing");
        return WipeState::InfraFailure(format!("{} terminated: {}", job.wipe.program, status));
    }

    tracing::warn!(
        device = %device,
        log = %job.log_path.display(),
        %status,
        "Verification failed, bad blocks recorded"
    );

    let reported = match connect(&job.inventory) {
        Ok(inventory) => {
            let reconciler = Reconciler::new(&inventory, &job.inventory.location);
            let mut disk = job.disk.clone();
            reconciler.report_failure(&mut disk)
        }
        Err(e) => {
            tracing::error!(device = %device, "Cannot reach inventory to report failure: {}", e);
            false
        }
    };

    WipeState::Dirty { reported }
}
