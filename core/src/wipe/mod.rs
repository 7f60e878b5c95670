// Wipe phase
//
// Every admitted disk is wiped by its own worker process: the coordinator
// re-executes this binary with the hidden `worker` subcommand and hands it a
// `WorkerJob` on stdin. The worker runs the external wipe-and-verify tool,
// cleans up or reports the disk, and tells the coordinator how it went
// through its exit code.

pub mod coordinator;
pub mod worker;



pub use coordinator::{WipeCoordinator, WorkerCommand};
pub use worker::{execute_job, is_root};

use crate::config::{InventorySettings, WipeSettings};
use crate::DiskRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const EXIT_CLEAN: i32 = 0;
pub const EXIT_DIRTY_REPORTED: i32 = 3;
pub const EXIT_INFRA_FAILURE: i32 = 4;
pub const EXIT_DIRTY_UNREPORTED: i32 = 5;

/// Per-disk state machine: `Pending -> Running -> {Clean, Dirty, InfraFailure}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WipeState {
    Pending,
    Running,
    /// Verified clean; the bad-block log was removed
    Clean,
    /// Verification failed; the log is kept and the disk was (or could not
    /// be) flagged in the inventory
    Dirty { reported: bool },
    /// The wipe never ran; the disk is in an unknown state
    InfraFailure(String),
}

impl WipeState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WipeState::Pending | WipeState::Running)
    }

    /// Worker process exit code for a terminal state
    pub fn exit_code(&self) -> i32 {
        match self {
            WipeState::Clean => EXIT_CLEAN,
            WipeState::Dirty { reported: true } => EXIT_DIRTY_REPORTED,
            WipeState::Dirty { reported: false } => EXIT_DIRTY_UNREPORTED,
            WipeState::Pending | WipeState::Running | WipeState::InfraFailure(_) => {
                EXIT_INFRA_FAILURE
            }
        }
    }

    /// Terminal state from a worker's exit code; `None` means it was killed
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(EXIT_CLEAN) => WipeState::Clean,
            Some(EXIT_DIRTY_REPORTED) => WipeState::Dirty { reported: true },
            Some(EXIT_DIRTY_UNREPORTED) => WipeState::Dirty { reported: false },
            Some(EXIT_INFRA_FAILURE) => {
                WipeState::InfraFailure("wipe tool could not be run".to_string())
            }
            Some(other) => WipeState::InfraFailure(format!("worker exited with code {}", other)),
            None => WipeState::InfraFailure("worker was killed by a signal".to_string()),
        }
    }
}

impl fmt::Display for WipeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WipeState::Pending => write!(f, "pending"),
            WipeState::Running => write!(f, "running"),
            WipeState::Clean => write!(f, "clean"),
            WipeState::Dirty { reported: true } => write!(f, "bad blocks found, reported"),
            WipeState::Dirty { reported: false } => write!(f, "bad blocks found, NOT reported"),
            WipeState::InfraFailure(reason) => write!(f, "not wiped: {}", reason),
        }
    }
}

/// Everything a worker process needs, sent as JSON on its stdin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJob {
    pub disk: DiskRecord,
    pub log_path: PathBuf,
    pub wipe: WipeSettings,
    pub inventory: InventorySettings,
    pub quiet: bool,
}

impl WorkerJob {
    pub fn new(
        disk: DiskRecord,
        wipe: &WipeSettings,
        inventory: &InventorySettings,
        quiet: bool,
    ) -> Self {
        let log_path = log_path_for(&wipe.log_dir, &disk);
        Self {
            disk,
            log_path,
            wipe: wipe.clone(),
            inventory: inventory.clone(),
            quiet,
        }
    }
}

/// `<log_dir>/<inventory code or device name>.txt`
pub fn log_path_for(log_dir: &Path, disk: &DiskRecord) -> PathBuf {
    log_dir.join(format!("{}.txt", disk.log_stem()))
}

/// Terminal result for one disk
#[derive(Debug, Clone)]
pub struct WipeOutcome {
    pub device_path: String,
    pub serial: String,
    pub code: String,
    pub state: WipeState,
    pub log_path: PathBuf,
    pub elapsed: Duration,
}

impl WipeOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == WipeState::Clean
    }

    /// Bad-block log left behind by a failed verification
    pub fn bad_block_log(&self) -> Option<&Path> {
        match self.state {
            WipeState::Dirty { .. } => Some(&self.log_path),
            _ => None,
        }
    }
}
