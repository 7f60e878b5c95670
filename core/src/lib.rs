// Allow uppercase acronyms for industry-standard terms like USB, SMART
#![allow(clippy::upper_case_acronyms)]

pub mod config;
pub mod drives;
pub mod inventory;
pub mod orchestrator;
pub mod reconcile;
pub mod ui;
pub mod wipe;

// Re-export the main entry points for convenience
pub use config::{RunContext, RunOptions, Settings};
pub use orchestrator::{Orchestrator, RunOutcome, RunSummary};
pub use reconcile::{Admission, Reconciler, Rejection};
pub use wipe::{WipeCoordinator, WipeOutcome, WipeState};

use inventory::{Features, InventoryError};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

const PATH_SEPARATORS: &[char] = &['/', '\\', '\0'];

// Set by the SIGINT handler
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

// True while wipe workers are running; an interrupt must not abort them
static WIPE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Set the interrupt flag (called by signal handler)
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Check if an interrupt has been received
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Reset the interrupt flag (primarily for testing)
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Mark the start or end of the wipe phase
pub fn set_wipe_active(active: bool) {
    WIPE_ACTIVE.store(active, Ordering::SeqCst);
}

/// Whether wipe workers are currently running
pub fn is_wipe_active() -> bool {
    WIPE_ACTIVE.load(Ordering::SeqCst)
}

/// Run-level errors. Only the variants documented as fatal abort a run;
/// everything scoped to a single disk is handled where it happens.
#[derive(Error, Debug)]
pub enum WipeError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Mount table probe failed: {0}")]
    MountProbe(String),

    #[error("Disk probe failed: {0}")]
    DiskProbe(String),

    #[error("Failed to connect to the inventory service: {0}")]
    InventoryConnection(#[source] InventoryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shutdown command failed: {0}")]
    Shutdown(String),
}

impl WipeError {
    /// Process exit code for a run that ended with this error
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type WipeResult<T> = Result<T, WipeError>;

/// SMART overall health as reported by the attribute probe
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmartHealth {
    Ok,
    Fail,
    #[default]
    Unknown,
}

impl SmartHealth {
    /// Value of the `smart-data` inventory feature, if the health is known
    pub fn feature_value(&self) -> Option<&'static str> {
        match self {
            SmartHealth::Ok => Some("ok"),
            SmartHealth::Fail => Some("fail"),
            SmartHealth::Unknown => None,
        }
    }
}

impl fmt::Display for SmartHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmartHealth::Ok => write!(f, "ok"),
            SmartHealth::Fail => write!(f, "fail"),
            SmartHealth::Unknown => write!(f, "unknown"),
        }
    }
}

/// Inventory feature names that describe health rather than identity
pub const SMART_FEATURES: [&str; 2] = ["smart-data", "smart-data-long"];

/// A physical disk found at scan time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskRecord {
    pub serial: String,
    pub device_path: String,
    pub capacity: u64,
    pub model: String,
    pub vendor: Option<String>,
    pub rotational: bool,
    pub smart_health: SmartHealth,
    pub inventory_code: Option<String>,
}

impl DiskRecord {
    /// Device name without the `/dev/` prefix
    pub fn device_name(&self) -> &str {
        Path::new(&self.device_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.device_path)
    }

    /// Stem of this disk's bad-block log file. Path separators in a code
    /// assigned by the service are replaced so the log stays in its directory.
    pub fn log_stem(&self) -> Cow<'_, str> {
        let stem = self
            .inventory_code
            .as_deref()
            .unwrap_or_else(|| self.device_name());
        if stem.contains(PATH_SEPARATORS) {
            Cow::Owned(stem.replace(PATH_SEPARATORS, "_"))
        } else {
            Cow::Borrowed(stem)
        }
    }

    /// Features as they are stored by the inventory service
    pub fn features(&self) -> Features {
        let mut features = Features::new();
        let kind = if self.rotational { "hdd" } else { "ssd" };
        features.insert("type".into(), kind.into());
        features.insert("sn".into(), self.serial.clone().into());
        if !self.model.is_empty() {
            features.insert("model".into(), self.model.clone().into());
        }
        if let Some(vendor) = self.vendor.as_deref().filter(|v| !v.is_empty()) {
            features.insert("brand".into(), vendor.into());
        }
        features.insert("capacity-decibyte".into(), self.capacity.into());
        if let Some(health) = self.smart_health.feature_value() {
            features.insert("smart-data".into(), health.into());
        }
        features
    }
}

#[cfg(test)]
mod lib_tests;
