// Inventory reconciliation
//
// Decides whether a disk's identity is unambiguous enough to wipe it and
// keeps its inventory item up to date afterwards.

use crate::inventory::{Features, Inventory, InventoryError};
use crate::{DiskRecord, SmartHealth, SMART_FEATURES};
use serde_json::{Number, Value};
use std::fmt;

/// Result of admitting a disk
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// No item existed; one was created with this code
    Created(String),
    /// Exactly one matching, non-conflicting item exists
    Existing(String),
    Rejected(Rejection),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::Rejected(_))
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Admission::Created(code) | Admission::Existing(code) => Some(code),
            Admission::Rejected(_) => None,
        }
    }
}

/// Why a disk was not admitted
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Several items share the serial number
    Ambiguous(Vec<String>),
    FeatureConflict {
        code: String,
        feature: String,
        local: Value,
        remote: Value,
    },
    /// The service refused to create the item
    CreateRefused(String),
    /// The disk already holds a code and the lookup found a different one
    CodeChanged { assigned: String, found: String },
    Service(InventoryError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Ambiguous(codes) => write!(
                f,
                "multiple items share this serial number ({})",
                codes.join(", ")
            ),
            Rejection::FeatureConflict {
                code,
                feature,
                local,
                remote,
            } => write!(
                f,
                "item {} has {} = {} but the disk reports {}",
                code, feature, remote, local
            ),
            Rejection::CreateRefused(msg) => write!(f, "item creation refused: {}", msg),
            Rejection::CodeChanged { assigned, found } => write!(
                f,
                "disk was admitted as {} but the inventory now resolves it to {}",
                assigned, found
            ),
            Rejection::Service(e) => write!(f, "inventory service error: {}", e),
        }
    }
}

pub struct Reconciler<'a, I: Inventory> {
    inventory: &'a I,
    location: &'a str,
}

impl<'a, I: Inventory> Reconciler<'a, I> {
    pub fn new(inventory: &'a I, location: &'a str) -> Self {
        Self {
            inventory,
            location,
        }
    }

    /// Look the disk up by serial number and decide whether it may be wiped.
    /// On admission the disk's inventory code is assigned.
    pub fn sync_and_admit(&self, disk: &mut DiskRecord) -> Admission {
        let admission = self.resolve(disk);

        if let Some(code) = admission.code() {
            match disk.inventory_code.as_deref() {
                Some(assigned) if assigned != code => {
                    return Admission::Rejected(Rejection::CodeChanged {
                        assigned: assigned.to_string(),
                        found: code.to_string(),
                    });
                }
                Some(_) => {}
                None => disk.inventory_code = Some(code.to_string()),
            }
        }

        match &admission {
            Admission::Created(code) => {
                tracing::info!(serial = %disk.serial, code = %code, "Created inventory item")
            }
            Admission::Existing(code) => {
                tracing::info!(serial = %disk.serial, code = %code, "Disk already in inventory")
            }
            Admission::Rejected(reason) => {
                tracing::warn!(serial = %disk.serial, device = %disk.device_path, "Disk not admitted: {}", reason)
            }
        }

        admission
    }

    fn resolve(&self, disk: &DiskRecord) -> Admission {
        let codes = match self.inventory.find_by_serial(&disk.serial) {
            Ok(codes) => codes,
            Err(e) => return Admission::Rejected(Rejection::Service(e)),
        };

        let features = disk.features();

        match codes.len() {
            0 => match self.inventory.create_item(&features, self.location) {
                Ok(code) => Admission::Created(code),
                Err(InventoryError::Validation { status, message }) => Admission::Rejected(
                    Rejection::CreateRefused(format!("HTTP {}: {}", status, message)),
                ),
                Err(e) => Admission::Rejected(Rejection::Service(e)),
            },
            1 => {
                let code = &codes[0];
                let item = match self.inventory.get_item(code) {
                    Ok(item) => item,
                    Err(e) => return Admission::Rejected(Rejection::Service(e)),
                };
                match find_conflict(&item.features, &features) {
                    Some((feature, local, remote)) => {
                        Admission::Rejected(Rejection::FeatureConflict {
                            code: code.clone(),
                            feature,
                            local,
                            remote,
                        })
                    }
                    None => Admission::Existing(code.clone()),
                }
            }
            _ => Admission::Rejected(Rejection::Ambiguous(codes)),
        }
    }

    /// Flag the disk as failed in the inventory. Best effort: any problem is
    /// logged and reported through the return value, never propagated.
    pub fn report_failure(&self, disk: &mut DiskRecord) -> bool {
        disk.smart_health = SmartHealth::Fail;

        let code = match self.sync_and_admit(disk) {
            Admission::Created(code) | Admission::Existing(code) => code,
            Admission::Rejected(reason) => {
                tracing::error!(
                    serial = %disk.serial,
                    device = %disk.device_path,
                    "Could not locate inventory item to report failure: {}",
                    reason
                );
                return false;
            }
        };

        match self.inventory.update_features(&code, &disk.features()) {
            Ok(()) => {
                tracing::info!(serial = %disk.serial, code = %code, "Disk reported as failed");
                true
            }
            Err(e) => {
                tracing::error!(serial = %disk.serial, code = %code, "Failed to update item: {}", e);
                false
            }
        }
    }

    /// Remove the disk's item again (simulation cleanup)
    pub fn release(&self, disk: &DiskRecord) -> bool {
        let Some(code) = disk.inventory_code.as_deref() else {
            return false;
        };

        match self.inventory.delete_item(code) {
            Ok(()) => {
                tracing::info!(code = %code, "Removed inventory item");
                true
            }
            Err(e) => {
                tracing::warn!(code = %code, "Failed to remove inventory item: {}", e);
                false
            }
        }
    }
}

/// First identity feature where the stored item disagrees with the disk
fn find_conflict(remote: &Features, local: &Features) -> Option<(String, Value, Value)> {
    remote
        .iter()
        .filter(|(key, _)| !SMART_FEATURES.contains(&key.as_str()))
        .filter_map(|(key, remote_value)| {
            let local_value = local.get(key)?;
            if feature_eq(local_value, remote_value) {
                None
            } else {
                Some((key.clone(), local_value.clone(), remote_value.clone()))
            }
        })
        .next()
}

/// Numbers may come back from the service as strings and vice versa, and
/// integers as floats
pub(crate) fn feature_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => number_eq(x, y),
        (Value::Number(x), Value::String(y)) | (Value::String(y), Value::Number(x)) => y
            .trim()
            .parse::<Number>()
            .map_or(false, |y| number_eq(x, &y)),
        _ => a == b,
    }
}

fn number_eq(x: &Number, y: &Number) -> bool {
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return x == y;
    }
    x.as_f64() == y.as_f64()
}
