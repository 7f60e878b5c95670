use crate::config::ProbeSettings;
use crate::drives::safety::ExclusionSet;
use crate::{DiskRecord, SmartHealth, WipeError, WipeResult};
use serde::{Deserialize, Deserializer};
use std::process::Command;

/// Flags handed to the attribute probe
#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions<'a> {
    /// List every accepted disk on the console as it is found
    pub interactive: bool,
    pub usb_allowed: bool,
    pub exclude: &'a ExclusionSet,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LsblkOutput {
    pub blockdevices: Vec<LsblkDevice>,
}

/// One row of `lsblk --json --bytes` output. Older util-linux releases
/// print flags as "0"/"1" strings and sizes as strings, newer ones as
/// booleans and numbers.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LsblkDevice {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default, deserialize_with = "loose_u64")]
    pub size: u64,
    #[serde(default)]
    pub tran: Option<String>,
    #[serde(default, deserialize_with = "loose_bool")]
    pub rm: bool,
    #[serde(default, deserialize_with = "loose_bool")]
    pub rota: bool,
    #[serde(default, rename = "type")]
    pub kind: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Num(u64),
    Str(String),
}

fn loose_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Bool(b)) => b,
        Some(Loose::Num(n)) => n != 0,
        Some(Loose::Str(s)) => matches!(s.trim(), "1" | "true"),
        None => false,
    })
}

fn loose_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Num(n)) => n,
        Some(Loose::Str(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl LsblkDevice {
    fn device_path(&self) -> String {
        non_empty(&self.path).unwrap_or_else(|| format!("/dev/{}", self.name))
    }

    fn is_removable_bus(&self) -> bool {
        self.rm || self.tran.as_deref() == Some("usb")
    }

    fn into_record(self, smart_health: SmartHealth) -> Option<DiskRecord> {
        let serial = non_empty(&self.serial)?;
        Some(DiskRecord {
            device_path: self.device_path(),
            serial,
            capacity: self.size,
            model: non_empty(&self.model).unwrap_or_default(),
            vendor: non_empty(&self.vendor),
            rotational: self.rota,
            smart_health,
            inventory_code: None,
        })
    }
}

/// Invokes the attribute probe (`lsblk` + `smartctl`) and turns its output
/// into disk records
pub struct DiskProbe<'a> {
    settings: &'a ProbeSettings,
}

impl<'a> DiskProbe<'a> {
    pub fn new(settings: &'a ProbeSettings) -> Self {
        Self { settings }
    }

    /// Every wipe candidate currently attached
    pub fn probe(&self, options: &ProbeOptions) -> WipeResult<Vec<DiskRecord>> {
        let output = Command::new(&self.settings.lsblk)
            .args([
                "--json",
                "--bytes",
                "--nodeps",
                "-o",
                "NAME,PATH,SERIAL,MODEL,VENDOR,SIZE,TRAN,RM,ROTA,TYPE",
            ])
            .output()
            .map_err(|e| WipeError::DiskProbe(format!("{} failed: {}", self.settings.lsblk, e)))?;

        if !output.status.success() {
            return Err(WipeError::DiskProbe(format!(
                "{} exited with {}: {}",
                self.settings.lsblk,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let devices = Self::parse_lsblk(&String::from_utf8_lossy(&output.stdout))?;

        let mut disks = Vec::new();
        for device in Self::filter_candidates(devices, options) {
            let health = self.smart_health(&device.device_path());
            let name = device.name.clone();
            match device.into_record(health) {
                Some(disk) => {
                    if options.interactive {
                        println!(
                            "  Found {} ({}, {} GB, serial {}, SMART {})",
                            disk.device_path,
                            if disk.model.is_empty() { "unknown model" } else { disk.model.as_str() },
                            disk.capacity / 1_000_000_000,
                            disk.serial,
                            disk.smart_health
                        );
                    }
                    disks.push(disk);
                }
                None => {
                    tracing::warn!(device = %name, "Skipping disk without a serial number");
                }
            }
        }

        Ok(disks)
    }

    pub(crate) fn parse_lsblk(json: &str) -> WipeResult<Vec<LsblkDevice>> {
        serde_json::from_str::<LsblkOutput>(json)
            .map(|out| out.blockdevices)
            .map_err(|e| WipeError::DiskProbe(format!("unparseable lsblk output: {}", e)))
    }

    /// Drop everything that must never be offered for wiping
    pub(crate) fn filter_candidates(
        devices: Vec<LsblkDevice>,
        options: &ProbeOptions,
    ) -> Vec<LsblkDevice> {
        devices
            .into_iter()
            .filter(|device| {
                if device.kind != "disk" || Self::should_skip_device(&device.name) {
                    tracing::debug!(device = %device.name, kind = %device.kind, "Skipping virtual device");
                    return false;
                }
                if options.exclude.contains(&device.name) {
                    tracing::info!(device = %device.name, "Skipping excluded disk");
                    return false;
                }
                if !options.usb_allowed && device.is_removable_bus() {
                    tracing::info!(device = %device.name, "Skipping removable or USB disk");
                    return false;
                }
                true
            })
            .collect()
    }

    /// Check if device should be skipped
    pub(crate) fn should_skip_device(device_name: &str) -> bool {
        // Skip loop devices, ram disks, device mapper, etc.
        device_name.starts_with("loop")
            || device_name.starts_with("ram")
            || device_name.starts_with("dm-")
            || device_name.starts_with("sr") // CD/DVD drives
            || device_name.starts_with("zram")
            || device_name.starts_with("md")
    }

    /// SMART overall health; any probe problem yields `Unknown`
    fn smart_health(&self, device_path: &str) -> SmartHealth {
        match Command::new(&self.settings.smartctl)
            .args(["-H", device_path])
            .output()
        {
            Ok(output) => Self::parse_smart_health(&String::from_utf8_lossy(&output.stdout)),
            Err(e) => {
                tracing::warn!(device = %device_path, "smartctl failed: {}", e);
                SmartHealth::Unknown
            }
        }
    }

    pub(crate) fn parse_smart_health(output: &str) -> SmartHealth {
        let verdict = Self::extract_field(output, "SMART overall-health self-assessment test result:")
            .or_else(|| Self::extract_field(output, "SMART Health Status:"));

        match verdict.as_deref() {
            Some(v) if v.starts_with("PASSED") || v == "OK" => SmartHealth::Ok,
            Some(v) if v.starts_with("FAILED") => SmartHealth::Fail,
            _ => SmartHealth::Unknown,
        }
    }

    /// Extract field from smartctl output
    pub(crate) fn extract_field(output: &str, field_name: &str) -> Option<String> {
        let line = output.lines().find(|line| line.contains(field_name))?;
        let value = line.split_once(field_name)?.1.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}
