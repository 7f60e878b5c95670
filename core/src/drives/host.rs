use crate::config::{ProbeSettings, Settings};
use crate::drives::probe::{DiskProbe, ProbeOptions};
use crate::{DiskRecord, WipeError, WipeResult};
use std::process::Command;

/// The machine the run operates on: its mounts, its disks and its power
pub trait Host {
    /// Raw `source target` mount table
    fn mount_table(&self) -> WipeResult<String>;

    fn probe_disks(&self, options: &ProbeOptions) -> WipeResult<Vec<DiskRecord>>;

    fn shutdown(&self) -> WipeResult<()>;
}

/// The local Linux machine, inspected through external commands
pub struct LinuxHost {
    probe: ProbeSettings,
    shutdown_command: Vec<String>,
}

impl LinuxHost {
    pub fn new(settings: &Settings) -> Self {
        Self {
            probe: settings.probe.clone(),
            shutdown_command: settings.shutdown_command.clone(),
        }
    }
}

impl Host for LinuxHost {
    fn mount_table(&self) -> WipeResult<String> {
        let output = Command::new(&self.probe.df)
            .arg("--output=source,target")
            .output()
            .map_err(|e| WipeError::MountProbe(format!("{} failed: {}", self.probe.df, e)))?;

        // A partial table could miss the root disk
        if !output.status.success() {
            return Err(WipeError::MountProbe(format!(
                "{} exited with {}: {}",
                self.probe.df,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn probe_disks(&self, options: &ProbeOptions) -> WipeResult<Vec<DiskRecord>> {
        DiskProbe::new(&self.probe).probe(options)
    }

    fn shutdown(&self) -> WipeResult<()> {
        let (program, args) = self
            .shutdown_command
            .split_first()
            .ok_or_else(|| WipeError::Shutdown("no shutdown command configured".to_string()))?;

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| WipeError::Shutdown(format!("{} failed: {}", program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(WipeError::Shutdown(format!("{} exited with {}", program, status)))
        }
    }
}
