use crate::drives::host::Host;
use crate::drives::probe::ProbeOptions;
use crate::ui::progress::human_bytes;
use crate::ui::Prompt;
use crate::{DiskRecord, WipeResult};
use std::io::{BufRead, Write};

/// Picks the disks to wipe and gets the operator to agree
pub struct DiskSelector;

impl DiskSelector {
    pub fn select<H: Host + ?Sized>(host: &H, options: &ProbeOptions) -> WipeResult<Vec<DiskRecord>> {
        let disks = host.probe_disks(options)?;
        tracing::info!(count = disks.len(), "Wipe candidates detected");
        Ok(disks)
    }

    /// List every candidate and insist on an explicit yes or no.
    /// End of input counts as no.
    pub fn confirm<R: BufRead, W: Write>(
        disks: &[DiskRecord],
        prompt: &mut Prompt<R, W>,
    ) -> WipeResult<bool> {
        prompt.say("\nThe following disks are going to be wiped:")?;
        for disk in disks {
            prompt.say(&format!(
                "- {} ({}, {}, serial {})",
                disk.device_path,
                if disk.model.is_empty() { "unknown model" } else { disk.model.as_str() },
                human_bytes(disk.capacity),
                disk.serial
            ))?;
        }

        let confirmed = prompt.confirm("\nAre you 100% sure of what you're about to do? [N/y] ", None)?;
        tracing::info!(confirmed, "Operator answered wipe confirmation");
        Ok(confirmed)
    }
}
