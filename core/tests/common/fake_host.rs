/// Scripted host: a fixed mount table, a fixed set of attached disks and a
/// shutdown counter
use bulkwipe::drives::{Host, ProbeOptions};
use bulkwipe::{DiskRecord, SmartHealth, WipeResult};
use std::cell::Cell;

/// `sda` carries the operating system
pub const SYSTEM_MOUNTS: &str = "\
Filesystem     Mounted on
udev           /dev
/dev/sda2      /
/dev/sda1      /boot/efi
tmpfs          /run
";

pub struct FakeHost {
    pub mounts: String,
    pub disks: Vec<DiskRecord>,
    pub shutdowns: Cell<u32>,
    pub probes: Cell<u32>,
}

impl FakeHost {
    pub fn new(disks: Vec<DiskRecord>) -> Self {
        Self {
            mounts: SYSTEM_MOUNTS.to_string(),
            disks,
            shutdowns: Cell::new(0),
            probes: Cell::new(0),
        }
    }
}

impl Host for FakeHost {
    fn mount_table(&self) -> WipeResult<String> {
        Ok(self.mounts.clone())
    }

    fn probe_disks(&self, options: &ProbeOptions) -> WipeResult<Vec<DiskRecord>> {
        self.probes.set(self.probes.get() + 1);
        Ok(self
            .disks
            .iter()
            .filter(|disk| !options.exclude.contains(disk.device_name()))
            .cloned()
            .collect())
    }

    fn shutdown(&self) -> WipeResult<()> {
        self.shutdowns.set(self.shutdowns.get() + 1);
        Ok(())
    }
}

pub fn disk(serial: &str, device: &str) -> DiskRecord {
    DiskRecord {
        serial: serial.to_string(),
        device_path: device.to_string(),
        capacity: 80_026_361_856,
        model: "WDC WD800JD-60LS".to_string(),
        vendor: None,
        rotational: true,
        smart_health: SmartHealth::Ok,
        inventory_code: None,
    }
}
