// Disk discovery and selection
//
// Organized structure:
// - host.rs: the machine being worked on (mount table, probe, shutdown)
// - probe.rs: attribute probe (lsblk + smartctl) parsing and filtering
// - safety.rs: system disk detection and the exclusion set
// - selector.rs: candidate list and operator confirmation

pub mod host;
pub mod probe;
pub mod safety;
pub mod selector;



pub use host::{Host, LinuxHost};
pub use probe::{DiskProbe, ProbeOptions};
pub use safety::{ExclusionSet, MountEntry, MountParseError, SafetyFilter};
pub use selector::DiskSelector;
