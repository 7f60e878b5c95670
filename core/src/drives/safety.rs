// System disk protection
//
// Builds the set of disks that must never be wiped: every disk holding a
// mount for a critical filesystem path, plus whatever the operator adds.

use crate::drives::host::Host;
use crate::ui::{Console, Prompt};
use crate::{WipeError, WipeResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use thiserror::Error;

/// Mount targets whose backing disk is never wiped (in addition to `/`)
pub const CRITICAL_TARGETS: [&str; 8] = [
    "/boot", "/home", "/etc", "/var", "/lib", "/root", "/opt", "/usr",
];

lazy_static! {
    // Partition suffix is plain digits for sd/hd/vd/xvd and `p<N>` for
    // nvme and mmcblk, where the base name itself ends in digits.
    static ref DISK_DEVICE: Regex = Regex::new(
        r"^/dev/(?:(?P<scsi>(?:sd|hd|vd|xvd)[a-z]+)\d*|(?P<flash>nvme\d+n\d+|mmcblk\d+)(?:p\d+)?)$"
    )
    .expect("disk device pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: String,
    pub target: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line_no}: malformed mount entry {line:?}")]
pub struct MountParseError {
    pub line_no: usize,
    pub line: String,
}

/// A disk that hosts a critical mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDisk {
    pub disk: String,
    pub source: String,
    pub target: String,
}

/// Disk base identifiers that are never offered for wiping. Built once per
/// run and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    pub fn new<I, J>(system: I, extras: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        Self(system.into_iter().chain(extras).collect())
    }

    pub fn contains(&self, disk: &str) -> bool {
        self.0.contains(disk)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse `df --output=source,target` output. The target keeps any embedded
/// spaces; lines without a target are returned as errors.
pub fn parse_mount_table(text: &str) -> (Vec<MountEntry>, Vec<MountParseError>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || (idx == 0 && trimmed.starts_with("Filesystem")) {
            continue;
        }

        match trimmed.split_once(char::is_whitespace) {
            Some((source, target)) if !target.trim().is_empty() => entries.push(MountEntry {
                source: source.to_string(),
                target: target.trim().to_string(),
            }),
            _ => errors.push(MountParseError {
                line_no: idx + 1,
                line: line.to_string(),
            }),
        }
    }

    (entries, errors)
}

/// Base identifier of a physical disk partition (`/dev/sda2` -> `sda`)
pub fn disk_base(source: &str) -> Option<String> {
    let caps = DISK_DEVICE.captures(source)?;
    caps.name("scsi")
        .or_else(|| caps.name("flash"))
        .map(|m| m.as_str().to_string())
}

pub fn is_critical_target(target: &str) -> bool {
    target == "/" || CRITICAL_TARGETS.iter().any(|c| target.contains(c))
}

pub struct SafetyFilter;

impl SafetyFilter {
    /// Disks holding critical mounts, first-seen order, one entry per disk
    pub fn system_disks(entries: &[MountEntry]) -> Vec<SystemDisk> {
        let mut seen = BTreeSet::new();
        let mut disks = Vec::new();

        for entry in entries {
            if !is_critical_target(&entry.target) {
                continue;
            }
            let Some(disk) = disk_base(&entry.source) else {
                continue;
            };
            if seen.insert(disk.clone()) {
                disks.push(SystemDisk {
                    disk,
                    source: entry.source.clone(),
                    target: entry.target.clone(),
                });
            }
        }

        disks
    }

    /// Operator-supplied list: `sda, /dev/sdb,,sdc` -> `[sda, sdb, sdc]`
    pub fn parse_user_list(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(|s| s.split_whitespace().collect::<String>())
            .map(|s| s.trim_start_matches("/dev/").to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Build the exclusion set for this run. A failing mount probe is fatal:
    /// without it there is no way to tell which disk holds the system.
    pub fn scan<H, R, W>(
        host: &H,
        prompt: &mut Prompt<R, W>,
        console: &Console,
    ) -> WipeResult<ExclusionSet>
    where
        H: Host + ?Sized,
        R: BufRead,
        W: Write,
    {
        let table = host.mount_table()?;
        let (entries, errors) = parse_mount_table(&table);

        for error in &errors {
            tracing::warn!("Ignoring mount table entry: {}", error);
        }
        if entries.is_empty() {
            return Err(WipeError::MountProbe(
                "mount table contains no usable entries".to_string(),
            ));
        }

        let system = Self::system_disks(&entries);
        for sd in &system {
            console.notice(format!(
                "The partition \"{}\" was found on \"{}\", the disk \"{}\" will be ignored",
                sd.target, sd.source, sd.disk
            ));
            tracing::info!(disk = %sd.disk, target = %sd.target, "Excluding system disk");
        }

        let mut extras = Vec::new();
        if prompt.confirm("Do you wish to add more disks to ignore from wiping? [y/N] ", Some(false))? {
            if let Some(answer) =
                prompt.ask("Insert disks to ignore separated by comma (sda,sdb,...): ")?
            {
                extras = Self::parse_user_list(&answer);
            }
        }

        let set = ExclusionSet::new(system.into_iter().map(|sd| sd.disk), extras);
        tracing::debug!(excluded = ?set.iter().collect::<Vec<_>>(), "Exclusion set built");
        Ok(set)
    }
}
