//! Disk model and free-space analysis
//!
//! A [`Disk`] is a snapshot decoded from the partition tool's JSON report
//! (`parted -j`). It is never patched incrementally: after any change to the
//! on-disk layout the whole snapshot is replaced with a fresh lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FilesystemKind, ModelError, Partition, Quantity, partition_device_path};

/// Partition table label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskLabel {
    /// Legacy MBR/DOS scheme
    Msdos,

    /// GUID Partition Table
    Gpt,

    /// No recognised table (parted reports "unknown", "loop", ...)
    #[default]
    #[serde(other)]
    Unknown,
}

impl DiskLabel {
    /// Name accepted by `parted mklabel`
    pub fn as_parted_str(self) -> Option<&'static str> {
        match self {
            Self::Msdos => Some("msdos"),
            Self::Gpt => Some("gpt"),
            Self::Unknown => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "msdos" | "dos" | "mbr" => Some(Self::Msdos),
            "gpt" => Some(Self::Gpt),
            _ => None,
        }
    }
}

impl fmt::Display for DiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_parted_str().unwrap_or("unknown"))
    }
}

/// Unallocated range between partitions, in the disk's reporting unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub start: u64,
    pub end: u64,
}

impl Sector {
    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Disk snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    /// Device path (e.g. "/dev/sda")
    pub path: String,

    /// Total size
    pub size: Quantity,

    pub model: String,

    /// Connection bus (e.g. "scsi", "nvme", "usb")
    pub transport: String,

    pub label: DiskLabel,

    pub logical_sector_size: u32,

    pub physical_sector_size: u32,

    pub max_partitions: u32,

    /// Partitions ordered by ascending number
    pub partitions: Vec<Partition>,
}

#[derive(Deserialize)]
struct PartedReport {
    disk: RawDisk,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawDisk {
    path: String,
    size: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    transport: String,
    #[serde(default)]
    label: DiskLabel,
    #[serde(default)]
    logical_sector_size: u32,
    #[serde(default)]
    physical_sector_size: u32,
    #[serde(default)]
    max_partitions: u32,
    #[serde(default)]
    partitions: Vec<RawPartition>,
}

#[derive(Deserialize)]
struct RawPartition {
    number: u32,
    start: String,
    end: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    filesystem: Option<String>,
}

impl RawPartition {
    fn into_partition(self, disk_path: &str) -> Result<Partition, ModelError> {
        let position = |field: &str, raw: &str| {
            raw.parse::<Quantity>().map_err(|e| {
                ModelError::Parse(format!("partition {} {field}: {e}", self.number))
            })
        };

        Ok(Partition {
            number: self.number,
            start: position("start", &self.start)?,
            end: position("end", &self.end)?,
            size: self
                .size
                .as_deref()
                .map(|raw| position("size", raw))
                .transpose()?,
            name: self.name.clone().filter(|name| !name.is_empty()),
            filesystem: self.filesystem.as_deref().and_then(FilesystemKind::parse),
            path: partition_device_path(disk_path, self.number),
            disk_path: Some(disk_path.to_string()),
        })
    }
}

impl Disk {
    /// Decode the JSON report of `parted -sj <disk> unit MiB print`
    pub fn from_parted_json(output: &str) -> Result<Self, ModelError> {
        if output.trim().is_empty() {
            return Err(ModelError::Lookup("empty device description".to_string()));
        }

        let report: PartedReport = serde_json::from_str(output)
            .map_err(|e| ModelError::Lookup(format!("undecodable device description: {e}")))?;
        let raw = report.disk;

        let size = raw
            .size
            .parse::<Quantity>()
            .map_err(|e| ModelError::Parse(format!("disk size: {e}")))?;

        let mut partitions = raw
            .partitions
            .into_iter()
            .map(|part| part.into_partition(&raw.path))
            .collect::<Result<Vec<_>, _>>()?;

        // The tool does not guarantee any ordering
        partitions.sort_by_key(|part| part.number);

        Ok(Self {
            path: raw.path,
            size,
            model: raw.model,
            transport: raw.transport,
            label: raw.label,
            logical_sector_size: raw.logical_sector_size,
            physical_sector_size: raw.physical_sector_size,
            max_partitions: raw.max_partitions,
            partitions,
        })
    }

    /// Overwrite this snapshot with a fresh one
    pub fn replace_with(&mut self, fresh: Disk) {
        *self = fresh;
    }

    /// Unallocated ranges, in order
    ///
    /// A gap is recorded between two consecutive partitions only when the end
    /// of one differs from the start of the next, plus a trailing gap when the
    /// last partition ends before the disk does.
    pub fn available_sectors(&self) -> Result<Vec<Sector>, ModelError> {
        let Some(last) = self.partitions.last() else {
            return Err(ModelError::Precondition(format!(
                "{} has no partitions to measure gaps between",
                self.path
            )));
        };

        let unit = self.size.unit;
        let mut sectors = Vec::new();

        for pair in self.partitions.windows(2) {
            let end = pair[0].end.magnitude_in(unit)?;
            let next_start = pair[1].start.magnitude_in(unit)?;
            if end != next_start {
                sectors.push(Sector {
                    start: end,
                    end: next_start,
                });
            }
        }

        let last_end = last.end.magnitude_in(unit)?;
        let disk_end = self.size.magnitude_in(unit)?;
        if last_end < disk_end {
            sectors.push(Sector {
                start: last_end,
                end: disk_end,
            });
        }

        Ok(sectors)
    }

    /// Find a partition by number
    ///
    /// Tries `partitions[number - 1]` first. Only when that slot holds a
    /// different number does it fall back to a linear scan. The fast path
    /// trusts any slot whose number matches, even if numbering was altered
    /// elsewhere in the table.
    pub fn get_partition(&self, number: u32) -> Option<&Partition> {
        let index = (number as usize).checked_sub(1)?;
        if let Some(part) = self.partitions.get(index)
            && part.number == number
        {
            return Some(part);
        }

        self.partitions.iter().find(|part| part.number == number)
    }

    pub fn partition_numbers(&self) -> Vec<u32> {
        self.partitions.iter().map(|part| part.number).collect()
    }

    /// Display name for logs and reports
    pub fn display_name(&self) -> String {
        if !self.model.is_empty() {
            format!("{} ({})", self.model, self.path)
        } else {
            self.path.clone()
        }
    }
}
