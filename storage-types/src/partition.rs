//! Partition model
//!
//! A [`Partition`] is normally produced as part of a [`crate::Disk`] snapshot.
//! It can also be created standalone from a device path when only probing or
//! formatting an arbitrary device.

use serde::{Deserialize, Serialize};

use crate::{FilesystemKind, ModelError, Quantity};

/// Partition entry of a disk snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Partition number (1-based, may have gaps). `0` for standalone partitions.
    pub number: u32,

    /// Start position on the disk
    pub start: Quantity,

    /// End position on the disk
    pub end: Quantity,

    /// Size as reported by the partition tool
    pub size: Option<Quantity>,

    /// Partition table name attribute (GPT only)
    pub name: Option<String>,

    /// Filesystem reported for (or requested on) this partition
    pub filesystem: Option<FilesystemKind>,

    /// Device path (e.g. "/dev/sda1", "/dev/nvme0n1p1")
    pub path: String,

    /// Device path of the owning disk, `None` for standalone partitions
    pub disk_path: Option<String>,
}

impl Partition {
    /// Address an arbitrary block device by path
    pub fn at_path(path: impl Into<String>) -> Self {
        Self {
            number: 0,
            start: Quantity::default(),
            end: Quantity::default(),
            size: None,
            name: None,
            filesystem: None,
            path: path.into(),
            disk_path: None,
        }
    }

    pub fn with_filesystem(mut self, filesystem: FilesystemKind) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    pub fn is_standalone(&self) -> bool {
        self.disk_path.is_none()
    }
}

/// Derive the device path of partition `number` on `disk_path`
///
/// Disks whose name ends in a digit (NVMe, MMC, loop) separate the partition
/// number with a `p`: `/dev/nvme0n1` + 1 -> `/dev/nvme0n1p1`, `/dev/sda` + 1 ->
/// `/dev/sda1`.
pub fn partition_device_path(disk_path: &str, number: u32) -> String {
    if disk_path.ends_with(|c: char| c.is_ascii_digit()) {
        format!("{disk_path}p{number}")
    } else {
        format!("{disk_path}{number}")
    }
}

/// End position requested for a new partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionEnd {
    /// Grow to the end of the disk
    Fill,

    /// End at the given MiB offset
    Mib(u64),
}

impl PartitionEnd {
    /// Argument as passed to `parted mkpart`
    pub fn to_parted_arg(self) -> String {
        match self {
            Self::Fill => "100%".to_string(),
            Self::Mib(end) => end.to_string(),
        }
    }
}

impl TryFrom<i64> for PartitionEnd {
    type Error = ModelError;

    /// `-1` means "grow to fill the disk"
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Fill),
            end if end >= 0 => Ok(Self::Mib(end as u64)),
            end => Err(ModelError::Precondition(format!(
                "invalid partition end {end}"
            ))),
        }
    }
}
