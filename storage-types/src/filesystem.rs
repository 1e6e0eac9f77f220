//! Filesystem kinds understood by the partition tool and the formatting helpers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Filesystem kind, named the way the partition tool names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilesystemKind {
    #[serde(rename = "btrfs")]
    Btrfs,
    #[serde(rename = "ext2")]
    Ext2,
    #[serde(rename = "ext3")]
    Ext3,
    #[serde(rename = "ext4")]
    Ext4,
    #[serde(rename = "fat16")]
    Fat16,
    #[serde(rename = "fat32")]
    Fat32,
    #[serde(rename = "hfs")]
    Hfs,
    #[serde(rename = "hfs+")]
    HfsPlus,
    #[serde(rename = "linux-swap")]
    LinuxSwap,
    #[serde(rename = "ntfs")]
    Ntfs,
    #[serde(rename = "reiserfs")]
    ReiserFs,
    #[serde(rename = "udf")]
    Udf,
    #[serde(rename = "xfs")]
    Xfs,
}

impl FilesystemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Btrfs => "btrfs",
            Self::Ext2 => "ext2",
            Self::Ext3 => "ext3",
            Self::Ext4 => "ext4",
            Self::Fat16 => "fat16",
            Self::Fat32 => "fat32",
            Self::Hfs => "hfs",
            Self::HfsPlus => "hfs+",
            Self::LinuxSwap => "linux-swap",
            Self::Ntfs => "ntfs",
            Self::ReiserFs => "reiserfs",
            Self::Udf => "udf",
            Self::Xfs => "xfs",
        }
    }

    /// Parse a name reported by parted or lsblk
    ///
    /// Swap is reported with a version suffix (`linux-swap(v1)`) and FAT
    /// partitions may show up as `vfat`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.starts_with("linux-swap") || name == "swap" {
            return Some(Self::LinuxSwap);
        }

        match name {
            "btrfs" => Some(Self::Btrfs),
            "ext2" => Some(Self::Ext2),
            "ext3" => Some(Self::Ext3),
            "ext4" => Some(Self::Ext4),
            "fat16" => Some(Self::Fat16),
            "fat32" | "vfat" => Some(Self::Fat32),
            "hfs" => Some(Self::Hfs),
            "hfs+" => Some(Self::HfsPlus),
            "ntfs" => Some(Self::Ntfs),
            "reiserfs" => Some(Self::ReiserFs),
            "udf" => Some(Self::Udf),
            "xfs" => Some(Self::Xfs),
            _ => None,
        }
    }

    /// Whether a filesystem of this kind can be created by the formatting helpers
    pub fn can_format(self) -> bool {
        !matches!(self, Self::Hfs | Self::HfsPlus | Self::Udf)
    }
}

impl fmt::Display for FilesystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
