//! LVM (Logical Volume Manager) types
//!
//! Only the part of the LVM hierarchy that matters when tearing a disk down:
//! volume groups and the physical volumes they claim.

use serde::{Deserialize, Serialize};

/// Volume group with its physical volumes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGroup {
    /// Volume group name
    pub name: String,

    /// Physical volumes claimed by this group
    pub physical_volumes: Vec<PhysicalVolume>,
}

impl VolumeGroup {
    /// Physical volumes matching `predicate`, in listing order
    pub fn physical_volumes_where<F>(&self, predicate: F) -> Vec<&PhysicalVolume>
    where
        F: Fn(&PhysicalVolume) -> bool,
    {
        self.physical_volumes
            .iter()
            .filter(|pv| predicate(pv))
            .collect()
    }
}

/// Physical volume information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalVolume {
    /// Device path (e.g., "/dev/sda1")
    pub path: String,

    /// Volume group name (None if not assigned)
    pub vg_name: Option<String>,
}

impl PhysicalVolume {
    /// Check if this PV is assigned to a VG
    pub fn is_assigned(&self) -> bool {
        self.vg_name.is_some()
    }
}
