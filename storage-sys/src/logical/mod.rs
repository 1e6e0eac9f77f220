pub mod lvm_tools;

use storage_types::VolumeGroup;

use crate::Result;

/// Volume manager operations needed to release a disk
pub trait VolumeManager {
    /// All volume groups with their physical volumes
    fn volume_groups(&self) -> Result<Vec<VolumeGroup>>;

    fn remove_volume_group(&self, name: &str) -> Result<()>;

    fn remove_physical_volume(&self, path: &str) -> Result<()>;
}

/// One step of releasing a disk from the volume manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeardownStep {
    RemoveVolumeGroup(String),
    RemovePhysicalVolume(String),
}

/// Whether `device` is `disk_path` itself or one of its partitions
pub fn belongs_to_disk(device: &str, disk_path: &str) -> bool {
    let Some(rest) = device.strip_prefix(disk_path) else {
        return false;
    };
    if rest.is_empty() {
        return true;
    }

    let number = if disk_path.ends_with(|c: char| c.is_ascii_digit()) {
        match rest.strip_prefix('p') {
            Some(number) => number,
            None => return false,
        }
    } else {
        rest
    };

    !number.is_empty() && number.chars().all(|c| c.is_ascii_digit())
}

/// Ordered steps that detach `disk_path` from every volume group using it.
///
/// An in-use physical volume cannot be removed while a group still claims it,
/// so each affected group is removed before its physical volumes on the disk.
pub fn teardown_plan(disk_path: &str, groups: &[VolumeGroup]) -> Vec<TeardownStep> {
    let mut steps = Vec::new();

    for group in groups {
        let on_disk = group.physical_volumes_where(|pv| belongs_to_disk(&pv.path, disk_path));
        if on_disk.is_empty() {
            continue;
        }

        steps.push(TeardownStep::RemoveVolumeGroup(group.name.clone()));
        for pv in on_disk {
            let step = TeardownStep::RemovePhysicalVolume(pv.path.clone());
            if !steps.contains(&step) {
                steps.push(step);
            }
        }
    }

    steps
}
