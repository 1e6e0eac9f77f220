// SPDX-License-Identifier: GPL-3.0-only

//! Destructive partition table relabeling

use storage_types::{Disk, DiskLabel};
use tracing::{debug, info};

use crate::disk::update_disk;
use crate::error::{Result, ResultExt, SysError};
use crate::exec::{CommandLine, CommandRunner};
use crate::filesystem::unmount_partition;
use crate::logical::{TeardownStep, VolumeManager, teardown_plan};

/// `parted -s <disk> mklabel <label>`
pub fn mklabel_command(disk_path: &str, label: DiskLabel) -> Result<CommandLine> {
    let label = label.as_parted_str().ok_or_else(|| {
        SysError::Precondition("cannot write an unknown partition table label".to_string())
    })?;
    Ok(CommandLine::new("parted").args(["-s", disk_path, "mklabel", label]))
}

fn run_teardown(volumes: &dyn VolumeManager, steps: &[TeardownStep]) -> Result<()> {
    for step in steps {
        match step {
            TeardownStep::RemoveVolumeGroup(name) => volumes.remove_volume_group(name)?,
            TeardownStep::RemovePhysicalVolume(path) => volumes.remove_physical_volume(path)?,
        }
    }
    Ok(())
}

/// Replace the partition table of `disk` with an empty one of `label`.
///
/// Every partition is unmounted and every volume group using the disk is
/// removed first. Any failure before `mklabel` leaves the table untouched.
pub fn label_disk(
    runner: &dyn CommandRunner,
    volumes: &dyn VolumeManager,
    disk: &mut Disk,
    label: DiskLabel,
) -> Result<()> {
    let command = mklabel_command(&disk.path, label).op_context("label disk", disk.path.clone())?;

    for partition in &disk.partitions {
        unmount_partition(runner, partition)
            .op_context("unmount partition", partition.path.clone())?;
    }

    let groups = volumes
        .volume_groups()
        .op_context("release volume groups", disk.path.clone())?;
    let plan = teardown_plan(&disk.path, &groups);
    debug!("Teardown plan for {}: {plan:?}", disk.path);
    run_teardown(volumes, &plan).op_context("release volume groups", disk.path.clone())?;

    info!("Writing {label} partition table to {}", disk.path);
    runner.run(&command).op_context("label disk", disk.path.clone())?;

    update_disk(runner, disk).op_context("label disk", disk.path.clone())
}
