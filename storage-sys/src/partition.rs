// SPDX-License-Identifier: GPL-3.0-only

//! Partition creation
//!
//! Creating a partition is a sequence of external steps: `parted mkpart`,
//! waiting for the kernel to expose the new block device, resynchronising the
//! snapshot, then formatting and naming. A failure stops the sequence where it
//! is; nothing is rolled back, so callers must call
//! [`crate::disk::update_disk`] before trusting the snapshot again.

use std::collections::BTreeSet;

use storage_types::{Disk, DiskLabel, FilesystemKind, Partition, PartitionEnd};
use tracing::{debug, info};

use crate::disk::update_disk;
use crate::error::{Result, ResultExt, SysError};
use crate::exec::{CommandLine, CommandRunner};
use crate::filesystem::{make_fs, name_partition, set_label};
use crate::poll::Poller;

/// `parted mkpart` invocation for a new partition on `disk`
pub fn mkpart_command(
    disk: &Disk,
    name: &str,
    filesystem: Option<FilesystemKind>,
    start: u64,
    end: PartitionEnd,
) -> CommandLine {
    let mut command =
        CommandLine::new("parted").args(["-s", disk.path.as_str(), "unit", "MiB", "mkpart"]);

    if disk.label == DiskLabel::Msdos {
        command = command.arg("primary");
    }
    if !name.is_empty() {
        command = command.arg(format!("\"{name}\""));
    }
    if let Some(kind) = filesystem {
        command = command.arg(kind.as_str());
    }

    command.arg(start.to_string()).arg(end.to_parted_arg())
}

/// Number of partition block devices the kernel currently exposes for `disk_path`
pub fn kernel_partition_count(runner: &dyn CommandRunner, disk_path: &str) -> Result<usize> {
    let output = runner.capture(&CommandLine::new("lsblk").args(["-nro", "TYPE", disk_path]))?;
    Ok(output.lines().filter(|line| line.trim() == "part").count())
}

/// Ask the kernel to re-read the table, then poll until the partition count
/// differs from the one in the (pre-creation) snapshot.
fn wait_for_new_partition(runner: &dyn CommandRunner, poller: &Poller, disk: &Disk) -> Result<()> {
    runner.run(&CommandLine::new("partprobe").arg(&disk.path))?;

    let known = disk.partitions.len();
    poller.poll("partition table convergence", |attempt| {
        let count = kernel_partition_count(runner, &disk.path)?;
        debug!(
            "Attempt {attempt}: kernel reports {count} partition(s) on {}, snapshot has {known}",
            disk.path
        );
        Ok((count != known).then_some(()))
    })
}

/// Create a partition and optionally format and name it.
///
/// `filesystem == None` leaves the partition raw (e.g. to format it with LUKS
/// first). An empty `name` skips both the volume label and the table name.
pub fn new_partition(
    runner: &dyn CommandRunner,
    poller: &Poller,
    disk: &mut Disk,
    name: &str,
    filesystem: Option<FilesystemKind>,
    start: u64,
    end: PartitionEnd,
) -> Result<Partition> {
    if let Some(kind) = filesystem
        && !kind.can_format()
    {
        return Err(SysError::Precondition(format!(
            "unsupported filesystem: {kind}"
        )))
        .op_context("create partition", disk.path.clone());
    }

    let previous: BTreeSet<u32> = disk.partitions.iter().map(|part| part.number).collect();

    info!(
        "Creating partition {name:?} on {} from {start}MiB to {}",
        disk.path,
        end.to_parted_arg()
    );
    runner
        .run(&mkpart_command(disk, name, filesystem, start, end))
        .op_context("create partition", disk.path.clone())?;

    wait_for_new_partition(runner, poller, disk)
        .op_context("wait for new partition", disk.path.clone())?;

    update_disk(runner, disk).op_context("refresh partitions", disk.path.clone())?;

    let index = disk
        .partitions
        .iter()
        .position(|part| !previous.contains(&part.number))
        .ok_or_else(|| {
            SysError::Lookup("new partition missing from refreshed table".to_string())
        })
        .op_context("refresh partitions", disk.path.clone())?;

    let mut partition = disk.partitions[index].clone();
    debug!("New partition is {} (#{})", partition.path, partition.number);

    if let Some(kind) = filesystem {
        partition.filesystem = Some(kind);
        make_fs(runner, &partition)?;
        if !name.is_empty() {
            set_label(runner, &partition, name)?;
        }
    }

    if !name.is_empty() {
        name_partition(runner, &partition, name)?;
        partition.name = Some(name.to_string());
    }

    disk.partitions[index] = partition.clone();
    Ok(partition)
}
