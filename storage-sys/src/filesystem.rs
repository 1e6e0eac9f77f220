// SPDX-License-Identifier: GPL-3.0-only

//! Filesystem creation, labelling and mount handling for partitions

use std::path::Path;

use storage_types::{FilesystemKind, Partition};
use tracing::{debug, info};

use crate::error::{Result, ResultExt, SysError};
use crate::exec::{CommandLine, CommandRunner};

fn requested_filesystem(partition: &Partition) -> Result<FilesystemKind> {
    partition.filesystem.ok_or_else(|| {
        SysError::Precondition(format!("no filesystem set for {}", partition.path))
    })
}

fn unsupported(kind: FilesystemKind) -> SysError {
    SysError::Precondition(format!("unsupported filesystem: {kind}"))
}

/// Command creating a `kind` filesystem on `path`
pub fn mkfs_command(kind: FilesystemKind, path: &str) -> Result<CommandLine> {
    let command = match kind {
        FilesystemKind::Fat16 => CommandLine::new("mkfs.fat").args(["-I", "-F", "16", path]),
        FilesystemKind::Fat32 => CommandLine::new("mkfs.fat").args(["-I", "-F", "32", path]),
        FilesystemKind::Ext2 | FilesystemKind::Ext3 | FilesystemKind::Ext4 => {
            CommandLine::new(format!("mkfs.{kind}")).args(["-F", path])
        }
        FilesystemKind::LinuxSwap => CommandLine::new("mkswap").args(["-f", path]),
        FilesystemKind::Hfs | FilesystemKind::HfsPlus | FilesystemKind::Udf => {
            return Err(unsupported(kind));
        }
        FilesystemKind::Btrfs
        | FilesystemKind::Ntfs
        | FilesystemKind::ReiserFs
        | FilesystemKind::Xfs => CommandLine::new(format!("mkfs.{kind}")).args(["-f", path]),
    };
    Ok(command)
}

/// Command setting the volume label of a `kind` filesystem
pub fn label_command(kind: FilesystemKind, path: &str, label: &str) -> Result<CommandLine> {
    let command = match kind {
        FilesystemKind::Ext2 | FilesystemKind::Ext3 | FilesystemKind::Ext4 => {
            CommandLine::new("e2label").args([path, label])
        }
        FilesystemKind::Fat16 | FilesystemKind::Fat32 => {
            CommandLine::new("fatlabel").args([path, label])
        }
        FilesystemKind::Btrfs => {
            CommandLine::new("btrfs").args(["filesystem", "label", path, label])
        }
        FilesystemKind::Xfs => CommandLine::new("xfs_admin").args(["-L", label, path]),
        FilesystemKind::LinuxSwap => CommandLine::new("swaplabel").args(["-L", label, path]),
        FilesystemKind::Ntfs => CommandLine::new("ntfslabel").args([path, label]),
        FilesystemKind::ReiserFs => CommandLine::new("reiserfstune").args(["-l", label, path]),
        FilesystemKind::Hfs | FilesystemKind::HfsPlus | FilesystemKind::Udf => {
            return Err(unsupported(kind));
        }
    };
    Ok(command)
}

/// Create the partition's requested filesystem. Destroys existing contents.
pub fn make_fs(runner: &dyn CommandRunner, partition: &Partition) -> Result<()> {
    let kind = requested_filesystem(partition).op_context("make filesystem", &partition.path)?;
    let command = mkfs_command(kind, &partition.path).op_context("make filesystem", &partition.path)?;

    info!("Creating {kind} filesystem on {}", partition.path);
    runner
        .run(&command)
        .op_context("make filesystem", &partition.path)
}

/// Set the filesystem volume label
pub fn set_label(runner: &dyn CommandRunner, partition: &Partition, label: &str) -> Result<()> {
    let kind = requested_filesystem(partition).op_context("set label", &partition.path)?;
    let command = label_command(kind, &partition.path, label).op_context("set label", &partition.path)?;

    debug!("Labelling {} as {label:?}", partition.path);
    runner.run(&command).op_context("set label", &partition.path)
}

/// Set the partition table name attribute (distinct from the volume label)
pub fn name_partition(runner: &dyn CommandRunner, partition: &Partition, name: &str) -> Result<()> {
    let disk_path = partition.disk_path.as_deref().ok_or_else(|| {
        SysError::Precondition(format!(
            "{} does not belong to a known disk",
            partition.path
        ))
    });
    let disk_path = disk_path.op_context("name partition", &partition.path)?;

    let command = CommandLine::new("parted").args([
        "-s".to_string(),
        disk_path.to_string(),
        "name".to_string(),
        partition.number.to_string(),
        format!("\"{name}\""),
    ]);

    debug!("Naming partition {} {name:?}", partition.path);
    runner.run(&command).op_context("name partition", &partition.path)
}

/// Filesystem UUID of the partition, as reported by `lsblk`.
///
/// FAT volume IDs (`ABCD-1234`) are returned as is.
pub fn partition_uuid(runner: &dyn CommandRunner, partition: &Partition) -> Result<String> {
    let command =
        CommandLine::new("lsblk").args(["-d", "-n", "-o", "UUID", partition.path.as_str()]);
    let output = runner.capture(&command).op_context("read uuid", &partition.path)?;

    let uuid = output.trim();
    if uuid.is_empty() {
        return Err(SysError::Lookup("device has no UUID".to_string()))
            .op_context("read uuid", &partition.path);
    }
    Ok(uuid.to_string())
}

/// Current mount points of the partition
pub fn mount_points(runner: &dyn CommandRunner, partition: &Partition) -> Result<Vec<String>> {
    let command = CommandLine::new("findmnt").args([
        "-n",
        "-r",
        "-o",
        "TARGET",
        "--source",
        partition.path.as_str(),
    ]);
    let output = runner.output(&command).op_context("list mounts", &partition.path)?;

    // findmnt exits with 1 when nothing matches
    if output.code == Some(1) && output.stdout.trim().is_empty() {
        return Ok(Vec::new());
    }

    let output = output.check(&command).op_context("list mounts", &partition.path)?;
    Ok(output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn is_mounted(runner: &dyn CommandRunner, partition: &Partition) -> Result<bool> {
    Ok(!mount_points(runner, partition)?.is_empty())
}

/// Unmount every mount point of the partition, innermost first. No-op if unmounted.
pub fn unmount_partition(runner: &dyn CommandRunner, partition: &Partition) -> Result<()> {
    let targets = mount_points(runner, partition)?;
    for target in targets.iter().rev() {
        info!("Unmounting {} from {target}", partition.path);
        runner
            .run(&CommandLine::new("umount").arg(target))
            .op_context("unmount", &partition.path)?;
    }
    Ok(())
}

/// Mount the partition at `target`
pub fn mount_partition(runner: &dyn CommandRunner, partition: &Partition, target: &Path) -> Result<()> {
    let target = target.display().to_string();
    info!("Mounting {} at {target}", partition.path);
    runner
        .run(&CommandLine::new("mount").args([partition.path.as_str(), target.as_str()]))
        .op_context("mount", &partition.path)
}
