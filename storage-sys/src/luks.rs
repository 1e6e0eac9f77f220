// SPDX-License-Identifier: GPL-3.0-only

//! LUKS encrypted volumes through `cryptsetup`
//!
//! Opened volumes are mapped as `<mapper_dir>/<mapping>`. Volumes created by
//! the installer always use `luks-<uuid>`, where `<uuid>` is the UUID of the
//! raw (encrypted) partition; whatever writes crypttab must use the same name.

use std::fs;
use std::io;
use std::path::PathBuf;

use storage_types::Partition;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{Result, ResultExt, SysError};
use crate::exec::{CommandLine, CommandRunner};
use crate::filesystem::{make_fs, partition_uuid, set_label};

/// `cryptsetup isLuks` exit status for a device without a LUKS header
pub const NOT_LUKS_EXIT_CODE: i32 = 1;

/// `cryptsetup open` exit status when the device or mapping is already in use
pub const MAPPING_BUSY_EXIT_CODE: i32 = 5;

/// Mapping name for the encrypted partition with filesystem UUID `uuid`
pub fn luks_mapping_name(uuid: &str) -> String {
    format!("luks-{uuid}")
}

/// Device node of the opened mapping for `uuid`
pub fn mapped_device_path(settings: &Settings, uuid: &str) -> PathBuf {
    settings.mapper_dir.join(luks_mapping_name(uuid))
}

pub fn is_luks(runner: &dyn CommandRunner, partition: &Partition) -> Result<bool> {
    is_path_luks(runner, &partition.path)
}

/// Whether `path` carries a LUKS header.
///
/// Only the tool's dedicated "not LUKS" status means `false`; any other
/// failure is reported as an error.
pub fn is_path_luks(runner: &dyn CommandRunner, path: &str) -> Result<bool> {
    let command = CommandLine::new("cryptsetup").args(["isLuks", path]);
    let output = runner.output(&command).op_context("probe luks", path)?;

    match output.code {
        Some(0) => Ok(true),
        Some(NOT_LUKS_EXIT_CODE) => Ok(false),
        _ => output.check(&command).map(|_| false).op_context("probe luks", path),
    }
}

/// Map `partition` as `mapping`. Fails if the mapping already exists.
///
/// An empty `password` leaves stdin attached so cryptsetup can prompt.
pub fn luks_open(
    runner: &dyn CommandRunner,
    partition: &Partition,
    mapping: &str,
    password: &str,
) -> Result<()> {
    let mut command =
        CommandLine::new("cryptsetup").args(["open", partition.path.as_str(), mapping]);
    if !password.is_empty() {
        command = command.stdin(password);
    }

    info!("Opening {} as {mapping}", partition.path);
    let output = runner
        .output(&command)
        .op_context("open luks", partition.path.clone())?;

    if output.code == Some(MAPPING_BUSY_EXIT_CODE) {
        return Err(SysError::StateConflict(format!(
            "mapping {mapping} is already in use"
        )))
        .op_context("open luks", partition.path.clone());
    }

    output
        .check(&command)
        .map(|_| ())
        .op_context("open luks", partition.path.clone())
}

/// Open `partition` as `mapping` unless the mapped device already exists
pub fn luks_try_open(
    runner: &dyn CommandRunner,
    settings: &Settings,
    partition: &Partition,
    mapping: &str,
    password: &str,
) -> Result<()> {
    let node = settings.mapper_dir.join(mapping);

    match fs::metadata(&node) {
        Ok(_) => {
            debug!("{} already exists, not reopening", node.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            luks_open(runner, partition, mapping, password)
        }
        Err(e) => Err(e).op_context("try open luks", node.display().to_string()),
    }
}

pub fn luks_close(runner: &dyn CommandRunner, mapping: &str) -> Result<()> {
    info!("Closing LUKS mapping {mapping}");
    runner
        .run(&CommandLine::new("cryptsetup").args(["close", mapping]))
        .op_context("close luks", mapping)
}

/// Write a new LUKS header to `partition`. Destroys existing contents without confirmation.
pub fn luks_format(runner: &dyn CommandRunner, partition: &Partition, password: &str) -> Result<()> {
    let command = CommandLine::new("cryptsetup")
        .args(["-q", "luksFormat", partition.path.as_str()])
        .stdin(password);

    info!("Formatting {} as LUKS", partition.path);
    runner
        .run(&command)
        .op_context("format luks", partition.path.clone())
}

/// The opened mapping of `partition`, carrying its requested filesystem
fn mapped_partition(
    runner: &dyn CommandRunner,
    settings: &Settings,
    partition: &Partition,
) -> Result<Partition> {
    let raw = partition_uuid(runner, partition)?;
    let uuid = Uuid::parse_str(&raw)
        .map_err(|e| SysError::Parse(format!("invalid LUKS UUID {raw:?}: {e}")))?
        .hyphenated()
        .to_string();
    let node = mapped_device_path(settings, &uuid);

    match fs::metadata(&node) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SysError::Precondition(format!(
                "{} is not open as {}",
                partition.path,
                luks_mapping_name(&uuid)
            )));
        }
        Err(e) => return Err(e.into()),
    }

    let mut inner = Partition::at_path(node.display().to_string());
    inner.filesystem = partition.filesystem;
    Ok(inner)
}

/// Create the partition's requested filesystem inside its opened LUKS mapping
pub fn luks_make_fs(
    runner: &dyn CommandRunner,
    settings: &Settings,
    partition: &Partition,
) -> Result<()> {
    let inner = mapped_partition(runner, settings, partition)
        .op_context("make luks filesystem", partition.path.clone())?;
    make_fs(runner, &inner).op_context("make luks filesystem", partition.path.clone())
}

/// Label the filesystem inside the partition's opened LUKS mapping
pub fn luks_set_label(
    runner: &dyn CommandRunner,
    settings: &Settings,
    partition: &Partition,
    label: &str,
) -> Result<()> {
    let inner = mapped_partition(runner, settings, partition)
        .op_context("label luks filesystem", partition.path.clone())?;
    set_label(runner, &inner, label).op_context("label luks filesystem", partition.path.clone())
}

/// Filesystem reported for `path`, ignoring the LUKS header itself.
///
/// For an opened volume this is the inner filesystem; `None` when nothing
/// but the header is visible.
pub fn luks_filesystem_by_path(runner: &dyn CommandRunner, path: &str) -> Result<Option<String>> {
    let output = runner
        .capture(&CommandLine::new("lsblk").args(["-n", "-o", "FSTYPE", path]))
        .op_context("read luks filesystem", path)?;

    Ok(output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.contains("crypto_LUKS"))
        .map(str::to_string))
}
