// SPDX-License-Identifier: GPL-3.0-only

//! Disk lookup and resynchronisation through `parted`

use storage_types::Disk;
use tracing::{debug, warn};

use crate::error::{Result, ResultExt, SysError};
use crate::exec::{CommandLine, CommandRunner};

/// `parted -sj <disk> unit MiB print`
pub fn describe_command(identifier: &str) -> CommandLine {
    CommandLine::new("parted").args(["-sj", identifier, "unit", "MiB", "print"])
}

/// Query the partition tool and decode a fresh [`Disk`] snapshot
pub fn locate_disk(runner: &dyn CommandRunner, identifier: &str) -> Result<Disk> {
    debug!("Looking up disk {identifier}");

    let output = runner
        .output(&describe_command(identifier))
        .op_context("locate disk", identifier)?;

    if output.stdout.trim().is_empty() {
        let reason = if output.stderr.trim().is_empty() {
            "no description returned".to_string()
        } else {
            output.stderr.trim().to_string()
        };
        return Err(SysError::Lookup(format!("could not find device: {reason}")))
            .op_context("locate disk", identifier);
    }

    // Disks without a recognised table make parted fail while still printing
    // the full report, so the output wins over the exit status.
    if !output.success() {
        warn!(
            "parted exited with {:?} for {identifier}; decoding its report anyway",
            output.code
        );
    }

    let disk = Disk::from_parted_json(&output.stdout).op_context("locate disk", identifier)?;
    debug!(
        "Found {} with {} partition(s)",
        disk.display_name(),
        disk.partitions.len()
    );
    Ok(disk)
}

/// Replace every field of `disk` with a fresh lookup of the same device
pub fn update_disk(runner: &dyn CommandRunner, disk: &mut Disk) -> Result<()> {
    let fresh = locate_disk(runner, &disk.path).op_context("update disk", disk.path.clone())?;
    disk.replace_with(fresh);
    Ok(())
}
