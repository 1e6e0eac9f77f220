// SPDX-License-Identifier: GPL-3.0-only

//! Virtual filesystems bind-mounted into a target root for chroot commands

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, ResultExt, SysError};
use crate::exec::{CommandLine, CommandRunner};

/// Host paths bound into the target root, parents before children
pub const RUNTIME_BINDS: [&str; 5] = ["/dev", "/dev/pts", "/proc", "/sys", "/run"];

fn checked_root(root: &Path) -> Result<()> {
    if root.as_os_str().is_empty() {
        return Err(SysError::Precondition(
            "no target root specified".to_string(),
        ));
    }
    Ok(())
}

fn bind_target(root: &Path, bind: &str) -> PathBuf {
    root.join(bind.trim_start_matches('/'))
}

fn mount_bind(runner: &dyn CommandRunner, root: &Path, bind: &str) -> Result<()> {
    let target = bind_target(root, bind).display().to_string();
    info!("Binding {bind} to {target}");
    runner
        .run(&CommandLine::new("mount").args(["--bind", bind, target.as_str()]))
        .op_context("bind mount", target)
}

fn unmount_bind(runner: &dyn CommandRunner, root: &Path, bind: &str) -> Result<()> {
    let target = bind_target(root, bind).display().to_string();
    info!("Unmounting {target}");
    runner
        .run(&CommandLine::new("umount").args(["--recursive", target.as_str()]))
        .op_context("unmount bind", target)
}

/// Bind every [`RUNTIME_BINDS`] entry into `root`, in order.
///
/// Stops at the first failure and leaves earlier binds mounted; callers still
/// need [`unmount_chroot_runtime`]. [`with_chroot_runtime`] handles that.
pub fn mount_chroot_runtime(runner: &dyn CommandRunner, root: &Path) -> Result<()> {
    checked_root(root).op_context("mount chroot runtime", root.display().to_string())?;
    for bind in RUNTIME_BINDS {
        mount_bind(runner, root, bind)
            .op_context("mount chroot runtime", root.display().to_string())?;
    }
    Ok(())
}

/// Recursively unmount every [`RUNTIME_BINDS`] entry from `root`, last bound first
pub fn unmount_chroot_runtime(runner: &dyn CommandRunner, root: &Path) -> Result<()> {
    checked_root(root).op_context("unmount chroot runtime", root.display().to_string())?;
    for bind in RUNTIME_BINDS.iter().rev() {
        unmount_bind(runner, root, bind)
            .op_context("unmount chroot runtime", root.display().to_string())?;
    }
    Ok(())
}

/// Run `f` with the runtime bound into `root`.
///
/// Whatever was mounted is unmounted again in reverse order, also when
/// mounting or `f` fails. The first error wins; later teardown errors are
/// only logged.
pub fn with_chroot_runtime<T, F>(runner: &dyn CommandRunner, root: &Path, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    checked_root(root).op_context("mount chroot runtime", root.display().to_string())?;

    let mut mounted = Vec::with_capacity(RUNTIME_BINDS.len());
    let mut result = Ok(());
    for bind in RUNTIME_BINDS {
        if let Err(e) = mount_bind(runner, root, bind) {
            result = Err(e).op_context("mount chroot runtime", root.display().to_string());
            break;
        }
        mounted.push(bind);
    }

    let result = result.and_then(|()| f());

    let mut teardown = Ok(());
    for bind in mounted.iter().rev() {
        if let Err(e) = unmount_bind(runner, root, bind) {
            if teardown.is_ok() && result.is_ok() {
                teardown = Err(e);
            } else {
                warn!("Ignoring teardown failure after earlier error: {e}");
            }
        }
    }

    let value = result?;
    teardown.op_context("unmount chroot runtime", root.display().to_string())?;
    Ok(value)
}

/// Run `command` inside `root` with the runtime mounted for the duration
pub fn run_in_chroot_runtime(
    runner: &dyn CommandRunner,
    root: &Path,
    command: &CommandLine,
) -> Result<()> {
    with_chroot_runtime(runner, root, || runner.run_in_chroot(root, command))
}
