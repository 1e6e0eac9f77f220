// SPDX-License-Identifier: GPL-3.0-only

//! Storage provisioning for OS installers
//!
//! This crate sequences the external tools that prepare a target disk:
//! - Disk lookup and resynchronisation (`parted -j`)
//! - Partition creation with a bounded wait for the kernel to catch up
//! - Relabeling, after unmounting and tearing down LVM on the disk
//! - LUKS open/close/format and filesystems inside opened mappings
//! - The bind-mount stack needed to run commands inside a chroot
//!
//! Every operation takes a [`CommandRunner`]; nothing touches devices
//! directly. These operations require elevated privileges.

pub mod chroot;
pub mod config;
pub mod disk;
pub mod error;
pub mod exec;
pub mod filesystem;
pub mod logical;
pub mod luks;
pub mod partition;
pub mod poll;
pub mod relabel;

pub use chroot::{
    RUNTIME_BINDS, mount_chroot_runtime, run_in_chroot_runtime, unmount_chroot_runtime,
    with_chroot_runtime,
};
pub use config::{ConvergenceSettings, Settings};
pub use disk::{locate_disk, update_disk};
pub use error::{ErrorKind, Result, ResultExt, SysError};
pub use exec::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
pub use filesystem::{
    is_mounted, make_fs, mount_partition, mount_points, name_partition, partition_uuid,
    set_label, unmount_partition,
};
pub use logical::lvm_tools::LvmTools;
pub use logical::{TeardownStep, VolumeManager, belongs_to_disk, teardown_plan};
pub use luks::{
    is_luks, is_path_luks, luks_close, luks_filesystem_by_path, luks_format, luks_make_fs,
    luks_mapping_name, luks_open, luks_set_label, luks_try_open, mapped_device_path,
};
pub use partition::{kernel_partition_count, new_partition};
pub use poll::{CancelToken, Poller};
pub use relabel::label_disk;
