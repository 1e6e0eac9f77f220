// SPDX-License-Identifier: GPL-3.0-only

//! Domain models for installer storage provisioning
//!
//! These types are snapshots of external state. They are produced by lookups
//! in `storage-sys` and replaced wholesale after any mutation:
//!
//! - `Disk` -> partition table snapshot decoded from the partition tool
//! - `Partition` -> one entry of that table, or a standalone device
//! - `Sector` -> unallocated range computed on demand
//! - `VolumeGroup` / `PhysicalVolume` -> LVM structures claiming a disk

pub mod common;
pub mod disk;
pub mod error;
pub mod filesystem;
pub mod lvm;
pub mod partition;

pub use common::{Quantity, SizeUnit};
pub use disk::{Disk, DiskLabel, Sector};
pub use error::ModelError;
pub use filesystem::FilesystemKind;
pub use lvm::{PhysicalVolume, VolumeGroup};
pub use partition::{Partition, PartitionEnd, partition_device_path};
