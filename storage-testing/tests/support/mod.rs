#![allow(dead_code)]

use std::time::Duration;

use storage_sys::Poller;
use storage_testing::DiskSpec;
use storage_testing::spec::load_by_name;
use storage_types::Disk;

pub fn fixture(name: &str) -> DiskSpec {
    storage_testing::init_tracing();
    load_by_name(name).unwrap()
}

pub fn snapshot(spec: &DiskSpec) -> Disk {
    Disk::from_parted_json(&spec.to_parted_json()).unwrap()
}

/// Poller that never sleeps
pub fn instant_poller(timeout: Duration) -> Poller {
    Poller::new(Duration::ZERO, Duration::ZERO, timeout)
}

/// `lsblk -nro TYPE <disk>` output for a disk with `count` partitions
pub fn lsblk_types(count: usize) -> String {
    let mut out = String::from("disk\n");
    for _ in 0..count {
        out.push_str("part\n");
    }
    out
}
