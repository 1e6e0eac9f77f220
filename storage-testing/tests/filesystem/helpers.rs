#[path = "../support/mod.rs"]
mod support;

use std::path::Path;

use storage_sys::{
    CommandOutput, ErrorKind, is_mounted, make_fs, mount_partition, mount_points, name_partition,
    partition_uuid, set_label, unmount_partition,
};
use storage_testing::ScriptedRunner;
use storage_types::{FilesystemKind, Partition};

use support::{fixture, snapshot};

#[test]
fn findmnt_without_matches_means_unmounted() {
    let runner = ScriptedRunner::new().on(
        "findmnt -n -r -o TARGET --source /dev/sda2",
        CommandOutput::failed(1, ""),
    );
    let partition = Partition::at_path("/dev/sda2");

    assert!(mount_points(&runner, &partition).unwrap().is_empty());
    assert!(!is_mounted(&runner, &partition).unwrap());
}

#[test]
fn unmounts_stacked_mounts_innermost_first() {
    let runner = ScriptedRunner::new().on_ok(
        "findmnt -n -r -o TARGET --source /dev/sda3",
        "/mnt/target\n/mnt/target/home\n",
    );
    let partition = Partition::at_path("/dev/sda3");

    unmount_partition(&runner, &partition).unwrap();
    let calls = runner.calls();
    assert_eq!(calls[1], "umount /mnt/target/home");
    assert_eq!(calls[2], "umount /mnt/target");
}

#[test]
fn mount_uses_device_and_target() {
    let runner = ScriptedRunner::new();
    mount_partition(&runner, &Partition::at_path("/dev/sda3"), Path::new("/mnt/target")).unwrap();
    assert_eq!(runner.calls(), vec!["mount /dev/sda3 /mnt/target"]);
}

#[test]
fn make_fs_requires_a_filesystem() {
    let runner = ScriptedRunner::new();
    let error = make_fs(&runner, &Partition::at_path("/dev/sda3")).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Precondition);
    assert!(runner.calls().is_empty());
}

#[test]
fn swap_gets_its_own_tools() {
    let runner = ScriptedRunner::new();
    let swap = Partition::at_path("/dev/sda2").with_filesystem(FilesystemKind::LinuxSwap);

    make_fs(&runner, &swap).unwrap();
    set_label(&runner, &swap, "swap").unwrap();
    assert_eq!(
        runner.calls(),
        vec!["mkswap -f /dev/sda2", "swaplabel -L swap /dev/sda2"]
    );
}

#[test]
fn table_name_needs_an_owning_disk() {
    let runner = ScriptedRunner::new();
    let error = name_partition(&runner, &Partition::at_path("/dev/mapper/root"), "root").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Precondition);

    let disk = snapshot(&fixture("nvme-gpt"));
    name_partition(&runner, &disk.partitions[0], "EFI System").unwrap();
    assert_eq!(
        runner.calls(),
        vec!["parted -s /dev/nvme0n1 name 1 \"EFI System\""]
    );
}

#[test]
fn uuid_is_read_verbatim() {
    let runner = ScriptedRunner::new()
        .on_ok("lsblk -d -n -o UUID /dev/sda1", "0A1B-2C3D\n")
        .on_ok("lsblk -d -n -o UUID /dev/sda2", "\n");

    assert_eq!(
        partition_uuid(&runner, &Partition::at_path("/dev/sda1")).unwrap(),
        "0A1B-2C3D"
    );
    let error = partition_uuid(&runner, &Partition::at_path("/dev/sda2")).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Lookup);
}
