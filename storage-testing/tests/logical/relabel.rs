#[path = "../support/mod.rs"]
mod support;

use storage_sys::{ErrorKind, LvmTools, label_disk, locate_disk};
use storage_testing::{RecordingVolumeManager, ScriptedRunner};
use storage_types::{DiskLabel, ModelError};

use support::{fixture, snapshot};

#[test]
fn tears_down_in_dependency_order_before_mklabel() {
    let spec = fixture("sata-gpt");
    let runner = ScriptedRunner::new()
        .on_ok("findmnt -n -r -o TARGET --source /dev/sda1", "/mnt/target/boot/efi\n")
        .on_ok("parted -sj /dev/sda", &spec.relabeled("msdos").to_parted_json());
    let volumes = RecordingVolumeManager::new(&runner)
        .with_group("vg_other", &["/dev/sdc1"])
        .with_group("vg_root", &["/dev/sda3", "/dev/sdb1"]);

    let mut disk = snapshot(&spec);
    label_disk(&runner, &volumes, &mut disk, DiskLabel::Msdos).unwrap();

    let unmount = runner.position("umount /mnt/target/boot/efi").unwrap();
    let vgremove = runner.position("vgremove -f vg_root").unwrap();
    let pvremove = runner.position("pvremove -f -y /dev/sda3").unwrap();
    let mklabel = runner.position("parted -s /dev/sda mklabel msdos").unwrap();
    assert!(unmount < vgremove);
    assert!(vgremove < pvremove);
    assert!(pvremove < mklabel);

    assert_eq!(runner.count("vgremove -f vg_other"), 0);
    assert_eq!(runner.count("pvremove -f -y /dev/sdb1"), 0);

    assert_eq!(disk.label, DiskLabel::Msdos);
    assert!(disk.partitions.is_empty());
}

#[test]
fn every_physical_volume_on_the_disk_follows_its_group() {
    let spec = fixture("nvme-gpt");
    let runner = ScriptedRunner::new()
        .on_ok("parted -sj /dev/nvme0n1", &spec.relabeled("gpt").to_parted_json());
    let volumes = RecordingVolumeManager::new(&runner)
        .with_group("vg_a", &["/dev/nvme0n1p2"])
        .with_group("vg_b", &["/dev/nvme0n1p3", "/dev/nvme0n1p4"]);

    let mut disk = snapshot(&spec);
    label_disk(&runner, &volumes, &mut disk, DiskLabel::Gpt).unwrap();

    for (group, pv) in [
        ("vg_a", "/dev/nvme0n1p2"),
        ("vg_b", "/dev/nvme0n1p3"),
        ("vg_b", "/dev/nvme0n1p4"),
    ] {
        let vgremove = runner.position(&format!("vgremove -f {group}")).unwrap();
        let pvremove = runner.position(&format!("pvremove -f -y {pv}")).unwrap();
        assert!(vgremove < pvremove, "{group} must go before {pv}");
    }
}

#[test]
fn failed_group_removal_prevents_relabel() {
    let spec = fixture("sata-gpt");
    let runner = ScriptedRunner::new().on_exit("vgremove", 5);
    let volumes = RecordingVolumeManager::new(&runner).with_group("vg_root", &["/dev/sda3"]);

    let mut disk = snapshot(&spec);
    let error = label_disk(&runner, &volumes, &mut disk, DiskLabel::Gpt).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Command);
    assert_eq!(
        error.operations(),
        vec!["release volume groups", "remove volume group"]
    );
    assert_eq!(runner.count("pvremove"), 0);
    assert_eq!(runner.count("parted -s /dev/sda mklabel"), 0);
    // Untouched snapshot
    assert_eq!(disk.partitions.len(), 3);
}

#[test]
fn failed_unmount_stops_before_volume_teardown() {
    let spec = fixture("sata-gpt");
    let runner = ScriptedRunner::new()
        .on_ok("findmnt -n -r -o TARGET --source /dev/sda3", "/mnt/target\n")
        .on_exit("umount", 32);
    let volumes = RecordingVolumeManager::new(&runner).with_group("vg_root", &["/dev/sda3"]);

    let mut disk = snapshot(&spec);
    let error = label_disk(&runner, &volumes, &mut disk, DiskLabel::Gpt).unwrap_err();

    assert_eq!(error.operations()[0], "unmount partition");
    assert!(error.to_string().contains("/dev/sda3"));
    assert_eq!(runner.count("vgremove"), 0);
    assert_eq!(runner.count("parted -s /dev/sda mklabel"), 0);
}

#[test]
fn unknown_label_is_rejected_up_front() {
    let runner = ScriptedRunner::new();
    let volumes = RecordingVolumeManager::new(&runner);
    let mut disk = snapshot(&fixture("blank"));

    let error = label_disk(&runner, &volumes, &mut disk, DiskLabel::Unknown).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Precondition);
    assert!(runner.calls().is_empty());
}

#[test]
fn old_dos_disk_is_located_and_wiped_with_lvm_tools() {
    let spec = fixture("legacy-msdos");
    let runner = ScriptedRunner::new()
        .on_ok("parted -sj /dev/sdc", &spec.to_parted_json())
        .on_ok("parted -sj /dev/sdc", &spec.relabeled("gpt").to_parted_json())
        .on_ok("vgs", "  vg_old\n  vg_usb\n")
        .on_ok("pvs", "  /dev/sdc2\tvg_old\n  /dev/sdd1\tvg_usb\n  /dev/sde1\t\n");
    let volumes = LvmTools::new(&runner);

    let mut disk = locate_disk(&runner, "/dev/sdc").unwrap();
    assert_eq!(disk.partitions[0].start.to_string(), "0.03MiB");
    assert!(matches!(
        disk.available_sectors(),
        Err(ModelError::Parse(_))
    ));

    label_disk(&runner, &volumes, &mut disk, DiskLabel::Gpt).unwrap();

    let vgs = runner.position("vgs --noheadings").unwrap();
    let pvs = runner.position("pvs --noheadings").unwrap();
    let vgremove = runner.position("vgremove -f vg_old").unwrap();
    let pvremove = runner.position("pvremove -f -y /dev/sdc2").unwrap();
    let mklabel = runner.position("parted -s /dev/sdc mklabel gpt").unwrap();
    assert!(vgs < vgremove && pvs < vgremove);
    assert!(vgremove < pvremove);
    assert!(pvremove < mklabel);
    assert_eq!(runner.count("vgremove -f vg_usb"), 0);
    assert_eq!(runner.count("pvremove -f -y /dev/sde1"), 0);

    assert_eq!(disk.label, DiskLabel::Gpt);
    assert!(disk.partitions.is_empty());
}

#[test]
fn relabel_refuses_when_lvm_cannot_be_queried() {
    let spec = fixture("sata-gpt");
    let runner = ScriptedRunner::new().without("vgs").without("pvs");
    let volumes = LvmTools::new(&runner);

    let mut disk = snapshot(&spec);
    let error = label_disk(&runner, &volumes, &mut disk, DiskLabel::Gpt).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Precondition);
    assert_eq!(
        error.operations(),
        vec!["release volume groups", "list volume groups"]
    );
    assert_eq!(runner.count("vgs"), 1);
    assert_eq!(runner.count("parted -s /dev/sda mklabel"), 0);
}
