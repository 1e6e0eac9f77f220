#[path = "../support/mod.rs"]
mod support;

use storage_sys::{CommandOutput, ErrorKind, locate_disk, update_disk};
use storage_testing::{PartitionSpec, ScriptedRunner};
use storage_types::{DiskLabel, Sector};

use support::{fixture, snapshot};

#[test]
fn lookup_orders_partitions_by_number() {
    let mut spec = fixture("sata-gpt");
    spec.partitions.reverse();
    let runner = ScriptedRunner::new().on_ok("parted -sj /dev/sda", &spec.to_parted_json());

    let disk = locate_disk(&runner, "/dev/sda").unwrap();
    assert_eq!(disk.partition_numbers(), vec![1, 2, 3]);
    assert_eq!(disk.partitions[0].path, "/dev/sda1");
    assert_eq!(disk.label, DiskLabel::Gpt);
}

#[test]
fn empty_report_is_a_lookup_error() {
    let runner = ScriptedRunner::new().on(
        "parted -sj /dev/sdz",
        CommandOutput::failed(1, "Error: Could not stat device /dev/sdz"),
    );

    let error = locate_disk(&runner, "/dev/sdz").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Lookup);
    assert!(error.to_string().contains("Could not stat device"));
}

#[test]
fn failing_exit_with_a_report_still_decodes() {
    let spec = fixture("blank");
    let runner = ScriptedRunner::new().on(
        "parted -sj /dev/vda",
        CommandOutput {
            code: Some(1),
            stdout: spec.to_parted_json(),
            stderr: "Error: /dev/vda: unrecognised disk label".to_string(),
        },
    );

    let disk = locate_disk(&runner, "/dev/vda").unwrap();
    assert_eq!(disk.label, DiskLabel::Unknown);
    assert!(disk.partitions.is_empty());
}

#[test]
fn update_replaces_the_whole_snapshot() {
    let before = fixture("sata-msdos");
    let after = before.with_partition(PartitionSpec::new(1, 1, 4097).fs("ext4"));
    let runner = ScriptedRunner::new().on_ok("parted -sj /dev/sdb", &after.to_parted_json());

    let mut disk = snapshot(&before);
    update_disk(&runner, &mut disk).unwrap();
    assert_eq!(disk.partition_numbers(), vec![1]);
    assert_eq!(disk.max_partitions, 4);
}

#[test]
fn free_space_between_and_after_partitions() {
    let mut spec = fixture("sata-msdos");
    spec.size_mib = 400;
    spec.partitions = vec![PartitionSpec::new(1, 0, 100), PartitionSpec::new(2, 150, 300)];

    let gaps = snapshot(&spec).available_sectors().unwrap();
    assert_eq!(
        gaps,
        vec![
            Sector { start: 100, end: 150 },
            Sector { start: 300, end: 400 }
        ]
    );
}

#[test]
fn full_disk_has_no_free_space() {
    let mut spec = fixture("sata-msdos");
    spec.size_mib = 200;
    spec.partitions = vec![PartitionSpec::new(1, 0, 100), PartitionSpec::new(2, 100, 200)];

    assert!(snapshot(&spec).available_sectors().unwrap().is_empty());
}

#[test]
fn lookup_by_number_with_holes() {
    let mut spec = fixture("sata-gpt");
    spec.partitions = vec![
        PartitionSpec::new(1, 1, 100),
        PartitionSpec::new(2, 100, 200),
        PartitionSpec::new(4, 300, 400),
    ];
    let disk = snapshot(&spec);

    assert_eq!(disk.get_partition(4).map(|p| p.path.as_str()), Some("/dev/sda4"));
    assert!(disk.get_partition(3).is_none());
}
