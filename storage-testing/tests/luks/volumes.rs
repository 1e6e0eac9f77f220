#[path = "../support/mod.rs"]
mod support;

use std::fs;

use storage_sys::luks::MAPPING_BUSY_EXIT_CODE;
use storage_sys::{
    ErrorKind, Settings, is_path_luks, luks_close, luks_filesystem_by_path, luks_format,
    luks_make_fs, luks_mapping_name, luks_open, luks_set_label, luks_try_open,
};
use storage_testing::ScriptedRunner;
use storage_types::{FilesystemKind, Partition};
use tempfile::TempDir;
use uuid::Uuid;

fn settings_in(dir: &TempDir) -> Settings {
    Settings {
        mapper_dir: dir.path().to_path_buf(),
        ..Settings::default()
    }
}

fn root_partition() -> Partition {
    Partition::at_path("/dev/sda3").with_filesystem(FilesystemKind::Btrfs)
}

#[test]
fn probe_distinguishes_not_luks_from_failure() {
    let runner = ScriptedRunner::new()
        .on_ok("cryptsetup isLuks /dev/sda3", "")
        .on_exit("cryptsetup isLuks /dev/sda2", 1)
        .on_exit("cryptsetup isLuks /dev/sda9", 4);

    assert!(is_path_luks(&runner, "/dev/sda3").unwrap());
    assert!(!is_path_luks(&runner, "/dev/sda2").unwrap());
    assert_eq!(
        is_path_luks(&runner, "/dev/sda9").unwrap_err().kind(),
        ErrorKind::Command
    );
}

#[test]
fn password_goes_through_stdin() {
    let runner = ScriptedRunner::new();
    luks_open(&runner, &root_partition(), "cryptroot", "correct horse").unwrap();
    luks_open(&runner, &root_partition(), "cryptroot2", "").unwrap();

    let calls = runner.recorded();
    assert_eq!(calls[0].command, "cryptsetup open /dev/sda3 cryptroot");
    assert_eq!(calls[0].stdin.as_deref(), Some("correct horse"));
    assert!(!calls[0].command.contains("correct horse"));
    assert_eq!(calls[1].stdin, None);
}

#[test]
fn opening_a_used_mapping_conflicts() {
    let runner = ScriptedRunner::new().on_exit("cryptsetup open", MAPPING_BUSY_EXIT_CODE);
    let error = luks_open(&runner, &root_partition(), "cryptroot", "pw").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::StateConflict);
}

#[test]
fn try_open_twice_opens_at_most_once() -> anyhow::Result<()> {
    let mapper = TempDir::new()?;
    let settings = settings_in(&mapper);
    let runner = ScriptedRunner::new();
    let mapping = luks_mapping_name(&Uuid::new_v4().to_string());

    luks_try_open(&runner, &settings, &root_partition(), &mapping, "pw")?;
    // cryptsetup would have created the node
    fs::write(mapper.path().join(&mapping), b"")?;
    luks_try_open(&runner, &settings, &root_partition(), &mapping, "pw")?;

    assert_eq!(runner.count("cryptsetup open"), 1);
    Ok(())
}

#[test]
fn try_open_on_existing_mapping_is_a_no_op() -> anyhow::Result<()> {
    let mapper = TempDir::new()?;
    fs::write(mapper.path().join("cryptroot"), b"")?;
    let runner = ScriptedRunner::new();

    luks_try_open(&runner, &settings_in(&mapper), &root_partition(), "cryptroot", "")?;
    assert!(runner.calls().is_empty());
    Ok(())
}

#[test]
fn try_open_surfaces_inspection_errors() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let not_a_dir = dir.path().join("mapper");
    fs::write(&not_a_dir, b"")?;
    let settings = Settings {
        mapper_dir: not_a_dir,
        ..Settings::default()
    };
    let runner = ScriptedRunner::new();

    let error = luks_try_open(&runner, &settings, &root_partition(), "cryptroot", "").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Io);
    assert_eq!(runner.count("cryptsetup"), 0);
    Ok(())
}

#[test]
fn format_and_close_commands() {
    let runner = ScriptedRunner::new();
    luks_format(&runner, &root_partition(), "pw").unwrap();
    luks_close(&runner, "cryptroot").unwrap();

    let calls = runner.recorded();
    assert_eq!(calls[0].command, "cryptsetup -q luksFormat /dev/sda3");
    assert_eq!(calls[0].stdin.as_deref(), Some("pw"));
    assert_eq!(calls[1].command, "cryptsetup close cryptroot");
}

#[test]
fn filesystem_and_label_target_the_mapped_device() -> anyhow::Result<()> {
    let mapper = TempDir::new()?;
    let settings = settings_in(&mapper);
    let uuid = Uuid::new_v4().to_string();
    let mapped = mapper.path().join(luks_mapping_name(&uuid));
    fs::write(&mapped, b"")?;

    let runner = ScriptedRunner::new().on_ok("lsblk -d -n -o UUID /dev/sda3", &format!("{uuid}\n"));

    luks_make_fs(&runner, &settings, &root_partition())?;
    luks_set_label(&runner, &settings, &root_partition(), "root")?;

    let mapped = mapped.display().to_string();
    assert!(runner.position(&format!("mkfs.btrfs -f {mapped}")).is_some());
    assert!(
        runner
            .position(&format!("btrfs filesystem label {mapped} root"))
            .is_some()
    );
    assert_eq!(runner.count("mkfs.btrfs -f /dev/sda3"), 0);
    Ok(())
}

#[test]
fn formatting_requires_an_open_mapping() -> anyhow::Result<()> {
    let mapper = TempDir::new()?;
    let uuid = Uuid::new_v4().to_string();
    let runner = ScriptedRunner::new().on_ok("lsblk -d -n -o UUID /dev/sda3", &uuid);

    let error = luks_make_fs(&runner, &settings_in(&mapper), &root_partition()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Precondition);
    assert_eq!(runner.count("mkfs"), 0);
    Ok(())
}

#[test]
fn inner_filesystem_skips_luks_header() {
    let runner = ScriptedRunner::new()
        .on_ok("lsblk -n -o FSTYPE /dev/sda3", "crypto_LUKS\nbtrfs\n")
        .on_ok("lsblk -n -o FSTYPE /dev/sda4", "crypto_LUKS\n\n");

    assert_eq!(
        luks_filesystem_by_path(&runner, "/dev/sda3").unwrap().as_deref(),
        Some("btrfs")
    );
    assert_eq!(luks_filesystem_by_path(&runner, "/dev/sda4").unwrap(), None);
}

#[test]
fn mapping_requires_a_real_uuid() {
    let runner = ScriptedRunner::new().on_ok("lsblk -d -n -o UUID /dev/sda3", "0A1B-2C3D\n");
    let error = luks_make_fs(&runner, &Settings::default(), &root_partition()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Parse);
    assert_eq!(runner.count("mkfs"), 0);
}
