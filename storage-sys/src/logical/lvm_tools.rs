use std::collections::BTreeMap;

use storage_types::{PhysicalVolume, VolumeGroup};
use tracing::{debug, info};

use super::VolumeManager;
use crate::error::{Result, ResultExt, SysError};
use crate::exec::{CommandLine, CommandRunner};

#[derive(Debug, Clone)]
struct PvRow {
    pv_name: String,
    vg_name: Option<String>,
}

fn parse_tabbed_line(line: &str) -> Vec<String> {
    line.split('\t')
        .map(|part| part.trim().to_string())
        .collect()
}

fn parse_vgs(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_pvs(output: &str) -> Vec<PvRow> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                return None;
            }
            let cols = parse_tabbed_line(line);
            let pv_name = cols.first()?.clone();
            let vg_name = cols.get(1).filter(|name| !name.is_empty()).cloned();

            Some(PvRow { pv_name, vg_name })
        })
        .collect()
}

fn groups_from_rows(vg_names: Vec<String>, pvs: Vec<PvRow>) -> Vec<VolumeGroup> {
    let mut groups: BTreeMap<String, Vec<PhysicalVolume>> =
        vg_names.into_iter().map(|name| (name, Vec::new())).collect();

    for pv in pvs {
        let Some(vg_name) = pv.vg_name else {
            continue;
        };
        groups.entry(vg_name.clone()).or_default().push(PhysicalVolume {
            path: pv.pv_name,
            vg_name: Some(vg_name),
        });
    }

    groups
        .into_iter()
        .map(|(name, physical_volumes)| VolumeGroup {
            name,
            physical_volumes,
        })
        .collect()
}

pub fn vgs_command() -> CommandLine {
    CommandLine::new("vgs").args(["--noheadings", "-o", "vg_name"])
}

pub fn pvs_command() -> CommandLine {
    CommandLine::new("pvs").args([
        "--noheadings",
        "-o",
        "pv_name,vg_name",
        "--separator",
        "\t",
    ])
}

pub fn vgremove_command(name: &str) -> CommandLine {
    CommandLine::new("vgremove").args(["-f", name])
}

pub fn pvremove_command(path: &str) -> CommandLine {
    CommandLine::new("pvremove").args(["-f", "-y", path])
}

/// [`VolumeManager`] backed by the LVM2 command line tools
pub struct LvmTools<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> LvmTools<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Run an inventory query. Without the tools there is no way to tell
    /// whether a disk backs a volume group, so that is a precondition failure.
    fn query(&self, command: &CommandLine) -> Result<String> {
        self.runner.capture(command).map_err(|error| match error {
            SysError::ToolMissing { program } => SysError::Precondition(format!(
                "{program} is not installed; volume groups cannot be inspected"
            )),
            other => other,
        })
    }
}

impl VolumeManager for LvmTools<'_> {
    fn volume_groups(&self) -> Result<Vec<VolumeGroup>> {
        if !cfg!(feature = "lvm-tools") {
            return Err(SysError::Precondition(
                "built without LVM support; volume groups cannot be inspected".to_string(),
            ));
        }

        let vgs_output = self
            .query(&vgs_command())
            .op_context("list volume groups", "lvm")?;
        let pvs_output = self
            .query(&pvs_command())
            .op_context("list physical volumes", "lvm")?;

        let groups = groups_from_rows(parse_vgs(&vgs_output), parse_pvs(&pvs_output));
        debug!("Found {} volume groups", groups.len());
        Ok(groups)
    }

    fn remove_volume_group(&self, name: &str) -> Result<()> {
        info!("Removing volume group {name}");
        self.runner
            .run(&vgremove_command(name))
            .op_context("remove volume group", name)
    }

    fn remove_physical_volume(&self, path: &str) -> Result<()> {
        info!("Removing physical volume {path}");
        self.runner
            .run(&pvremove_command(path))
            .op_context("remove physical volume", path)
    }
}
