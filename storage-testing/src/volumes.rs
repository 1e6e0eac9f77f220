use storage_sys::logical::lvm_tools::{pvremove_command, vgremove_command};
use storage_sys::{CommandRunner, Result, ResultExt, VolumeManager};
use storage_types::{PhysicalVolume, VolumeGroup};

/// [`VolumeManager`] with a fixed inventory.
///
/// Removals are issued as the same `vgremove`/`pvremove` commands the LVM
/// backend uses, through the given runner, so they interleave with every
/// other recorded call and can be scripted to fail.
pub struct RecordingVolumeManager<'a> {
    runner: &'a dyn CommandRunner,
    groups: Vec<VolumeGroup>,
}

impl<'a> RecordingVolumeManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            groups: Vec::new(),
        }
    }

    /// Add a group claiming `pvs`
    pub fn with_group(mut self, name: &str, pvs: &[&str]) -> Self {
        self.groups.push(VolumeGroup {
            name: name.to_string(),
            physical_volumes: pvs
                .iter()
                .map(|path| PhysicalVolume {
                    path: path.to_string(),
                    vg_name: Some(name.to_string()),
                })
                .collect(),
        });
        self
    }
}

impl VolumeManager for RecordingVolumeManager<'_> {
    fn volume_groups(&self) -> Result<Vec<VolumeGroup>> {
        Ok(self.groups.clone())
    }

    fn remove_volume_group(&self, name: &str) -> Result<()> {
        self.runner
            .run(&vgremove_command(name))
            .op_context("remove volume group", name)
    }

    fn remove_physical_volume(&self, path: &str) -> Result<()> {
        self.runner
            .run(&pvremove_command(path))
            .op_context("remove physical volume", path)
    }
}
