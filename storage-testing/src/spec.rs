use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::{Result, TestingError};

/// Disk layout fixture, rendered into the report `parted -sj <disk> unit MiB print` prints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskSpec {
    pub name: String,
    pub path: String,
    pub size_mib: u64,
    pub label: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub transport: String,
    #[serde(default = "default_sector_size")]
    pub logical_sector_size: u32,
    #[serde(default = "default_sector_size")]
    pub physical_sector_size: u32,
    #[serde(default = "default_max_partitions")]
    pub max_partitions: u32,
    #[serde(default)]
    pub partitions: Vec<PartitionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSpec {
    pub number: u32,
    pub start_mib: u64,
    pub end_mib: u64,
    pub fs: Option<String>,
    pub name: Option<String>,
    /// Start exactly as parted prints it, for partitions not aligned to a MiB
    #[serde(default)]
    pub reported_start: Option<String>,
}

fn default_sector_size() -> u32 {
    512
}

fn default_max_partitions() -> u32 {
    128
}

impl PartitionSpec {
    pub fn new(number: u32, start_mib: u64, end_mib: u64) -> Self {
        Self {
            number,
            start_mib,
            end_mib,
            fs: None,
            name: None,
            reported_start: None,
        }
    }

    pub fn fs(mut self, fs: &str) -> Self {
        self.fs = Some(fs.to_string());
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn reported_start(mut self, start: &str) -> Self {
        self.reported_start = Some(start.to_string());
        self
    }
}

impl DiskSpec {
    /// Same layout plus `partition`, as parted would report it after creation
    pub fn with_partition(&self, partition: PartitionSpec) -> Self {
        let mut spec = self.clone();
        spec.partitions.push(partition);
        spec
    }

    /// Same disk with an empty table of `label`
    pub fn relabeled(&self, label: &str) -> Self {
        let mut spec = self.clone();
        spec.label = label.to_string();
        spec.partitions.clear();
        spec
    }

    pub fn to_parted_json(&self) -> String {
        let partitions: Vec<_> = self
            .partitions
            .iter()
            .map(|part| {
                let mut value = json!({
                    "number": part.number,
                    "start": part
                        .reported_start
                        .clone()
                        .unwrap_or_else(|| format!("{}MiB", part.start_mib)),
                    "end": format!("{}MiB", part.end_mib),
                    "size": format!("{}MiB", part.end_mib - part.start_mib),
                    "type": "primary",
                });
                if let Some(fs) = &part.fs {
                    value["filesystem"] = json!(fs);
                }
                if let Some(name) = &part.name {
                    value["name"] = json!(name);
                }
                value
            })
            .collect();

        json!({
            "disk": {
                "path": self.path,
                "size": format!("{}MiB", self.size_mib),
                "model": self.model,
                "transport": self.transport,
                "logical-sector-size": self.logical_sector_size,
                "physical-sector-size": self.physical_sector_size,
                "label": self.label,
                "max-partitions": self.max_partitions,
                "partitions": partitions,
            }
        })
        .to_string()
    }
}

pub fn specs_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/disk-specs")
}

pub fn spec_path_for_name(spec_name: &str) -> PathBuf {
    specs_root().join(format!("{}.toml", spec_name))
}

pub fn load_by_name(spec_name: &str) -> Result<DiskSpec> {
    let path = spec_path_for_name(spec_name);
    if !path.exists() {
        return Err(TestingError::SpecNotFound {
            spec_name: spec_name.to_string(),
        });
    }

    let raw = fs::read_to_string(&path).map_err(|error| TestingError::SpecIo {
        path: path.clone(),
        reason: error.to_string(),
    })?;

    let spec: DiskSpec = toml::from_str(&raw).map_err(|error| TestingError::SpecInvalid {
        spec_name: spec_name.to_string(),
        reason: error.to_string(),
    })?;

    validate(&spec)?;
    Ok(spec)
}

pub fn validate(spec: &DiskSpec) -> Result<()> {
    let invalid = |reason: String| TestingError::SpecInvalid {
        spec_name: if spec.name.is_empty() {
            "<unknown>".to_string()
        } else {
            spec.name.clone()
        },
        reason,
    };

    if spec.name.is_empty() {
        return Err(invalid("name must not be empty".to_string()));
    }

    if !spec.path.starts_with("/dev/") {
        return Err(invalid("path must be a /dev node".to_string()));
    }

    if !matches!(spec.label.as_str(), "gpt" | "msdos" | "unknown") {
        return Err(invalid(
            "label must be 'gpt', 'msdos' or 'unknown'".to_string(),
        ));
    }

    for part in &spec.partitions {
        if part.start_mib >= part.end_mib || part.end_mib > spec.size_mib {
            return Err(invalid(format!(
                "partition {} must satisfy start < end <= size_mib",
                part.number
            )));
        }
    }

    Ok(())
}
