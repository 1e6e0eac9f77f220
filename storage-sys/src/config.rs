// SPDX-License-Identifier: GPL-3.0-only

//! Provisioning settings
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! mapper_dir = "/dev/mapper"
//!
//! [convergence]
//! initial_interval_ms = 50
//! max_interval_ms = 1000
//! timeout_secs = 120
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ResultExt, SysError};
use crate::poll::Poller;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding device-mapper nodes of opened encrypted volumes
    pub mapper_dir: PathBuf,

    /// How long to wait for the kernel to expose a new partition
    pub convergence: ConvergenceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mapper_dir: PathBuf::from("/dev/mapper"),
            convergence: ConvergenceSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceSettings {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            initial_interval_ms: 50,
            max_interval_ms: 1000,
            timeout_secs: 120,
        }
    }
}

impl ConvergenceSettings {
    pub fn poller(&self) -> Poller {
        Poller::new(
            Duration::from_millis(self.initial_interval_ms),
            Duration::from_millis(self.max_interval_ms),
            Duration::from_secs(self.timeout_secs),
        )
    }
}

impl Settings {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(raw).map_err(|e| SysError::Parse(format!("invalid settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).op_context("read settings", path.display().to_string())?;
        Self::from_toml_str(&raw).op_context("load settings", path.display().to_string())
    }

    pub fn validate(&self) -> Result<()> {
        if self.mapper_dir.as_os_str().is_empty() {
            return Err(SysError::Precondition(
                "mapper_dir must not be empty".to_string(),
            ));
        }

        let convergence = &self.convergence;
        if convergence.timeout_secs == 0 {
            return Err(SysError::Precondition(
                "convergence.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if convergence.max_interval_ms < convergence.initial_interval_ms {
            return Err(SysError::Precondition(
                "convergence.max_interval_ms must not be below initial_interval_ms".to_string(),
            ));
        }

        Ok(())
    }
}
