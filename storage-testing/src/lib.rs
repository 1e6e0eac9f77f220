//! Test doubles and fixtures for `storage-sys`
//!
//! Nothing here touches real devices: [`runner::ScriptedRunner`] answers
//! commands from a script and records what was asked, and
//! [`spec::DiskSpec`] renders TOML disk layouts into the JSON report that
//! `parted -j` would print.

pub mod errors;
pub mod runner;
pub mod spec;
pub mod volumes;

pub use runner::{RecordedCall, ScriptedRunner};
pub use spec::{DiskSpec, PartitionSpec};
pub use volumes::RecordingVolumeManager;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
