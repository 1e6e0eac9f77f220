// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use storage_types::ModelError;
use thiserror::Error;

/// Error types for provisioning operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device not found or its description could not be decoded
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Malformed numeric field
    #[error("Parse error: {0}")]
    Parse(String),

    /// External command could not run or exited unsuccessfully
    #[error("`{command}` failed ({}): {stderr}", exit_status(.code))]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Program is not installed
    #[error("`{program}` is not installed")]
    ToolMissing { program: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Target already in the requested state on a non-idempotent call
    #[error("Conflict: {0}")]
    StateConflict(String),

    #[error("{operation} did not converge within {waited:?}")]
    Timeout { operation: String, waited: Duration },

    #[error("{0} was cancelled")]
    Cancelled(String),

    /// Failure annotated with the operation and the device it targeted
    #[error("{operation} {target}: {source}")]
    Context {
        operation: &'static str,
        target: String,
        source: Box<SysError>,
    },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "no exit status".to_string(),
    }
}

/// Classification of a [`SysError`], ignoring context layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Lookup,
    Parse,
    Command,
    ToolMissing,
    Precondition,
    StateConflict,
    Timeout,
    Cancelled,
}

impl SysError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Lookup(_) => ErrorKind::Lookup,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Command { .. } => ErrorKind::Command,
            Self::ToolMissing { .. } => ErrorKind::ToolMissing,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Context { source, .. } => source.kind(),
        }
    }

    /// Innermost error beneath all context layers
    pub fn root(&self) -> &SysError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Operation names from the outermost layer inwards
    pub fn operations(&self) -> Vec<&'static str> {
        let mut operations = Vec::new();
        let mut current = self;
        while let Self::Context {
            operation, source, ..
        } = current
        {
            operations.push(*operation);
            current = source.as_ref();
        }
        operations
    }
}

impl From<ModelError> for SysError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::Lookup(message) => Self::Lookup(message),
            ModelError::Parse(message) => Self::Parse(message),
            ModelError::Precondition(message) => Self::Precondition(message),
        }
    }
}

/// Result type alias for system operations
pub type Result<T> = std::result::Result<T, SysError>;

/// Wrap failures with the operation name and target device
pub trait ResultExt<T> {
    fn op_context(self, operation: &'static str, target: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<SysError>,
{
    fn op_context(self, operation: &'static str, target: impl Into<String>) -> Result<T> {
        self.map_err(|error| SysError::Context {
            operation,
            target: target.into(),
            source: Box::new(error.into()),
        })
    }
}
